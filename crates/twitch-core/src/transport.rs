use crate::error::{ClientError, Result};
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

pub const TLS_ADDR: &str = "irc.chat.twitch.tv:6697";
pub const PLAIN_ADDR: &str = "irc.chat.twitch.tv:6667";

/// Byte stream the protocol engine runs over, encrypted or not.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedStream = Box<dyn Stream>;

/// Opens a TCP connection to `addr` and wraps it in TLS when a connector is given.
pub async fn dial(addr: &str, tls: Option<&TlsConnector>) -> Result<BoxedStream> {
    let tcp = TcpStream::connect(addr)
        .await
        .map_err(|err| ClientError::connect(addr, err))?;
    tcp.set_nodelay(true).ok();

    let Some(connector) = tls else {
        debug!(%addr, "plaintext connection established");
        return Ok(Box::new(tcp));
    };

    let server_name = server_name(addr)?;
    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|err| ClientError::connect(addr, err))?;
    debug!(%addr, "tls connection established");
    Ok(Box::new(stream))
}

fn server_name(addr: &str) -> Result<ServerName<'static>> {
    let host = match addr.rsplit_once(':') {
        Some((host, _port)) => host,
        None => addr,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(ServerName::IpAddress(ip.into()));
    }
    ServerName::try_from(host)
        .map(|name| name.to_owned())
        .map_err(|_| ClientError::Tls(format!("invalid dns name {host}")))
}
