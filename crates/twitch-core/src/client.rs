use crate::config::ConnectionConfig;
use crate::dispatch::{Dispatcher, Handler};
use crate::error::{ClientError, Result};
use crate::protocol::{
    format_outbound, parse_line, Inbound, LineBuffer, Outbound, MEMBERSHIP_CAPABILITY, TERMINATOR,
};
use crate::rate::{RateLimiter, CHAT_ENDPOINT};
use crate::transport::{self, BoxedStream, Stream};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 1024;
const INJECTED_PEER: &str = "injected stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Unconnected,
    Connected,
    Closed,
}

/// Handle on one chat connection. Cloning is cheap and every clone drives the
/// same connection.
#[derive(Clone)]
pub struct IrcClient {
    inner: Arc<Inner>,
}

struct Inner {
    connection: ConnectionConfig,
    limiter: RateLimiter,
    dispatcher: Dispatcher,
    channels: Mutex<Vec<String>>,
    writer: Mutex<Option<WriteHalf<BoxedStream>>>,
    state: parking_lot::Mutex<ConnState>,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl IrcClient {
    pub fn new(connection: ConnectionConfig) -> Self {
        Self::with_limiter(connection, RateLimiter::chat_default())
    }

    pub fn with_limiter(connection: ConnectionConfig, limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(Inner {
                connection,
                limiter,
                dispatcher: Dispatcher::new(),
                channels: Mutex::new(Vec::new()),
                writer: Mutex::new(None),
                state: parking_lot::Mutex::new(ConnState::Unconnected),
                reader: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnState {
        *self.inner.state.lock()
    }

    /// Dials the configured endpoint, authenticates and starts the read loop.
    pub async fn connect(&self, nick: &str, pass: &str) -> Result<()> {
        if self.state() != ConnState::Unconnected {
            return Err(ClientError::AlreadyConnected);
        }
        let conn = &self.inner.connection;
        let (stream, addr) = if conn.tls {
            let connector = crate::tls::connector(conn.ca.as_deref(), conn.insecure)
                .map_err(|err| ClientError::Tls(format!("{err:#}")))?;
            (transport::dial(&conn.tls_addr, Some(&connector)).await?, &conn.tls_addr)
        } else {
            (transport::dial(&conn.plain_addr, None).await?, &conn.plain_addr)
        };
        self.start(stream, addr, nick, pass).await
    }

    /// Runs the connection over an already established stream.
    pub async fn connect_stream<S: Stream>(&self, stream: S, nick: &str, pass: &str) -> Result<()> {
        self.start(Box::new(stream), INJECTED_PEER, nick, pass).await
    }

    async fn start(&self, stream: BoxedStream, addr: &str, nick: &str, pass: &str) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if *state != ConnState::Unconnected {
                return Err(ClientError::AlreadyConnected);
            }
            *state = ConnState::Connected;
        }

        let (reader, writer) = tokio::io::split(stream);
        *self.inner.writer.lock().await = Some(writer);

        let handshake = async {
            self.send(Outbound::Pass {
                token: pass.to_string(),
            })
            .await?;
            self.send(Outbound::Nick {
                nick: nick.to_string(),
            })
            .await
        };
        if let Err(err) = handshake.await {
            self.close().await;
            return Err(ClientError::handshake(addr, err));
        }

        let handle = tokio::spawn(read_loop(self.clone(), reader));
        *self.inner.reader.lock() = Some(handle);
        info!(%nick, "connected");

        if self.inner.connection.membership {
            if let Err(err) = self.request_membership_capability().await {
                warn!(%err, "membership capability request failed");
            }
        }
        Ok(())
    }

    /// Stops the read loop and shuts the stream down. The client cannot be
    /// reconnected afterwards.
    pub async fn close(&self) {
        *self.inner.state.lock() = ConnState::Closed;
        let reader = self.inner.reader.lock().take();
        if let Some(handle) = reader {
            handle.abort();
        }
        let writer = self.inner.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
        }
        info!("connection closed");
    }

    pub fn add_handler(&self, handler: Handler) {
        self.inner.dispatcher.add_handler(handler);
    }

    pub async fn join_channel(&self, channel: &str) -> Result<()> {
        let channel = normalize(channel);
        let mut channels = self.inner.channels.lock().await;
        self.send(Outbound::Join {
            channel: channel.clone(),
        })
        .await?;
        if !channels.contains(&channel) {
            channels.push(channel.clone());
        }
        info!(%channel, "joined channel");
        Ok(())
    }

    pub async fn leave_channel(&self, channel: &str) -> Result<()> {
        let channel = normalize(channel);
        let mut channels = self.inner.channels.lock().await;
        let Some(index) = channels.iter().position(|c| *c == channel) else {
            return Err(ClientError::PartNotJoined(channel));
        };
        self.send(Outbound::Part {
            channel: channel.clone(),
        })
        .await?;
        channels.remove(index);
        info!(%channel, "left channel");
        Ok(())
    }

    pub async fn channels(&self) -> Vec<String> {
        self.inner.channels.lock().await.clone()
    }

    pub async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        self.send(Outbound::Privmsg {
            channel: normalize(channel),
            text: text.to_string(),
        })
        .await
    }

    pub async fn request_membership_capability(&self) -> Result<()> {
        self.send(Outbound::CapReq {
            capability: MEMBERSHIP_CAPABILITY.to_string(),
        })
        .await
    }

    /// Writes one command. The chat bucket stays captured until the write
    /// finishes, so sends are serialized; a refused send is dropped.
    pub async fn send(&self, msg: Outbound) -> Result<()> {
        let line = format_outbound(&msg);
        let mut bucket = self.inner.limiter.capture_endpoint(CHAT_ENDPOINT).await?;
        let mut writer = self.inner.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        if let Err(err) = bucket.increment() {
            debug!(limit = bucket.limit(), "chat bucket exhausted");
            return Err(err);
        }
        writer
            .write_all(format!("{line}{TERMINATOR}").as_bytes())
            .await
            .map_err(ClientError::Write)?;
        writer.flush().await.map_err(ClientError::Write)?;
        bucket.release();
        debug!(line = %redact(&msg, &line), "sent");
        Ok(())
    }

    async fn handle_line(&self, line: &str) {
        match parse_line(line) {
            Ok(Inbound::Ping) => {
                if let Err(err) = self.send(Outbound::Pong).await {
                    warn!(%err, "keepalive reply failed");
                }
            }
            Ok(Inbound::Event(event)) => {
                self.inner.dispatcher.dispatch(self, event);
            }
            Err(err) => debug!(reason = %err.message, %line, "dropping line"),
        }
    }
}

async fn read_loop(client: IrcClient, mut reader: ReadHalf<BoxedStream>) {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut lines = LineBuffer::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                info!("server closed the connection");
                break;
            }
            Ok(n) => {
                lines.extend(&buf[..n]);
                while let Some(line) = lines.next_line() {
                    client.handle_line(&line).await;
                }
            }
            Err(err) => {
                warn!(err = %ClientError::Read(err), "read error");
                tokio::task::yield_now().await;
            }
        }
    }
}

fn normalize(channel: &str) -> String {
    channel.trim_start_matches('#').to_string()
}

fn redact<'a>(msg: &Outbound, line: &'a str) -> &'a str {
    match msg {
        Outbound::Pass { .. } => "PASS ***",
        _ => line,
    }
}
