use anyhow::Context;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pemfile::certs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsConnector;
use tracing::warn;

/// Accepts any server certificate. Only used when explicitly configured.
#[derive(Debug)]
struct InsecureVerifier;

impl ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
        ]
    }
}

pub fn load_client_config(ca: Option<&Path>, insecure: bool) -> anyhow::Result<ClientConfig> {
    if insecure {
        warn!("tls certificate verification disabled");
        return Ok(ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
            .with_no_client_auth());
    }
    let root = build_root_store(ca)?;
    Ok(ClientConfig::builder()
        .with_root_certificates(root)
        .with_no_client_auth())
}

pub fn connector(ca: Option<&Path>, insecure: bool) -> anyhow::Result<TlsConnector> {
    let config = load_client_config(ca, insecure)?;
    Ok(TlsConnector::from(Arc::new(config)))
}

fn build_root_store(ca: Option<&Path>) -> anyhow::Result<RootCertStore> {
    let mut root = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(native) => {
            for cert in native {
                root.add(cert).ok();
            }
        }
        Err(err) => warn!(%err, "could not load native certs"),
    }

    if let Some(path) = ca {
        let mut reader = BufReader::new(File::open(path).context("open ca file")?);
        let certs = certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .context("read ca certs")?;
        for cert in certs {
            root.add(cert).context("add cert")?;
        }
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_file_is_an_error() {
        let err = load_client_config(Some(Path::new("/nonexistent/ca.pem")), false).unwrap_err();
        assert!(format!("{err:#}").contains("open ca file"));
    }

    #[test]
    fn insecure_config_builds() {
        assert!(load_client_config(None, true).is_ok());
    }
}
