/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lucciola, a browser for Gemini space.
 *
 * Lucciola is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lucciola is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lucciola.  If not, see <http://www.gnu.org/licenses/>.
 */

//! TLS connection helpers: wrap TcpStream with rustls. Gemini is TLS-only;
//! capsules overwhelmingly use self-signed certificates, so alongside the
//! validating config there is a validation-bypass config used when the user
//! has recorded a trust override for the host. The bypass is per connection
//! and all-or-nothing, matching the original's `validateCert: false` client.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;

use crate::protocol::gemini::ConnectionError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Default TLS client config (native + Mozilla roots, no client auth).
fn default_client_config() -> Arc<ClientConfig> {
    let config = ClientConfig::builder()
        .with_root_certificates(build_root_store())
        .with_no_client_auth();
    Arc::new(config)
}

/// Certificate verifier that accepts any server certificate. Installed only
/// for hosts the user has explicitly added to the trust-override store.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::ED25519,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
        ]
    }
}

/// TLS client config that skips certificate validation entirely.
fn insecure_client_config() -> Arc<ClientConfig> {
    let mut config = ClientConfig::builder()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();
    config
        .dangerous()
        .set_certificate_verifier(Arc::new(AcceptAnyServerCert));
    Arc::new(config)
}

static DEFAULT_CONNECTOR: std::sync::OnceLock<TlsConnector> = std::sync::OnceLock::new();
static INSECURE_CONNECTOR: std::sync::OnceLock<TlsConnector> = std::sync::OnceLock::new();

fn connector(validate_certificate: bool) -> &'static TlsConnector {
    if validate_certificate {
        DEFAULT_CONNECTOR.get_or_init(|| TlsConnector::from(default_client_config()))
    } else {
        INSECURE_CONNECTOR.get_or_init(|| TlsConnector::from(insecure_client_config()))
    }
}

/// Resolve, connect, and handshake. Each phase is bounded by the connect
/// timeout and classifies its own failures: resolution errors, refused or
/// unreachable connects, and certificate problems map to distinct
/// `ConnectionError` kinds because each drives a different status view.
pub async fn connect_tls(
    host: &str,
    port: u16,
    validate_certificate: bool,
) -> Result<TlsStream<TcpStream>, ConnectionError> {
    let addrs: Vec<_> = timeout(CONNECT_TIMEOUT, lookup_host((host, port)))
        .await
        .map_err(|_| ConnectionError::Other("name resolution timed out".to_string()))?
        .map_err(|_| ConnectionError::NameResolutionFailed)?
        .collect();
    let addr = addrs.first().ok_or(ConnectionError::NameResolutionFailed)?;

    let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| ConnectionError::Other("connect timed out".to_string()))?
        .map_err(classify_connect_error)?;

    let server_name: ServerName<'static> = ServerName::try_from(host.to_string())
        .map_err(|_| ConnectionError::Other(format!("invalid host name: {}", host)))?;
    let tls = timeout(
        CONNECT_TIMEOUT,
        connector(validate_certificate).connect(server_name, tcp),
    )
    .await
    .map_err(|_| ConnectionError::Other("TLS handshake timed out".to_string()))?
    .map_err(classify_handshake_error)?;

    Ok(tls)
}

fn classify_connect_error(e: io::Error) -> ConnectionError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::TimedOut => ConnectionError::ConnectionRefused,
        _ => ConnectionError::Other(e.to_string()),
    }
}

/// Handshake errors arrive as io::Error wrapping a rustls error; certificate
/// failures are pulled out so the Tab can show its per-kind views.
pub fn classify_handshake_error(e: io::Error) -> ConnectionError {
    if let Some(rustls_err) = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<tokio_rustls::rustls::Error>())
    {
        if let tokio_rustls::rustls::Error::InvalidCertificate(cert_err) = rustls_err {
            return match cert_err {
                CertificateError::Expired | CertificateError::NotValidYet => {
                    ConnectionError::CertificateExpired
                }
                _ => ConnectionError::CertificateInvalid,
            };
        }
    }
    ConnectionError::Other(e.to_string())
}
