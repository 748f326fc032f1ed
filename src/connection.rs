//! IMAP connection setup
//!
//! Opens the TCP connection, optionally upgrades it with STARTTLS, and
//! logs in. The content server's IMAP endpoint commonly runs with a
//! self-signed certificate, so certificates are not verified.

use std::sync::Arc;

use async_imap::Session;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tokio_util::either::Either;
use tracing::{debug, info};

use crate::config::{EmailProperties, ImapSecurity, User};
use crate::error::{Error, Result};

/// Plain or TLS-wrapped TCP stream.
pub type ImapStream = Either<TcpStream, TlsStream<TcpStream>>;

/// A logged-in IMAP session.
pub type ImapSession = Session<Compat<ImapStream>>;

fn tls_connector() -> TlsConnector {
    let config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Open a session for `user` against the IMAP endpoint in `props`.
pub async fn connect(props: &EmailProperties, user: &User) -> Result<ImapSession> {
    let addr = format!("{}:{}", props.imap_host, props.imap_port);
    debug!("Connecting to IMAP server at {} ({:?})", addr, props.imap_security);

    let refused = |reason: String| Error::AuthenticationFailed {
        target: addr.clone(),
        reason,
    };

    let tcp_stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| refused(format!("connect failed: {e}")))?;

    let stream = match props.imap_security {
        ImapSecurity::Plain => Either::Left(tcp_stream),
        ImapSecurity::StartTls => {
            let mut client = async_imap::Client::new(tcp_stream.compat());
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| refused(format!("STARTTLS failed: {e}")))?;

            let server_name = ServerName::try_from(props.imap_host.clone())
                .map_err(|e| refused(format!("invalid server name: {e}")))?;
            let inner = client.into_inner().into_inner();
            let tls_stream = tls_connector()
                .connect(server_name, inner)
                .await
                .map_err(|e| refused(format!("TLS handshake failed: {e}")))?;
            Either::Right(tls_stream)
        }
    };

    let session = async_imap::Client::new(stream.compat())
        .login(&user.username, &user.password)
        .await
        .map_err(|(e, _)| refused(format!("login as {} rejected: {e}", user.username)))?;

    info!("Connected to IMAP server at {} as {}", addr, user.username);
    Ok(session)
}

#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
