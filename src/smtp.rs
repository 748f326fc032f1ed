//! SMTP session against the server's inbound mail endpoint

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info};

use crate::compose::{ComposeMessage, OutgoingMail};
use crate::config::{EmailProperties, User};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::protocol::Protocol;

/// Where and how to connect for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpEndpoint {
    pub host: String,
    pub port: u16,
    pub starttls: bool,
    /// `None` connects anonymously.
    pub credentials: Option<User>,
}

impl SmtpEndpoint {
    /// Endpoint for `user`, honoring the auth and TLS switches in `props`.
    #[must_use]
    pub fn for_user(props: &EmailProperties, user: &User) -> Self {
        Self {
            host: props.smtp_host.clone(),
            port: props.smtp_port,
            starttls: props.smtp_tls_enabled,
            credentials: props.smtp_auth_enabled.then(|| user.clone()),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Transport that delivers composed mail.
#[allow(async_fn_in_trait)]
pub trait MailSender {
    /// Open and verify a connection; fails with
    /// [`Error::AuthenticationFailed`] when the server refuses it.
    async fn connect(&mut self, endpoint: &SmtpEndpoint) -> Result<()>;

    async fn send(&mut self, mail: &OutgoingMail) -> Result<()>;

    async fn close(&mut self);

    fn is_connected(&self) -> bool;
}

/// [`MailSender`] over lettre's async SMTP transport.
#[derive(Default)]
pub struct LettreSender {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl LettreSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MailSender for LettreSender {
    async fn connect(&mut self, endpoint: &SmtpEndpoint) -> Result<()> {
        let auth_failed = |reason: String| Error::AuthenticationFailed {
            target: endpoint.target(),
            reason,
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&endpoint.host)
            .port(endpoint.port);
        if endpoint.starttls {
            debug!("STARTTLS enabled for {}", endpoint.target());
            let tls = TlsParameters::builder(endpoint.host.clone())
                .dangerous_accept_invalid_certs(true)
                .build()
                .map_err(|e| auth_failed(format!("TLS setup failed: {e}")))?;
            builder = builder.tls(Tls::Required(tls));
        }
        if let Some(user) = &endpoint.credentials {
            builder = builder.credentials(Credentials::new(
                user.username.clone(),
                user.password.clone(),
            ));
        }
        let transport = builder.build();

        match transport.test_connection().await {
            Ok(true) => {
                self.transport = Some(transport);
                Ok(())
            }
            Ok(false) => Err(auth_failed("server rejected the connection".into())),
            Err(e) => Err(auth_failed(e.to_string())),
        }
    }

    async fn send(&mut self, mail: &OutgoingMail) -> Result<()> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            Error::invalid_state("Send mail", &mail.subject, "SMTP client is not connected")
        })?;
        let email = mail.to_lettre()?;
        transport
            .send(email)
            .await
            .map_err(|e| Error::remote("Send mail", &mail.subject, e))?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.shutdown().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.transport.is_some()
    }
}

/// Sends mail into the server and tracks where it should land.
pub struct SmtpSession<M = LettreSender> {
    sender: M,
    props: EmailProperties,
    location: Location,
    user: Option<User>,
}

impl SmtpSession<LettreSender> {
    #[must_use]
    pub fn with_lettre(props: EmailProperties) -> Self {
        Self::new(LettreSender::new(), props)
    }
}

impl<M: MailSender> SmtpSession<M> {
    #[must_use]
    pub fn new(sender: M, props: EmailProperties) -> Self {
        Self {
            sender,
            props,
            location: Location::default(),
            user: None,
        }
    }

    #[must_use]
    pub const fn sender(&self) -> &M {
        &self.sender
    }

    #[must_use]
    pub const fn test_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Point the session at the folder the mail is expected to land in.
    pub fn using_resource(&mut self, path: &str) -> &mut Self {
        self.location.set(path);
        self
    }

    /// Forget the expected landing folder.
    pub fn clear_location(&mut self) -> &mut Self {
        self.location = Location::default();
        self
    }

    pub const fn compose_message(&mut self) -> ComposeMessage<'_, M> {
        ComposeMessage::new(self)
    }

    pub const fn assert_that(&self) -> SmtpAssertion<'_, M> {
        SmtpAssertion { session: self }
    }

    /// Deliver `mail`, then record its expected path under the current
    /// folder when one is set.
    pub(crate) async fn deliver(&mut self, mail: &OutgoingMail) -> Result<()> {
        info!(
            "SMTP: Sending mail with following properties: FROM: {}, TO: {}, BODY: {}",
            mail.from,
            mail.to.join(", "),
            mail.body.as_deref().unwrap_or_default()
        );
        self.sender.send(mail).await?;
        if !self.location.is_empty() && !mail.subject.is_empty() {
            let resource = crate::path::build_path(self.location.current(), &[&mail.subject])?;
            self.location.touch(&resource);
        }
        Ok(())
    }
}

impl<M: MailSender> Protocol for SmtpSession<M> {
    fn name(&self) -> &'static str {
        "SMTP"
    }

    async fn authenticate(&mut self, user: &User) -> Result<&mut Self> {
        let endpoint = SmtpEndpoint::for_user(&self.props, user);
        if endpoint.credentials.is_some() {
            info!(
                "SMTP: Authenticate with {} on {}",
                user.username,
                endpoint.target()
            );
        } else {
            info!(
                "SMTP: Authentication disabled, connecting anonymously to {}",
                endpoint.target()
            );
        }
        self.sender.connect(&endpoint).await?;
        self.user = Some(user.clone());
        Ok(self)
    }

    async fn disconnect(&mut self) -> Result<&mut Self> {
        info!("SMTP: Disconnect SMTP Client");
        self.sender.close().await;
        Ok(self)
    }

    fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }

    fn location(&self) -> &Location {
        &self.location
    }
}

/// Connection checks on an [`SmtpSession`].
pub struct SmtpAssertion<'a, M> {
    session: &'a SmtpSession<M>,
}

impl<M: MailSender> SmtpAssertion<'_, M> {
    pub fn smtp_is_connected(&self) -> Result<&Self> {
        info!("SMTP: Assert that SMTP is connected");
        if self.session.is_connected() {
            Ok(self)
        } else {
            Err(self.failure("SMTP authentication was not successful"))
        }
    }

    pub fn smtp_is_not_connected(&self) -> Result<&Self> {
        info!("SMTP: Assert that SMTP is not connected");
        if self.session.is_connected() {
            Err(self.failure("SMTP authentication was successful"))
        } else {
            Ok(self)
        }
    }

    fn failure(&self, expectation: &str) -> Error {
        let resource = self
            .session
            .user
            .as_ref()
            .map_or("SMTP", |u| u.username.as_str());
        Error::assertion(resource, expectation)
    }
}
