//! Typed access to individual server mail settings

use tracing::info;

use crate::error::{Error, Result};
use crate::server_config::{ConfigService, Scope};

/// On/off properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    SmtpServer,
    SmtpAuthentication,
    SmtpOverwriteDuplicates,
    SmtpTls,
    SmtpTlsHidden,
    SmtpRequireTls,
    ImapServer,
    ImapProtocol,
    ImapsServer,
    MailFrom,
    MailSmtpAuth,
    MailDebug,
    MailSmtpStartTls,
}

impl Switch {
    const fn property(self) -> (Scope, &'static str) {
        match self {
            Self::SmtpServer => (Scope::Inbound, "email.server.enabled"),
            Self::SmtpAuthentication => (Scope::Inbound, "email.server.auth.enabled"),
            Self::SmtpOverwriteDuplicates => {
                (Scope::Inbound, "email.handler.folder.overwriteDuplicates")
            }
            Self::SmtpTls => (Scope::Inbound, "email.server.enableTLS"),
            Self::SmtpTlsHidden => (Scope::Inbound, "email.server.hideTLS"),
            Self::SmtpRequireTls => (Scope::Inbound, "email.server.requireTLS"),
            Self::ImapServer => (Scope::Imap, "imap.server.enabled"),
            Self::ImapProtocol => (Scope::Imap, "imap.server.imap.enabled"),
            Self::ImapsServer => (Scope::Imap, "imap.server.imaps.enabled"),
            Self::MailFrom => (Scope::Outbound, "mail.from.enabled"),
            Self::MailSmtpAuth => (Scope::Outbound, "mail.smtp.auth"),
            Self::MailDebug => (Scope::Outbound, "mail.smtp.debug"),
            Self::MailSmtpStartTls => (Scope::Outbound, "mail.smtp.starttls.enable"),
        }
    }
}

/// Integer properties, ports and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Number {
    SmtpServerPort,
    SmtpMaxConnections,
    ImapServerPort,
    ImapsServerPort,
    MailPort,
}

impl Number {
    const fn property(self) -> (Scope, &'static str) {
        match self {
            Self::SmtpServerPort => (Scope::Inbound, "email.server.port"),
            Self::SmtpMaxConnections => (Scope::Inbound, "email.server.connections.max"),
            Self::ImapServerPort => (Scope::Imap, "imap.server.port"),
            Self::ImapsServerPort => (Scope::Imap, "imap.server.imaps.port"),
            Self::MailPort => (Scope::Outbound, "mail.port"),
        }
    }
}

/// Free-form string properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    SmtpUnknownUser,
    SmtpContributorsAuthority,
    SmtpServerDomain,
    ImapFromDefault,
    ImapToDefault,
    MailEncoding,
    MailFromDefault,
    MailHost,
    MailPassword,
    MailProtocol,
}

impl Text {
    const fn property(self) -> (Scope, &'static str) {
        match self {
            Self::SmtpUnknownUser => (Scope::Inbound, "email.inbound.unknownUser"),
            Self::SmtpContributorsAuthority => {
                (Scope::Inbound, "email.inbound.emailContributorsAuthority")
            }
            Self::SmtpServerDomain => (Scope::Inbound, "email.server.domain"),
            Self::ImapFromDefault => (Scope::Imap, "imap.mail.from.default"),
            Self::ImapToDefault => (Scope::Imap, "imap.mail.to.default"),
            Self::MailEncoding => (Scope::Outbound, "mail.encoding"),
            Self::MailFromDefault => (Scope::Outbound, "mail.from.default"),
            Self::MailHost => (Scope::Outbound, "mail.host"),
            Self::MailPassword => (Scope::Outbound, "mail.password"),
            Self::MailProtocol => (Scope::Outbound, "mail.protocol"),
        }
    }
}

const ALLOWED_SENDERS: &str = "email.server.allowed.senders";
const BLOCKED_SENDERS: &str = "email.server.blocked.senders";

/// Reads and updates server settings one property at a time.
pub struct ServerSettings<'a, C> {
    svc: &'a C,
}

impl<'a, C: ConfigService> ServerSettings<'a, C> {
    #[must_use]
    pub const fn new(svc: &'a C) -> Self {
        Self { svc }
    }

    pub async fn enable(&self, switch: Switch) -> Result<&Self> {
        self.set_switch(switch, true).await
    }

    pub async fn disable(&self, switch: Switch) -> Result<&Self> {
        self.set_switch(switch, false).await
    }

    /// `true` only when the server reports `true`, ignoring case.
    pub async fn is_enabled(&self, switch: Switch) -> Result<bool> {
        let (scope, key) = switch.property();
        info!("{}: Get '{}' status", scope, key);
        let value = self.svc.read(scope, key).await?;
        Ok(value.trim().eq_ignore_ascii_case("true"))
    }

    pub async fn number(&self, number: Number) -> Result<u32> {
        let (scope, key) = number.property();
        info!("{}: Get '{}'", scope, key);
        let value = self.svc.read(scope, key).await?;
        value.trim().parse().map_err(|e| {
            Error::remote(
                "Read setting",
                key,
                format!("'{value}' is not a number: {e}"),
            )
        })
    }

    pub async fn set_number(&self, number: Number, value: u32) -> Result<&Self> {
        let (scope, key) = number.property();
        info!("{}: Update '{}' to '{}'", scope, key, value);
        self.svc.write(scope, key, &value.to_string()).await?;
        Ok(self)
    }

    pub async fn text(&self, text: Text) -> Result<String> {
        let (scope, key) = text.property();
        info!("{}: Get '{}'", scope, key);
        self.svc.read(scope, key).await
    }

    pub async fn set_text(&self, text: Text, value: &str) -> Result<&Self> {
        let (scope, key) = text.property();
        if text == Text::MailPassword {
            info!("{}: Update '{}'", scope, key);
        } else {
            info!("{}: Update '{}' to '{}'", scope, key, value);
        }
        self.svc.write(scope, key, value).await?;
        Ok(self)
    }

    pub async fn allowed_senders(&self) -> Result<Vec<String>> {
        self.senders(ALLOWED_SENDERS).await
    }

    pub async fn set_allowed_senders(&self, senders: &[&str]) -> Result<&Self> {
        self.set_senders(ALLOWED_SENDERS, senders).await
    }

    pub async fn blocked_senders(&self) -> Result<Vec<String>> {
        self.senders(BLOCKED_SENDERS).await
    }

    pub async fn set_blocked_senders(&self, senders: &[&str]) -> Result<&Self> {
        self.set_senders(BLOCKED_SENDERS, senders).await
    }

    async fn set_switch(&self, switch: Switch, on: bool) -> Result<&Self> {
        let (scope, key) = switch.property();
        info!(
            "{}: {} '{}'",
            scope,
            if on { "Enable" } else { "Disable" },
            key
        );
        self.svc.write(scope, key, if on { "true" } else { "false" }).await?;
        Ok(self)
    }

    async fn senders(&self, key: &str) -> Result<Vec<String>> {
        info!("{}: Get '{}'", Scope::Inbound, key);
        let value = self.svc.read(Scope::Inbound, key).await?;
        Ok(value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    async fn set_senders(&self, key: &str, senders: &[&str]) -> Result<&Self> {
        let joined = senders.join(", ");
        info!("{}: Update '{}' to '{}'", Scope::Inbound, key, joined);
        self.svc.write(Scope::Inbound, key, &joined).await?;
        Ok(self)
    }
}
