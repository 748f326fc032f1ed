//! Snapshot and restore of the server's mail configuration
//!
//! Tests that change inbound SMTP, outbound mail or IMAP settings on the
//! server call [`ServerConfiguration::save`] once before they start and
//! [`ServerConfiguration::restore`] when they are done.

use std::fmt;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::EmailProperties;
use crate::error::{Error, Result};

/// One of the three configuration areas the server exposes remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Inbound,
    Outbound,
    Imap,
}

impl Scope {
    /// Object name of the scope on the management interface.
    #[must_use]
    pub const fn object_name(self) -> &'static str {
        match self {
            Self::Inbound => "Alfresco:Type=Configuration,Category=email,id1=inbound",
            Self::Outbound => "Alfresco:Type=Configuration,Category=email,id1=outbound",
            Self::Imap => "Alfresco:Type=Configuration,Category=imap,id1=default",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inbound => "Inbound SMTP",
            Self::Outbound => "Outbound SMTP",
            Self::Imap => "IMAP",
        };
        f.write_str(name)
    }
}

/// Remote read and write of single configuration properties.
#[allow(async_fn_in_trait)]
pub trait ConfigService {
    async fn read(&self, scope: Scope, key: &str) -> Result<String>;

    async fn write(&self, scope: Scope, key: &str, value: &str) -> Result<()>;
}

const INBOUND_REMOTE_KEYS: [&str; 11] = [
    "email.server.enabled",
    "email.server.port",
    "email.inbound.unknownUser",
    "email.handler.folder.overwriteDuplicates",
    "email.server.allowed.senders",
    "email.server.blocked.senders",
    "email.inbound.emailContributorsAuthority",
    "email.server.domain",
    "email.server.enableTLS",
    "email.server.hideTLS",
    "email.server.requireTLS",
];

const OUTBOUND_REMOTE_KEYS: [&str; 3] = [
    "mail.testmessage.subject",
    "mail.testmessage.text",
    "mail.testmessage.to",
];

const IMAP_REMOTE_KEYS: [&str; 6] = [
    "imap.server.enabled",
    "imap.server.imap.enabled",
    "imap.server.imaps.enabled",
    "imap.server.imaps.port",
    "imap.mail.from.default",
    "imap.mail.to.default",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Setting {
    scope: Scope,
    key: &'static str,
    value: String,
}

/// The values captured by the first `save`.
#[derive(Debug, Default)]
struct Snapshot {
    settings: Vec<Setting>,
}

impl Snapshot {
    fn push(&mut self, scope: Scope, key: &'static str, value: impl Into<String>) {
        self.settings.push(Setting {
            scope,
            key,
            value: value.into(),
        });
    }

    async fn capture<C: ConfigService>(svc: &C, props: &EmailProperties) -> Result<Self> {
        let mut snapshot = Self::default();

        for key in INBOUND_REMOTE_KEYS {
            snapshot.push(Scope::Inbound, key, svc.read(Scope::Inbound, key).await?);
        }
        snapshot.push(Scope::Inbound, "email.server.auth.enabled", "true");
        snapshot.push(Scope::Inbound, "email.server.connections.max", "100");

        let out = &props.outbound;
        for (key, value) in [
            ("mail.encoding", out.encoding.clone()),
            ("mail.from.default", out.from_default.clone()),
            ("mail.from.enabled", out.from_enabled.to_string()),
            ("mail.host", out.host.clone()),
            ("mail.port", out.port.to_string()),
            ("mail.protocol", out.protocol.clone()),
            ("mail.smtp.auth", out.smtp_auth.to_string()),
            ("mail.smtp.debug", out.smtp_debug.to_string()),
            ("mail.smtp.starttls.enable", out.smtp_starttls_enable.to_string()),
            ("mail.smtp.timeout", out.smtp_timeout.to_string()),
            ("mail.smtps.auth", out.smtps_auth.to_string()),
            ("mail.smtps.starttls.enable", out.smtps_starttls_enable.to_string()),
            ("mail.username", out.username.clone()),
            ("mail.testmessage.send", "false".to_string()),
        ] {
            snapshot.push(Scope::Outbound, key, value);
        }
        for key in OUTBOUND_REMOTE_KEYS {
            snapshot.push(Scope::Outbound, key, svc.read(Scope::Outbound, key).await?);
        }

        snapshot.push(Scope::Imap, "imap.server.port", props.imap_port.to_string());
        for key in IMAP_REMOTE_KEYS {
            snapshot.push(Scope::Imap, key, svc.read(Scope::Imap, key).await?);
        }

        Ok(snapshot)
    }

    async fn restore<C: ConfigService>(&self, svc: &C) -> Result<usize> {
        let mut writes = 0;
        for setting in &self.settings {
            let remote = svc.read(setting.scope, setting.key).await?;
            if remote != setting.value {
                debug!(
                    "{}: '{}' is '{}', restoring '{}'",
                    setting.scope, setting.key, remote, setting.value
                );
                svc.write(setting.scope, setting.key, &setting.value).await?;
                writes += 1;
            }
        }
        Ok(writes)
    }
}

/// Process-wide holder of the configuration snapshot.
///
/// Only the first `save` captures; later calls are no-ops, even when the
/// first one failed while bringing the server in line.
/// Share one instance between every test that touches server settings.
#[derive(Debug, Default)]
pub struct ServerConfiguration {
    snapshot: Mutex<Option<Snapshot>>,
}

impl ServerConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot has been captured.
    pub async fn is_saved(&self) -> bool {
        self.snapshot.lock().await.is_some()
    }

    /// Capture the current configuration, then bring the server back in
    /// line with it.
    pub async fn save<C: ConfigService>(&self, svc: &C, props: &EmailProperties) -> Result<()> {
        let mut guard = self.snapshot.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        info!("SERVER: Save Configuration");
        let snapshot = guard.insert(Snapshot::capture(svc, props).await?);
        info!("SERVER: Restore Configuration");
        snapshot.restore(svc).await?;
        Ok(())
    }

    /// Write back every captured value that differs on the server.
    ///
    /// Returns the number of properties written.
    pub async fn restore<C: ConfigService>(&self, svc: &C) -> Result<usize> {
        let guard = self.snapshot.lock().await;
        let snapshot = guard.as_ref().ok_or_else(|| {
            Error::invalid_state(
                "Restore configuration",
                "server",
                "no configuration has been saved",
            )
        })?;
        info!("SERVER: Restore Configuration");
        snapshot.restore(svc).await
    }
}
