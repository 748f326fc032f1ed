//! Connection and mail-server configuration

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How the IMAP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImapSecurity {
    /// Plain TCP, as the content server exposes IMAP by default.
    #[default]
    Plain,
    /// STARTTLS upgrade, accepting self-signed certificates.
    StartTls,
}

impl FromStr for ImapSecurity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(Self::Plain),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!(
                "Invalid IMAP_SECURITY '{other}': expected plain or starttls"
            ))),
        }
    }
}

/// Outbound mail settings the server is expected to run with.
///
/// These are the values written back when the server configuration is
/// restored after a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub encoding: String,
    pub from_default: String,
    pub from_enabled: bool,
    pub host: String,
    pub password: String,
    pub port: u16,
    pub protocol: String,
    pub smtp_auth: bool,
    pub smtp_debug: bool,
    pub smtp_starttls_enable: bool,
    pub smtp_timeout: u64,
    pub smtps_auth: bool,
    pub smtps_starttls_enable: bool,
    pub username: String,
}

/// Addresses and switches for the server's IMAP and SMTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailProperties {
    pub imap_host: String,
    pub imap_port: u16,
    pub imaps_port: u16,
    pub imap_security: ImapSecurity,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_auth_enabled: bool,
    pub smtp_tls_enabled: bool,
    pub outbound: OutboundMail,
}

impl EmailProperties {
    /// Load configuration from environment variables
    ///
    /// Reads from `.env` file if present. All variables are optional:
    /// - `IMAP_HOST` (default: `127.0.0.1`), `IMAP_PORT` (`143`),
    ///   `IMAPS_PORT` (`993`), `IMAP_SECURITY` (`plain`)
    /// - `SMTP_HOST` (`127.0.0.1`), `SMTP_PORT` (`25`),
    ///   `SMTP_AUTH_ENABLED` (`false`), `SMTP_TLS_ENABLED` (`false`)
    /// - `MAIL_*` outbound settings
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);
        Ok(Self {
            imap_host: vars.string("IMAP_HOST", "127.0.0.1"),
            imap_port: vars.parsed("IMAP_PORT", 143)?,
            imaps_port: vars.parsed("IMAPS_PORT", 993)?,
            imap_security: vars.string("IMAP_SECURITY", "plain").parse()?,
            smtp_host: vars.string("SMTP_HOST", "127.0.0.1"),
            smtp_port: vars.parsed("SMTP_PORT", 25)?,
            smtp_auth_enabled: vars.parsed("SMTP_AUTH_ENABLED", false)?,
            smtp_tls_enabled: vars.parsed("SMTP_TLS_ENABLED", false)?,
            outbound: OutboundMail {
                encoding: vars.string("MAIL_ENCODING", "UTF-8"),
                from_default: vars.string("MAIL_FROM_DEFAULT", ""),
                from_enabled: vars.parsed("MAIL_FROM_ENABLED", false)?,
                host: vars.string("MAIL_HOST", ""),
                password: vars.string("MAIL_PASSWORD", ""),
                port: vars.parsed("MAIL_PORT", 25)?,
                protocol: vars.string("MAIL_PROTOCOL", "smtp"),
                smtp_auth: vars.parsed("MAIL_SMTP_AUTH", false)?,
                smtp_debug: vars.parsed("MAIL_SMTP_DEBUG", false)?,
                smtp_starttls_enable: vars.parsed("MAIL_SMTP_STARTTLS_ENABLE", false)?,
                smtp_timeout: vars.parsed("MAIL_SMTP_TIMEOUT", 20_000)?,
                smtps_auth: vars.parsed("MAIL_SMTPS_AUTH", false)?,
                smtps_starttls_enable: vars.parsed("MAIL_SMTPS_STARTTLS_ENABLE", false)?,
                username: vars.string("MAIL_USERNAME", ""),
            },
        })
    }
}

/// Credentials of the user a session authenticates as.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
}

impl User {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Load the test user from `IMAP_USERNAME` and `IMAP_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            username: lookup("IMAP_USERNAME")
                .ok_or_else(|| Error::Config("IMAP_USERNAME not set".into()))?,
            password: lookup("IMAP_PASSWORD")
                .ok_or_else(|| Error::Config("IMAP_PASSWORD not set".into()))?,
        })
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        (self.0)(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
        })
    }
}
