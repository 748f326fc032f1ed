//! Waiting for removed content to disappear
//!
//! Deletes are confirmed out of band: after a folder or message is
//! removed over IMAP, the navigator waits until the content repository
//! stops resolving it.

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// Blocks until a resource no longer resolves.
#[allow(async_fn_in_trait)]
pub trait ContentPresence {
    /// Wait until `path` (a full mailbox path; for a message
    /// `<folder>/<subject>`) is gone, or fail once the implementation's
    /// own bound is exhausted.
    async fn wait_until_absent(&self, path: &str) -> Result<()>;
}

/// A single existence check against the content repository.
#[allow(async_fn_in_trait)]
pub trait ContentProbe {
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Polls a [`ContentProbe`] until the resource is gone.
#[derive(Debug, Clone)]
pub struct PollingPresence<C> {
    probe: C,
    attempts: u32,
    interval: Duration,
}

impl<C> PollingPresence<C> {
    pub const DEFAULT_ATTEMPTS: u32 = 20;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    #[must_use]
    pub const fn new(probe: C) -> Self {
        Self {
            probe,
            attempts: Self::DEFAULT_ATTEMPTS,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    /// Number of checks before giving up; at least one check is made.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl<C: ContentProbe> ContentPresence for PollingPresence<C> {
    async fn wait_until_absent(&self, path: &str) -> Result<()> {
        for attempt in 1..=self.attempts {
            if !self.probe.exists(path).await? {
                debug!("'{}' absent after {} attempt(s)", path, attempt);
                return Ok(());
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Err(Error::remote(
            "Wait for removal of",
            path,
            format!("still present after {} attempts", self.attempts),
        ))
    }
}

/// Does not wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl ContentPresence for Unchecked {
    async fn wait_until_absent(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}
