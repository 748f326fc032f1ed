//! Flag changes on one located message

use tracing::info;

use crate::error::Result;
use crate::flag::{Flag, Flags};
use crate::navigator::Navigator;
use crate::presence::ContentPresence;
use crate::store::MailboxStore;

/// Sets and clears flags on the message a [`Navigator`] last touched.
///
/// Every call is applied immediately; bulk calls send one flag set in a
/// single store call. Flags are never read back here.
pub struct FlagEditor<'a, S, P> {
    navigator: &'a mut Navigator<S, P>,
    folder: String,
    uid: u32,
    subject: String,
}

impl<'a, S: MailboxStore, P: ContentPresence> FlagEditor<'a, S, P> {
    pub(crate) const fn new(
        navigator: &'a mut Navigator<S, P>,
        folder: String,
        uid: u32,
        subject: String,
    ) -> Self {
        Self {
            navigator,
            folder,
            uid,
            subject,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub async fn set_flag(&mut self, flag: Flag) -> Result<&mut Self> {
        self.apply(&[flag], true).await
    }

    pub async fn clear_flag(&mut self, flag: Flag) -> Result<&mut Self> {
        self.apply(&[flag], false).await
    }

    pub async fn set_flags(&mut self, flags: &[Flag]) -> Result<&mut Self> {
        self.apply(flags, true).await
    }

    pub async fn clear_flags(&mut self, flags: &[Flag]) -> Result<&mut Self> {
        self.apply(flags, false).await
    }

    /// Back to the navigator for further calls.
    pub fn done(self) -> &'a mut Navigator<S, P> {
        self.navigator
    }

    async fn apply(&mut self, flags: &[Flag], value: bool) -> Result<&mut Self> {
        for flag in flags {
            if value {
                info!("IMAP: Add '{}' flag to message '{}'", flag, self.subject);
            } else {
                info!("IMAP: Remove '{}' flag from message '{}'", flag, self.subject);
            }
        }
        let set: Flags = flags.iter().copied().collect();
        self.navigator
            .store_mut()
            .set_flags(&self.folder, self.uid, &set, value)
            .await?;
        Ok(self)
    }
}
