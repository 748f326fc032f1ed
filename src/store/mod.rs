//! Mailbox store capability
//!
//! A [`MailboxStore`] is a single authenticated session against a
//! folder/message hierarchy. The navigator drives it one call at a time;
//! folder open state is whatever the store reports through
//! [`MailboxStore::mode`] and is never cached by callers.

mod imap;
mod memory;

pub use imap::ImapStore;
pub use memory::{MemoryStore, MemoryStoreBuilder};

use serde::Serialize;

use crate::config::User;
use crate::error::Result;
use crate::flag::Flags;
use crate::message::Message;

/// How a folder is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// What a newly created folder may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderKind {
    HoldsFolders,
    HoldsMessages,
}

/// Folder and message primitives of a remote mailbox tree.
///
/// Paths are full mailbox paths as built by [`crate::path`]. Rules every
/// implementation enforces:
/// - an open folder cannot be deleted or renamed,
/// - listing messages needs the folder open,
/// - changing flags needs the folder open read-write,
/// - closing with `expunge` on a read-write folder removes messages
///   flagged `\Deleted`.
#[allow(async_fn_in_trait)]
pub trait MailboxStore {
    async fn authenticate(&mut self, user: &User) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn open(&mut self, path: &str, mode: OpenMode) -> Result<()>;

    async fn close(&mut self, path: &str, expunge: bool) -> Result<()>;

    /// The mode `path` is open in, or `None` when closed.
    fn mode(&self, path: &str) -> Option<OpenMode>;

    async fn create(&mut self, path: &str, kind: FolderKind) -> Result<()>;

    /// Delete a folder. `recurse` removes its sub-folders too.
    async fn delete(&mut self, path: &str, recurse: bool) -> Result<()>;

    async fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Full paths of the immediate children of `path` (`""` is the root).
    async fn list(&mut self, path: &str) -> Result<Vec<String>>;

    /// Whether `path` resolves to a folder, or to a message given as
    /// `<folder>/<subject>`.
    async fn exists(&mut self, path: &str) -> Result<bool>;

    /// Messages of an open folder, in store order.
    async fn messages(&mut self, path: &str) -> Result<Vec<Message>>;

    /// Messages of an open folder whose subject satisfies `predicate`.
    async fn search<F>(&mut self, path: &str, predicate: F) -> Result<Vec<Message>>
    where
        F: Fn(&str) -> bool,
    {
        let messages = self.messages(path).await?;
        Ok(messages
            .into_iter()
            .filter(|m| predicate(&m.subject))
            .collect())
    }

    /// Add copies of `messages` to the folder at `path`.
    async fn append(&mut self, path: &str, messages: &[Message]) -> Result<()>;

    /// Set (`value = true`) or clear `flags` on message `uid` of `path`.
    async fn set_flags(&mut self, path: &str, uid: u32, flags: &Flags, value: bool)
    -> Result<()>;

    async fn set_subscribed(&mut self, path: &str, subscribed: bool) -> Result<()>;

    async fn is_subscribed(&mut self, path: &str) -> Result<bool>;
}
