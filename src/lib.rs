//! Mailbox navigation DSL for testing a content server's mail endpoints
//!
//! The server exposes its repository as an IMAP folder tree under the
//! `Alfresco IMAP` prefix space and accepts mail over SMTP. This crate
//! drives both from test code:
//!
//! - [`Navigator`] walks and edits the folder tree over any
//!   [`MailboxStore`] ([`ImapStore`] for a live server, [`MemoryStore`]
//!   in process), with chainable assertions via
//!   [`Navigator::assert_that`].
//! - [`SmtpSession`] composes and sends mail into the server.
//! - [`ServerConfiguration`] and [`ServerSettings`] snapshot, restore,
//!   and edit the server's mail configuration.

mod assertion;
mod compose;
mod config;
mod connection;
mod error;
mod flag;
mod flag_editor;
mod folder;
mod location;
pub mod locator;
mod message;
mod navigator;
pub mod path;
mod presence;
mod protocol;
mod search;
mod server_config;
mod settings;
mod smtp;
mod store;

pub use assertion::{DOCUMENT_LABELS, DocumentInfo, ImapAssertion};
pub use compose::{ComposeMessage, MailAttachment, OutgoingMail};
pub use config::{EmailProperties, ImapSecurity, OutboundMail, User};
pub use error::{Error, Result};
pub use flag::{Flag, Flags};
pub use flag_editor::FlagEditor;
pub use folder::FolderEntry;
pub use location::Location;
pub use message::Message;
pub use navigator::Navigator;
pub use presence::{ContentPresence, ContentProbe, PollingPresence, Unchecked};
pub use protocol::Protocol;
pub use search::SearchResults;
pub use server_config::{ConfigService, Scope, ServerConfiguration};
pub use settings::{Number, ServerSettings, Switch, Text};
pub use smtp::{LettreSender, MailSender, SmtpAssertion, SmtpEndpoint, SmtpSession};
pub use store::{FolderKind, ImapStore, MailboxStore, MemoryStore, MemoryStoreBuilder, OpenMode};
