//! Fake IMAP server for integration testing
//!
//! An in-process server that speaks enough IMAP to drive `ImapStore`
//! and the `mailnav` binary end-to-end:
//!
//! TCP -> greeting -> STARTTLS -> TLS handshake -> LOGIN -> commands -> LOGOUT
//!
//! - `server` -- TCP listener, TLS setup, and command dispatch
//! - `handlers/` -- one module per command family
//! - `mailbox` -- test data model (folders, emails, builder)
//! - `io` -- shared write helpers

mod handlers;
pub mod mailbox;

pub use mailbox::MailboxBuilder;
pub use server::FakeImapServer;
