//! SELECT and EXAMINE command handler.
//!
//! Both open a folder and report its metadata; EXAMINE opens it
//! read-only, which matters to CLOSE (no expunge) and to UID STORE
//! (refused).
//!
//! - `* N EXISTS` -- number of messages in the folder.
//! - `* N RECENT` -- messages carrying `\Recent`.
//! - `* OK [UIDVALIDITY V]` / `* OK [UIDNEXT U]` -- UID bookkeeping.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// The folder a connection has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub name: String,
    pub read_only: bool,
}

/// Handle SELECT (`read_only == false`) or EXAMINE. A failed select
/// leaves nothing selected, as RFC 3501 requires.
pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    read_only: bool,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<Selected> {
    let command = if read_only { "EXAMINE" } else { "SELECT" };
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let resp = format!("{tag} NO Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return None;
    };

    let recent = folder.emails.iter().filter(|e| e.has_flag("\\Recent")).count();
    let lines = [
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", folder.emails.len()),
        format!("* {recent} RECENT\r\n"),
        "* OK [UIDVALIDITY 1]\r\n".to_string(),
        format!("* OK [UIDNEXT {}]\r\n", folder.next_uid()),
        "* OK [PERMANENTFLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)] Limited\r\n"
            .to_string(),
    ];
    for line in &lines {
        if write_line(stream, line).await.is_err() {
            return None;
        }
    }

    let access = if read_only { "READ-ONLY" } else { "READ-WRITE" };
    let resp = format!("{tag} OK [{access}] {command} completed\r\n");
    let _ = write_line(stream, &resp).await;
    Some(Selected {
        name: folder_name.to_string(),
        read_only,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::testing::read_all;
    use crate::fake_imap::mailbox::{MailboxBuilder, document_message};
    use tokio::io::BufReader;

    async fn run(folder_name: &str, read_only: bool, mailbox: &Mailbox) -> (String, Option<Selected>) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        let selected = handle_select("A1", folder_name, read_only, mailbox, &mut stream).await;
        drop(stream);
        (read_all(client).await, selected)
    }

    #[tokio::test]
    async fn select_opens_read_write() {
        let mailbox = MailboxBuilder::new()
            .folder("Inbox")
            .message("a")
            .message("b")
            .build();

        let (output, selected) = run("Inbox", false, &mailbox).await;

        assert_eq!(
            selected,
            Some(Selected {
                name: "Inbox".into(),
                read_only: false
            })
        );
        assert!(output.contains("* 2 EXISTS"));
        assert!(output.contains("* OK [UIDNEXT 3]"));
        assert!(output.contains("A1 OK [READ-WRITE] SELECT completed"));
    }

    #[tokio::test]
    async fn examine_opens_read_only() {
        let mailbox = MailboxBuilder::new().folder("Inbox").build();

        let (output, selected) = run("Inbox", true, &mailbox).await;

        assert!(selected.unwrap().read_only);
        assert!(output.contains("A1 OK [READ-ONLY] EXAMINE completed"));
    }

    #[tokio::test]
    async fn counts_recent_messages() {
        let raw = document_message("copied");
        let mailbox = MailboxBuilder::new()
            .folder("Inbox")
            .email(1, &["\\Seen"], &raw)
            .email(2, &["\\Recent"], &raw)
            .build();

        let (output, _) = run("Inbox", false, &mailbox).await;
        assert!(output.contains("* 1 RECENT"));
    }

    #[tokio::test]
    async fn missing_folder_selects_nothing() {
        let mailbox = MailboxBuilder::new().folder("Inbox").build();

        let (output, selected) = run("Nowhere", false, &mailbox).await;

        assert!(selected.is_none());
        assert_eq!(output, "A1 NO Folder not found\r\n");
    }
}
