//! UID COPY command handler.
//!
//! Copies messages from the selected folder into a destination. Each
//! copy gets the destination's next UID and the `\Recent` flag; the
//! originals stay where they are.

use crate::fake_imap::handlers::{Selected, uid_in_set};
use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use imap_codec::imap_types::sequence::SequenceSet;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

enum Outcome {
    Copied,
    NoSource,
    NoDestination,
}

fn copy(mb: &mut Mailbox, source: &str, dest: &str, sequence_set: &SequenceSet) -> Outcome {
    let Some(folder) = mb.get_folder(source) else {
        return Outcome::NoSource;
    };
    let max_uid = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    let copies: Vec<TestEmail> = folder
        .emails
        .iter()
        .filter(|e| uid_in_set(sequence_set, e.uid, max_uid))
        .cloned()
        .collect();

    let Some(dest) = mb.get_folder_mut(dest) else {
        return Outcome::NoDestination;
    };
    for mut email in copies {
        email.uid = dest.next_uid();
        email.add_flag("\\Recent");
        dest.emails.push(email);
    }
    Outcome::Copied
}

pub async fn handle_uid_copy<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    dest_folder: &str,
    mailbox: &Mutex<Mailbox>,
    selected: Option<&Selected>,
    stream: &mut BufReader<S>,
) {
    let Some(selected) = selected else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let outcome = copy(
        &mut mailbox.lock().unwrap(),
        &selected.name,
        dest_folder,
        sequence_set,
    );
    let resp = match outcome {
        Outcome::Copied => format!("{tag} OK COPY completed\r\n"),
        Outcome::NoSource => format!("{tag} NO Folder no longer exists\r\n"),
        Outcome::NoDestination => {
            format!("{tag} NO [TRYCREATE] Destination folder not found\r\n")
        }
    };
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::testing::{read_all, uid_range_to_end, uid_set};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    fn inbox() -> Selected {
        Selected {
            name: "Inbox".into(),
            read_only: true,
        }
    }

    fn mailbox() -> Mutex<Mailbox> {
        Mutex::new(
            MailboxBuilder::new()
                .folder("Inbox")
                .message("a")
                .message("b")
                .folder("Archive")
                .message("old")
                .build(),
        )
    }

    async fn run_copy(
        seq: &SequenceSet,
        dest: &str,
        mb: &Mutex<Mailbox>,
        selected: Option<&Selected>,
    ) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_copy("A1", seq, dest, mb, selected, &mut stream).await;
        drop(stream);
        read_all(client).await
    }

    #[tokio::test]
    #[allow(clippy::significant_drop_tightening)]
    async fn copies_get_new_uids_and_recent() {
        let mb = mailbox();

        let output = run_copy(&uid_range_to_end(1), "Archive", &mb, Some(&inbox())).await;

        assert_eq!(output, "A1 OK COPY completed\r\n");
        let locked = mb.lock().unwrap();
        let archive = locked.get_folder("Archive").unwrap();
        let uids: Vec<u32> = archive.emails.iter().map(|e| e.uid).collect();
        assert_eq!(uids, vec![1, 2, 3]);
        assert!(archive.has_flag(2, "\\Recent"));
        assert!(!archive.has_flag(1, "\\Recent"));
        assert_eq!(locked.get_folder("Inbox").unwrap().emails.len(), 2);
    }

    #[tokio::test]
    #[allow(clippy::significant_drop_tightening)]
    async fn copies_only_requested_uids() {
        let mb = mailbox();

        run_copy(&uid_set(2), "Archive", &mb, Some(&inbox())).await;

        let locked = mb.lock().unwrap();
        let archive = locked.get_folder("Archive").unwrap();
        assert_eq!(archive.emails.len(), 2);
        assert!(String::from_utf8_lossy(&archive.emails[1].raw).contains("Subject: b"));
    }

    #[tokio::test]
    async fn missing_dest_returns_trycreate() {
        let output = run_copy(&uid_set(1), "Nowhere", &mailbox(), Some(&inbox())).await;
        assert!(output.contains("A1 NO [TRYCREATE]"));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let output = run_copy(&uid_set(1), "Archive", &mailbox(), None).await;
        assert!(output.contains("A1 BAD No folder selected"));
    }
}
