//! Folder management: CREATE, DELETE, RENAME, SUBSCRIBE and
//! UNSUBSCRIBE.
//!
//! All of these mutate the shared mailbox under a short lock and
//! answer with a tagged OK or NO, never with untagged data.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::{Mailbox, SEPARATOR};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

async fn respond<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    command: &str,
    outcome: Result<(), &str>,
    stream: &mut BufReader<S>,
) {
    let resp = match outcome {
        Ok(()) => format!("{tag} OK {command} completed\r\n"),
        Err(reason) => format!("{tag} NO {reason}\r\n"),
    };
    let _ = write_line(stream, &resp).await;
}

/// CREATE. A trailing separator only hints that the folder will hold
/// sub-folders; missing ancestors are created too.
pub async fn handle_create<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    name: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let name = name.trim_end_matches(SEPARATOR);
    let created = mailbox.lock().unwrap().create(name);
    let outcome = if created {
        Ok(())
    } else {
        Err("[ALREADYEXISTS] Folder already exists")
    };
    respond(tag, "CREATE", outcome, stream).await;
}

/// DELETE removes only the named folder; sub-folders stay.
pub async fn handle_delete<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    name: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let removed = {
        let mut mb = mailbox.lock().unwrap();
        let before = mb.folders.len();
        mb.folders.retain(|f| f.name != name);
        before != mb.folders.len()
    };
    let outcome = if removed {
        Ok(())
    } else {
        Err("[NONEXISTENT] Folder not found")
    };
    respond(tag, "DELETE", outcome, stream).await;
}

/// RENAME moves the folder and everything below it.
pub async fn handle_rename<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    from: &str,
    to: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let outcome = {
        let mut mb = mailbox.lock().unwrap();
        if mb.get_folder(from).is_none() {
            Err("[NONEXISTENT] Folder not found")
        } else if mb.get_folder(to).is_some() {
            Err("[ALREADYEXISTS] Target folder exists")
        } else {
            let prefix = format!("{from}{SEPARATOR}");
            for folder in &mut mb.folders {
                if folder.name == from {
                    folder.name = to.to_string();
                } else if let Some(rest) = folder.name.strip_prefix(&prefix) {
                    folder.name = format!("{to}{SEPARATOR}{rest}");
                }
            }
            Ok(())
        }
    };
    respond(tag, "RENAME", outcome, stream).await;
}

/// SUBSCRIBE (`subscribe == true`) or UNSUBSCRIBE.
pub async fn handle_subscribe<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    name: &str,
    subscribe: bool,
    mailbox: &Mutex<Mailbox>,
    stream: &mut BufReader<S>,
) {
    let command = if subscribe { "SUBSCRIBE" } else { "UNSUBSCRIBE" };
    let found = mailbox
        .lock()
        .unwrap()
        .get_folder_mut(name)
        .map(|f| f.subscribed = subscribe)
        .is_some();
    let outcome = if found {
        Ok(())
    } else {
        Err("[NONEXISTENT] Folder not found")
    };
    respond(tag, command, outcome, stream).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::testing::read_all;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    fn names(mb: &Mutex<Mailbox>) -> Vec<String> {
        let mut names: Vec<String> = mb
            .lock()
            .unwrap()
            .folders
            .iter()
            .map(|f| f.name.clone())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn create_adds_missing_ancestors() {
        let mb = Mutex::new(MailboxBuilder::new().folder("Root").build());
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_create("A1", "Root/a/b/", &mb, &mut stream).await;
        drop(stream);

        assert_eq!(read_all(client).await, "A1 OK CREATE completed\r\n");
        assert_eq!(names(&mb), vec!["Root", "Root/a", "Root/a/b"]);
    }

    #[tokio::test]
    async fn create_existing_is_refused() {
        let mb = Mutex::new(MailboxBuilder::new().folder("Root").build());
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_create("A1", "Root", &mb, &mut stream).await;
        drop(stream);

        assert!(read_all(client).await.starts_with("A1 NO [ALREADYEXISTS]"));
    }

    #[tokio::test]
    async fn delete_leaves_children() {
        let mb = Mutex::new(
            MailboxBuilder::new()
                .folder("Root")
                .folder("Root/a")
                .build(),
        );
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_delete("A1", "Root", &mb, &mut stream).await;
        handle_delete("A2", "Nowhere", &mb, &mut stream).await;
        drop(stream);

        let output = read_all(client).await;
        assert!(output.contains("A1 OK DELETE completed"));
        assert!(output.contains("A2 NO [NONEXISTENT]"));
        assert_eq!(names(&mb), vec!["Root/a"]);
    }

    #[tokio::test]
    async fn rename_moves_subtree() {
        let mb = Mutex::new(
            MailboxBuilder::new()
                .folder("Root/old")
                .folder("Root/old/child")
                .folder("Root/older")
                .build(),
        );
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_rename("A1", "Root/old", "Root/new", &mb, &mut stream).await;
        drop(stream);

        assert_eq!(read_all(client).await, "A1 OK RENAME completed\r\n");
        assert_eq!(names(&mb), vec!["Root/new", "Root/new/child", "Root/older"]);
    }

    #[tokio::test]
    async fn rename_onto_existing_is_refused() {
        let mb = Mutex::new(MailboxBuilder::new().folder("a").folder("b").build());
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_rename("A1", "a", "b", &mb, &mut stream).await;
        drop(stream);

        assert!(read_all(client).await.starts_with("A1 NO [ALREADYEXISTS]"));
        assert_eq!(names(&mb), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn subscribe_toggles_flag() {
        let mb = Mutex::new(MailboxBuilder::new().folder("a").build());
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        handle_subscribe("A1", "a", true, &mb, &mut stream).await;
        assert!(mb.lock().unwrap().get_folder("a").unwrap().subscribed);
        handle_subscribe("A2", "a", false, &mb, &mut stream).await;
        drop(stream);

        let output = read_all(client).await;
        assert!(output.contains("A1 OK SUBSCRIBE completed"));
        assert!(output.contains("A2 OK UNSUBSCRIBE completed"));
        assert!(!mb.lock().unwrap().get_folder("a").unwrap().subscribed);
    }
}
