//! LIST and LSUB command handler.
//!
//! Matches folder names against the client's pattern (RFC 3501
//! Section 6.3.8): `*` matches anything, `%` anything except the
//! hierarchy separator. LSUB reports only subscribed folders.
//!
//! ```text
//! A0004 LIST "" "Alfresco IMAP/%"
//! * LIST (\HasChildren) "/" "Alfresco IMAP/Sites"
//! A0004 OK LIST completed
//! ```

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::{Mailbox, SEPARATOR};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

fn matches(pattern: &[char], name: &[char]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some(('*', rest)) => (0..=name.len()).any(|i| matches(rest, &name[i..])),
        Some(('%', rest)) => {
            let span = name.iter().position(|&c| c == SEPARATOR).unwrap_or(name.len());
            (0..=span).any(|i| matches(rest, &name[i..]))
        }
        Some((&c, rest)) => name.first() == Some(&c) && matches(rest, &name[1..]),
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    matches(&pattern, &name)
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Handle LIST (`subscribed_only == false`) or LSUB.
pub async fn handle_list<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    pattern: &str,
    subscribed_only: bool,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) {
    let command = if subscribed_only { "LSUB" } else { "LIST" };
    let found = mailbox
        .folders
        .iter()
        .filter(|f| !subscribed_only || f.subscribed)
        .filter(|f| pattern_matches(pattern, &f.name));

    for folder in found {
        let attributes = if mailbox.has_children(&folder.name) {
            "\\HasChildren"
        } else {
            "\\HasNoChildren"
        };
        let line = format!(
            "* {command} ({attributes}) \"{SEPARATOR}\" {}\r\n",
            quote(&folder.name)
        );
        if write_line(stream, &line).await.is_err() {
            return;
        }
    }
    let resp = format!("{tag} OK {command} completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::testing::read_all;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    fn tree() -> Mailbox {
        MailboxBuilder::new()
            .folder("Alfresco IMAP")
            .folder("Alfresco IMAP/Sites")
            .folder("Alfresco IMAP/Sites/s1")
            .subscribed()
            .folder("Alfresco IMAP/Data Dictionary")
            .build()
    }

    async fn run(pattern: &str, subscribed_only: bool, mailbox: &Mailbox) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_list("A1", pattern, subscribed_only, mailbox, &mut stream).await;
        drop(stream);
        read_all(client).await
    }

    #[test]
    fn percent_stops_at_separator() {
        assert!(pattern_matches("Alfresco IMAP/%", "Alfresco IMAP/Sites"));
        assert!(!pattern_matches("Alfresco IMAP/%", "Alfresco IMAP/Sites/s1"));
        assert!(!pattern_matches("Alfresco IMAP/%", "Alfresco IMAP"));
        assert!(pattern_matches("%", "Alfresco IMAP"));
    }

    #[test]
    fn star_crosses_separator() {
        assert!(pattern_matches("Alfresco IMAP/*", "Alfresco IMAP/Sites/s1"));
        assert!(pattern_matches("*", "anything/at/all"));
    }

    #[tokio::test]
    async fn lists_direct_children() {
        let output = run("Alfresco IMAP/%", false, &tree()).await;

        assert!(output.contains("(\\HasChildren) \"/\" \"Alfresco IMAP/Sites\""));
        assert!(output.contains("(\\HasNoChildren) \"/\" \"Alfresco IMAP/Data Dictionary\""));
        assert!(!output.contains("\"Alfresco IMAP/Sites/s1\""));
        assert!(output.ends_with("A1 OK LIST completed\r\n"));
    }

    #[tokio::test]
    async fn exact_name_lists_one_folder() {
        let output = run("Alfresco IMAP/Sites", false, &tree()).await;
        assert_eq!(output.matches("* LIST").count(), 1);
    }

    #[tokio::test]
    async fn missing_folder_returns_only_ok() {
        let output = run("Nowhere", false, &tree()).await;
        assert_eq!(output, "A1 OK LIST completed\r\n");
    }

    #[tokio::test]
    async fn lsub_reports_subscribed_only() {
        let output = run("*", true, &tree()).await;
        assert!(output.contains("* LSUB (\\HasNoChildren) \"/\" \"Alfresco IMAP/Sites/s1\""));
        assert_eq!(output.matches("* LSUB").count(), 1);
        assert!(output.ends_with("A1 OK LSUB completed\r\n"));
    }
}
