//! IMAP command handlers for the fake server.
//!
//! Each module handles one command or a family of closely related
//! ones. Helpers shared between handlers live here.

mod folders;
mod list;
mod select;
mod uid_copy;

use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};

pub use close::handle_close;
pub use folders::{handle_create, handle_delete, handle_rename, handle_subscribe};
pub use list::handle_list;
pub use select::{Selected, handle_select};
pub use session::{handle_capability, handle_login, handle_logout, handle_noop};
pub use uid_copy::handle_uid_copy;
pub use uid_fetch::handle_uid_fetch;
pub use uid_store::{StoreArgs, handle_uid_store};

/// Whether `uid` falls inside `seq_set`. `*` stands for `max_uid`, the
/// largest UID in the folder.
fn uid_in_set(seq_set: &SequenceSet, uid: u32, max_uid: u32) -> bool {
    let resolve = |v: &SeqOrUid| match v {
        SeqOrUid::Value(v) => v.get(),
        SeqOrUid::Asterisk => max_uid,
    };
    seq_set.0.as_ref().iter().any(|seq| match seq {
        Sequence::Single(v) => resolve(v) == uid,
        Sequence::Range(a, b) => {
            let (a, b) = (resolve(a), resolve(b));
            (a.min(b)..=a.max(b)).contains(&uid)
        }
    })
}

/// Every quoted string on a raw command line, unescaped.
///
/// async-imap quotes LOGIN credentials and LIST patterns, so this is
/// enough to recover them without going through the typed command.
pub fn quoted_strings(line: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                '"' => break,
                other => value.push(other),
            }
        }
        found.push(value);
    }
    found
}

#[cfg(test)]
pub mod testing {
    use std::num::NonZeroU32;

    use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
    use tokio::io::{AsyncReadExt, BufReader, DuplexStream};

    pub fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(
                NonZeroU32::new(uid).unwrap(),
            ))]
            .try_into()
            .unwrap(),
        )
    }

    /// `first:*`
    pub fn uid_range_to_end(first: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Range(
                SeqOrUid::Value(NonZeroU32::new(first).unwrap()),
                SeqOrUid::Asterisk,
            )]
            .try_into()
            .unwrap(),
        )
    }

    /// Everything the handler wrote, once the server side is dropped.
    pub async fn read_all(client: DuplexStream) -> String {
        let mut buf = Vec::new();
        BufReader::new(client).read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{uid_range_to_end, uid_set};
    use super::*;

    #[test]
    fn single_uid_matches_only_itself() {
        let set = uid_set(3);
        assert!(uid_in_set(&set, 3, 10));
        assert!(!uid_in_set(&set, 4, 10));
    }

    #[test]
    fn open_range_runs_to_largest_uid() {
        let set = uid_range_to_end(2);
        assert!(!uid_in_set(&set, 1, 5));
        assert!(uid_in_set(&set, 2, 5));
        assert!(uid_in_set(&set, 5, 5));
    }

    #[test]
    fn quoted_strings_are_unescaped() {
        let line = r#"A3 LIST "" "Alfresco IMAP/say \"hi\"/%""#;
        assert_eq!(
            quoted_strings(line),
            vec![String::new(), "Alfresco IMAP/say \"hi\"/%".to_string()]
        );
    }

    #[test]
    fn login_arguments_are_recovered() {
        assert_eq!(
            quoted_strings("A1 LOGIN \"admin\" \"p\\\\w\"\r\n"),
            vec!["admin".to_string(), "p\\w".to_string()]
        );
    }
}
