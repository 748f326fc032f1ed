//! Locating messages by subject

use crate::message::Message;

/// First message whose subject equals `subject` exactly.
///
/// Matching is case-sensitive and untrimmed. When several messages
/// share a subject the first in listing order wins.
#[must_use]
pub fn find_by_subject<'a>(messages: &'a [Message], subject: &str) -> Option<&'a Message> {
    messages.iter().find(|m| m.subject == subject)
}

/// Every message whose subject is one of `subjects`, in listing order.
#[must_use]
pub fn find_all_by_subject<'a>(messages: &'a [Message], subjects: &[&str]) -> Vec<&'a Message> {
    messages
        .iter()
        .filter(|m| subjects.contains(&m.subject.as_str()))
        .collect()
}
