//! Retained search results

use serde::Serialize;

use crate::message::Message;

/// The result of the most recent subject search.
///
/// Each new search replaces the previous results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    messages: Vec<Message>,
}

impl SearchResults {
    #[must_use]
    pub const fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Whether a message with subject `name.extension` was found.
    ///
    /// A leading dot on `extension` is accepted.
    #[must_use]
    pub fn contains(&self, name: &str, extension: &str) -> bool {
        let subject = format!("{name}.{}", extension.trim_start_matches('.'));
        self.messages.iter().any(|m| m.subject == subject)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    #[must_use]
    pub fn subjects(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.subject.as_str()).collect()
    }
}
