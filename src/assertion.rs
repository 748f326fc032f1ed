//! Checks over a navigator's session
//!
//! Every check leaves the location untouched and fails with
//! [`Error::AssertionFailed`] naming the resource and the expectation
//! that was not met.

use regex::Regex;
use tracing::info;

use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::message::Message;
use crate::navigator::Navigator;
use crate::path;
use crate::presence::ContentPresence;
use crate::protocol::Protocol;
use crate::store::{MailboxStore, OpenMode};

/// Labels the server writes into the body of a document message.
pub const DOCUMENT_LABELS: [&str; 12] = [
    "Document name",
    "Title",
    "Description",
    "Creator",
    "Created",
    "Modifier",
    "Modified",
    "Size",
    "CONTENT LINKS",
    "Content folder",
    "Content URL",
    "Download URL",
];

const CONTENT_URL_PREFIX: &str = "share/proxy/alfresco/api/node/content/workspace/SpacesStore";

/// What the repository knows about a document published as a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Node reference, optionally followed by `;<version>`.
    pub node_ref: String,
}

impl DocumentInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, node_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_ref: node_ref.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The node id without any version suffix.
    #[must_use]
    pub fn node_id(&self) -> &str {
        self.node_ref.split(';').next().unwrap_or_default()
    }

    /// Repository-relative URL the server links the content under.
    #[must_use]
    pub fn content_url(&self) -> String {
        format!("{CONTENT_URL_PREFIX}/{}/{}", self.node_id(), self.name)
    }
}

fn without_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Assertions for an IMAP [`Navigator`]; see [`Navigator::assert_that`].
pub struct ImapAssertion<'a, S, P> {
    navigator: &'a mut Navigator<S, P>,
}

impl<'a, S: MailboxStore, P: ContentPresence> ImapAssertion<'a, S, P> {
    pub(crate) const fn new(navigator: &'a mut Navigator<S, P>) -> Self {
        Self { navigator }
    }

    /// Back to the navigator for further calls.
    pub fn done(self) -> &'a mut Navigator<S, P> {
        self.navigator
    }

    fn last_resource(&self) -> String {
        self.navigator.location().last_resource().to_string()
    }

    fn check(resource: &str, ok: bool, expectation: impl FnOnce() -> String) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(Error::assertion(resource, expectation()))
        }
    }

    async fn messages_of(&mut self, folder: &str) -> Result<Vec<Message>> {
        self.navigator
            .folder_messages(folder, OpenMode::ReadOnly)
            .await
    }

    /// The message the last resource points at.
    async fn last_message(&mut self) -> Result<Message> {
        let resource = self.last_resource();
        let folder = path::parent_path(&resource);
        let subject = path::object_name(&resource);
        self.messages_of(folder)
            .await?
            .into_iter()
            .find(|m| m.subject == subject)
            .ok_or_else(|| Error::not_found("Find message", &resource))
    }

    /// A message of the last touched folder by subject.
    async fn message_in_folder(&mut self, subject: &str) -> Result<Message> {
        let folder = self.last_resource();
        self.messages_of(&folder)
            .await?
            .into_iter()
            .find(|m| m.subject == subject)
            .ok_or_else(|| Error::not_found("Find message", &format!("{folder}/{subject}")))
    }

    pub async fn count_messages_is(&mut self, expected: usize) -> Result<&mut Self> {
        let folder = self.last_resource();
        info!("IMAP: Assert folder '{}' has {} messages", folder, expected);
        let found = self.messages_of(&folder).await?.len();
        Self::check(&folder, found == expected, || {
            format!("expected {expected} messages, found {found}")
        })?;
        Ok(self)
    }

    pub async fn has_new_messages(&mut self) -> Result<&mut Self> {
        let folder = self.last_resource();
        info!("IMAP: Assert folder '{}' has new messages", folder);
        let messages = self.messages_of(&folder).await?;
        let any_new = messages.iter().any(|m| m.has_flag(Flag::Recent));
        Self::check(&folder, any_new, || "expected new messages".to_string())?;
        Ok(self)
    }

    pub fn user_is_connected(&mut self) -> Result<&mut Self> {
        self.connection_is(true)?;
        Ok(self)
    }

    pub fn user_is_not_connected(&mut self) -> Result<&mut Self> {
        self.connection_is(false)?;
        Ok(self)
    }

    fn connection_is(&self, expected: bool) -> Result<()> {
        let user = self
            .navigator
            .test_user()
            .map_or_else(|| "<none>".to_string(), |u| u.username.clone());
        let not = if expected { "" } else { "NOT " };
        info!("IMAP: Assert user {} is {}connected", user, not);
        Self::check(&user, self.navigator.is_connected() == expected, || {
            format!("expected user to be {not}connected via IMAP")
        })
    }

    /// The last touched folder or message resolves in the store.
    pub async fn exists_in_imap(&mut self) -> Result<&mut Self> {
        let resource = self.last_resource();
        info!("IMAP: Assert that '{}' exists in IMAP", resource);
        let exists = self.navigator.store_mut().exists(&resource).await?;
        Self::check(&resource, exists, || "does not exist in IMAP".to_string())?;
        Ok(self)
    }

    pub async fn contains_messages(&mut self, subjects: &[&str]) -> Result<&mut Self> {
        self.messages_present(subjects, true).await?;
        Ok(self)
    }

    pub async fn does_not_contain_messages(&mut self, subjects: &[&str]) -> Result<&mut Self> {
        self.messages_present(subjects, false).await?;
        Ok(self)
    }

    async fn messages_present(&mut self, subjects: &[&str], expected: bool) -> Result<()> {
        let folder = self.last_resource();
        let messages = self.messages_of(&folder).await?;
        for subject in subjects {
            let subject = path::object_name(subject);
            let not = if expected { "" } else { "not " };
            info!(
                "IMAP: Assert that folder '{}' does {}contain message '{}'",
                folder, not, subject
            );
            let present = messages.iter().any(|m| m.subject == subject);
            Self::check(&folder, present == expected, || {
                format!("expected message '{subject}' to {not}be present")
            })?;
        }
        Ok(())
    }

    /// The last touched message's body carries every document label.
    pub async fn file_content_is_displayed(&mut self) -> Result<&mut Self> {
        let message = self.last_message().await?;
        info!("IMAP: Assert that message '{}' content is displayed", message.subject);
        for label in DOCUMENT_LABELS {
            Self::check(&message.path(), message.content.contains(label), || {
                format!("content does not contain '{label}'")
            })?;
        }
        Ok(self)
    }

    /// The last touched message's body describes `document`.
    ///
    /// Whitespace is ignored. Absent title and description are shown as
    /// `NONE` by the server.
    pub async fn message_content_matches(
        &mut self,
        document: &DocumentInfo,
    ) -> Result<&mut Self> {
        let resource = self.last_resource();
        let folder = path::parent_path(&resource).to_string();
        let subject = path::object_name(&document.name).to_string();
        info!("IMAP: Assert that message '{}' content matches", subject);
        let message = self
            .messages_of(&folder)
            .await?
            .into_iter()
            .find(|m| m.subject == subject)
            .ok_or_else(|| Error::not_found("Find message", &format!("{folder}/{subject}")))?;
        let content = without_whitespace(&message.content);
        let target = message.path();

        let fields = [
            ("Document name", subject.as_str()),
            ("Title", document.title.as_deref().unwrap_or("NONE")),
            ("Description", document.description.as_deref().unwrap_or("NONE")),
        ];
        for (label, value) in fields {
            let expected = without_whitespace(&format!("{label}:{value}"));
            Self::check(&target, content.contains(&expected), || {
                format!("'{label}' is not '{value}'")
            })?;
        }

        let site_relative = folder
            .strip_prefix(&path::sites_path())
            .unwrap_or(&folder)
            .trim_start_matches(path::SEPARATOR);
        let folder_link =
            without_whitespace(&format!("share/page/site/{site_relative}")).to_lowercase();
        let pattern = format!("Contentfolder:.*{}", regex::escape(&folder_link));
        let folder_ok = Regex::new(&pattern)
            .map_err(|e| Error::invalid_argument("folder link", e.to_string()))?
            .is_match(&content);
        Self::check(&target, folder_ok, || {
            format!("'Content folder' does not link to '{folder_link}'")
        })?;

        let content_url = without_whitespace(&document.content_url());
        let pattern = format!("ContentURL:.*{}", regex::escape(&content_url));
        let url_ok = Regex::new(&pattern)
            .map_err(|e| Error::invalid_argument("content url", e.to_string()))?
            .is_match(&content);
        Self::check(&target, url_ok, || {
            format!("'Content URL' is not '{content_url}'")
        })?;

        let download_url = format!("{content_url}?a=true");
        Self::check(&target, content.contains(&download_url), || {
            format!("'Download URL' is not '{download_url}'")
        })?;
        Ok(self)
    }

    pub fn current_directory_is(&mut self, expected: &str) -> Result<&mut Self> {
        let current = self.navigator.location().current().to_string();
        info!("IMAP: Assert that current directory is '{}'", expected);
        let expected = path::remove_trailing_slash(expected);
        Self::check(&current, current == expected, || {
            format!("expected current directory '{expected}'")
        })?;
        Ok(self)
    }

    pub async fn contains_folders(&mut self, names: &[&str]) -> Result<&mut Self> {
        self.folders_present(names, true).await?;
        Ok(self)
    }

    pub async fn does_not_contain_folders(&mut self, names: &[&str]) -> Result<&mut Self> {
        self.folders_present(names, false).await?;
        Ok(self)
    }

    async fn folders_present(&mut self, names: &[&str], expected: bool) -> Result<()> {
        let current = self.navigator.location().current().to_string();
        let folders = self.navigator.get_folders().await?;
        for name in names {
            let not = if expected { "" } else { "not " };
            info!("IMAP: Assert that '{}' does {}contain folder '{}'", current, not, name);
            let present = folders.iter().any(|f| f.name == *name);
            Self::check(&current, present == expected, || {
                format!("expected folder '{name}' to {not}be present")
            })?;
        }
        Ok(())
    }

    pub async fn message_contains_flags(&mut self, flags: &[Flag]) -> Result<&mut Self> {
        self.flags_present(flags, true).await?;
        Ok(self)
    }

    pub async fn message_does_not_contain_flags(
        &mut self,
        flags: &[Flag],
    ) -> Result<&mut Self> {
        self.flags_present(flags, false).await?;
        Ok(self)
    }

    async fn flags_present(&mut self, flags: &[Flag], expected: bool) -> Result<()> {
        let message = self.last_message().await?;
        for flag in flags {
            let not = if expected { "" } else { "not " };
            info!(
                "IMAP: Assert that message '{}' does {}have flag '{}' set",
                message.subject, not, flag
            );
            Self::check(&message.path(), message.has_flag(*flag) == expected, || {
                format!("expected flag '{flag}' to {not}be set")
            })?;
        }
        Ok(())
    }

    pub fn results_contain_message(&mut self, name: &str, extension: &str) -> Result<&mut Self> {
        self.result_present(name, extension, true)?;
        Ok(self)
    }

    pub fn results_do_not_contain_message(
        &mut self,
        name: &str,
        extension: &str,
    ) -> Result<&mut Self> {
        self.result_present(name, extension, false)?;
        Ok(self)
    }

    fn result_present(&self, name: &str, extension: &str, expected: bool) -> Result<()> {
        let not = if expected { "" } else { "NOT " };
        info!("IMAP: Assert that message '{}' is {}in the search results", name, not);
        let present = self.navigator.search_results().contains(name, extension);
        Self::check("search results", present == expected, || {
            let extension = extension.trim_start_matches('.');
            format!("expected message '{name}.{extension}' to be {not}present")
        })
    }

    /// The local part of the first sender of `subject` is `name`.
    pub async fn message_sender_name_is(
        &mut self,
        subject: &str,
        name: &str,
    ) -> Result<&mut Self> {
        info!("IMAP: Assert that sender name of message '{}' is '{}'", subject, name);
        let message = self.message_in_folder(subject).await?;
        let actual = message.sender_name().unwrap_or_default();
        Self::check(&message.path(), actual == name, || {
            format!("expected sender name '{name}', found '{actual}'")
        })?;
        Ok(self)
    }

    pub async fn message_sender_is(&mut self, subject: &str, sender: &str) -> Result<&mut Self> {
        info!("IMAP: Assert that message '{}' sender is '{}'", subject, sender);
        let message = self.message_in_folder(subject).await?;
        let actual = message.from.first().map(String::as_str).unwrap_or_default();
        Self::check(&message.path(), actual == sender, || {
            format!("expected sender '{sender}', found '{actual}'")
        })?;
        Ok(self)
    }

    pub async fn message_subject_is(&mut self, subject: &str) -> Result<&mut Self> {
        info!("IMAP: Assert that message with subject '{}' is found", subject);
        let folder = self.last_resource();
        let found = self
            .messages_of(&folder)
            .await?
            .iter()
            .any(|m| m.subject == subject);
        Self::check(&folder, found, || {
            format!("no message with subject '{subject}'")
        })?;
        Ok(self)
    }

    pub async fn is_subscribed(&mut self) -> Result<&mut Self> {
        self.subscription_is(true).await?;
        Ok(self)
    }

    pub async fn is_not_subscribed(&mut self) -> Result<&mut Self> {
        self.subscription_is(false).await?;
        Ok(self)
    }

    async fn subscription_is(&mut self, expected: bool) -> Result<()> {
        let folder = self.last_resource();
        let not = if expected { "" } else { "not " };
        info!("IMAP: Assert that folder '{}' is {}subscribed", folder, not);
        let subscribed = self.navigator.store_mut().is_subscribed(&folder).await?;
        Self::check(&folder, subscribed == expected, || {
            format!("expected folder to be {not}subscribed")
        })
    }
}
