//! Mailbox-tree navigator
//!
//! A [`Navigator`] owns one store session and a [`Location`]. Navigation
//! calls (`using_*`) only move the location; structural calls resolve
//! the location to mailbox paths, drive the store, and leave the
//! location pointing at what they touched so calls can be chained:
//!
//! ```no_run
//! # async fn demo() -> mailnav::Result<()> {
//! use mailnav::{MemoryStore, Navigator, Protocol, Unchecked, User};
//!
//! let mut nav = Navigator::new(MemoryStore::default(), Unchecked);
//! nav.authenticate(&User::new("admin", "admin")).await?;
//! nav.using_site("site1")?
//!     .create_folder("Reports")
//!     .await?
//!     .rename("Archive")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Operations run strictly in call order. A navigator must not be
//! shared between concurrent callers; use one per session.

use regex::Regex;
use tracing::{debug, info, warn};

use crate::assertion::ImapAssertion;
use crate::config::User;
use crate::error::{Error, Result};
use crate::flag::{Flag, Flags};
use crate::flag_editor::FlagEditor;
use crate::folder::FolderEntry;
use crate::location::Location;
use crate::locator;
use crate::message::Message;
use crate::path;
use crate::presence::{ContentPresence, Unchecked};
use crate::protocol::Protocol;
use crate::search::SearchResults;
use crate::store::{FolderKind, MailboxStore, OpenMode};

pub struct Navigator<S, P = Unchecked> {
    store: S,
    presence: P,
    location: Location,
    user: Option<User>,
    search_results: SearchResults,
}

impl<S: MailboxStore, P: ContentPresence> Navigator<S, P> {
    #[must_use]
    pub fn new(store: S, presence: P) -> Self {
        Self {
            store,
            presence,
            location: Location::default(),
            user: None,
            search_results: SearchResults::default(),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The user passed to the last successful `authenticate`.
    pub const fn test_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Results of the most recent subject search.
    pub const fn search_results(&self) -> &SearchResults {
        &self.search_results
    }

    /// Checks against the current state of this session.
    pub const fn assert_that(&mut self) -> ImapAssertion<'_, S, P> {
        ImapAssertion::new(self)
    }

    // -- navigation --

    /// Move to an absolute mailbox path without touching the store.
    pub fn set_location(&mut self, path: &str) -> &mut Self {
        self.location.set(path);
        self
    }

    fn navigate(&mut self, path: &str) -> &mut Self {
        info!("IMAP: Navigate to '{}'", path);
        self.set_location(path)
    }

    pub fn using_prefix_space(&mut self) -> &mut Self {
        self.navigate(path::PREFIX_SPACE)
    }

    pub fn using_sites(&mut self) -> &mut Self {
        self.navigate(&path::sites_path())
    }

    /// The document library of `site_id`.
    pub fn using_site(&mut self, site_id: &str) -> Result<&mut Self> {
        let path = path::site_document_library_path(site_id)?;
        Ok(self.navigate(&path))
    }

    pub fn using_site_root(&mut self, site_id: &str) -> Result<&mut Self> {
        let path = path::site_root_path(site_id)?;
        Ok(self.navigate(&path))
    }

    pub fn using_site_container(&mut self, site_id: &str, container: &str) -> Result<&mut Self> {
        let path = path::site_container_path(site_id, container)?;
        Ok(self.navigate(&path))
    }

    pub fn using_site_wiki(&mut self, site_id: &str) -> Result<&mut Self> {
        self.using_site_container(site_id, "wiki")
    }

    pub fn using_site_links(&mut self, site_id: &str) -> Result<&mut Self> {
        self.using_site_container(site_id, "links")
    }

    pub fn using_site_calendar(&mut self, site_id: &str) -> Result<&mut Self> {
        self.using_site_container(site_id, "calendar")
    }

    pub fn using_user_home(&mut self, username: &str) -> Result<&mut Self> {
        let path = path::user_home_path(username)?;
        Ok(self.navigate(&path))
    }

    /// Home folder of the authenticated user.
    pub fn using_authenticated_user_home(&mut self) -> Result<&mut Self> {
        let username = self
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .ok_or_else(|| {
                Error::invalid_state(
                    "Navigate to user home",
                    &path::user_homes_path(),
                    "no user has authenticated",
                )
            })?;
        self.using_user_home(&username)
    }

    pub fn using_user_home_root(&mut self) -> &mut Self {
        self.navigate(&path::user_homes_path())
    }

    pub fn using_data_dictionary(&mut self) -> &mut Self {
        self.navigate(&path::data_dictionary_path())
    }

    /// A child of the current folder.
    pub fn using_path(&mut self, name: &str) -> Result<&mut Self> {
        let path = path::build_path(self.location.current(), &[name])?;
        Ok(self.navigate(&path))
    }

    /// An absolute location, either a mailbox path or a repository path
    /// such as `/Sites/site1/documentLibrary/a.txt`.
    pub fn using_resource(&mut self, resource: &str) -> Result<&mut Self> {
        let path = path::with_prefix(resource)?;
        Ok(self.navigate(&path))
    }

    // -- folders --

    /// Create `name` under the current folder.
    pub async fn create_folder(&mut self, name: &str) -> Result<&mut Self> {
        info!("IMAP: Create folder '{}'", name);
        let folder = path::build_path(self.location.current(), &[name])?;
        self.store.create(&folder, FolderKind::HoldsFolders).await?;
        self.location.touch(&folder);
        Ok(self)
    }

    /// Rename the last touched folder within its parent.
    pub async fn rename(&mut self, new_name: &str) -> Result<&mut Self> {
        let folder = self.location.last_resource().to_string();
        let renamed = path::build_path(path::parent_path(&folder), &[new_name])?;
        info!("IMAP: Rename folder '{}' to '{}'", folder, renamed);
        self.close_if_open(&folder, false).await?;
        self.store.rename(&folder, &renamed).await?;
        self.location.rebase(&folder, &renamed);
        self.location.touch(&renamed);
        Ok(self)
    }

    /// Delete the last touched folder and wait until it is gone.
    ///
    /// An open folder is closed (expunging) first. A folder that is
    /// already gone counts as deleted; any other store failure is
    /// retried once and then only logged, leaving the existence check
    /// to report whether the folder really went away.
    pub async fn delete(&mut self) -> Result<&mut Self> {
        let folder = self.location.last_resource().to_string();
        info!("IMAP: Delete folder '{}'", folder);
        if self.store.mode(&folder).is_some() {
            info!("IMAP: Folder '{}' is open, closing it before delete", folder);
            self.store.close(&folder, true).await?;
        }

        match self.store.delete(&folder, true).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => info!("IMAP: Folder '{}' was already deleted", folder),
            Err(first) => {
                debug!("Retrying delete after: {}", first);
                match self.store.delete(&folder, true).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        info!("IMAP: Folder '{}' was already deleted", folder);
                    }
                    Err(e) => warn!("IMAP: Folder '{}' has not been deleted: {}", folder, e),
                }
            }
        }

        self.presence.wait_until_absent(&folder).await?;
        if path::is_within(self.location.current(), &folder) {
            let parent = path::parent_path(&folder).to_string();
            self.location.set(&parent);
        }
        Ok(self)
    }

    /// Open the last touched folder read-write and delete it while open.
    ///
    /// Stores refuse this; the failure is returned unchanged.
    pub async fn attempt_delete_open_folder(&mut self) -> Result<&mut Self> {
        let folder = self.location.last_resource().to_string();
        info!("IMAP: Attempt to delete folder '{}' that is open", folder);
        self.store.open(&folder, OpenMode::ReadWrite).await?;
        self.store.delete(&folder, true).await?;
        Ok(self)
    }

    /// Copy the last touched folder, with its messages and sub-folders,
    /// under `destination`.
    ///
    /// Not atomic: a failure part way leaves a partial copy behind.
    /// Afterwards the location is `destination`.
    pub async fn copy_to(&mut self, destination: &str) -> Result<&mut Self> {
        let source = self.location.last_resource().to_string();
        let destination = path::with_prefix(destination)?;
        info!("IMAP: Copy folder '{}' to '{}'", source, destination);
        self.copy_tree(&source, &destination).await?;
        self.location.set(&destination);
        Ok(self)
    }

    async fn copy_tree(&mut self, source: &str, destination: &str) -> Result<()> {
        let children = self.store.list(source).await?;
        let copy = path::build_path(destination, &[path::object_name(source)])?;
        debug!("Copy tree {} -> {}", source, copy);
        self.store.create(&copy, FolderKind::HoldsFolders).await?;

        let was_open = self.store.mode(source).is_some();
        let messages = self.folder_messages(source, OpenMode::ReadOnly).await?;
        if !messages.is_empty() {
            self.store.append(&copy, &messages).await?;
        }
        if !was_open {
            self.store.close(source, false).await?;
        }

        for child in children {
            Box::pin(self.copy_tree(&child, &copy)).await?;
        }
        Ok(())
    }

    /// Copy the last touched folder under `destination`, then delete it.
    ///
    /// If the delete fails after a successful copy, both trees remain.
    pub async fn move_to(&mut self, destination: &str) -> Result<&mut Self> {
        let source = self.location.last_resource().to_string();
        let destination = path::with_prefix(destination)?;
        info!("IMAP: Move folder '{}' to '{}'", source, destination);
        self.copy_to(&destination).await?;
        self.location.touch(&source);
        self.delete().await?;
        self.location.set(&destination);
        Ok(self)
    }

    /// Immediate sub-folders of the current folder (the root when empty).
    pub async fn get_folders(&mut self) -> Result<Vec<FolderEntry>> {
        let folder = self.location.current().to_string();
        debug!("List folders of '{}'", folder);
        let children = self.store.list(&folder).await?;
        Ok(children.iter().map(|p| FolderEntry::from_path(p)).collect())
    }

    pub async fn subscribe(&mut self) -> Result<&mut Self> {
        self.set_subscribed(true).await
    }

    pub async fn unsubscribe(&mut self) -> Result<&mut Self> {
        self.set_subscribed(false).await
    }

    async fn set_subscribed(&mut self, subscribed: bool) -> Result<&mut Self> {
        let folder = self.location.current().to_string();
        let verb = if subscribed { "Subscribe" } else { "Unsubscribe" };
        info!("IMAP: {} folder '{}'", verb, folder);
        self.store.set_subscribed(&folder, subscribed).await?;
        Ok(self)
    }

    // -- messages --

    /// Delete every message of the current folder whose subject is one
    /// of `subjects`, then wait until each is gone.
    pub async fn delete_messages(&mut self, subjects: &[&str]) -> Result<&mut Self> {
        let folder = self.location.current().to_string();
        for subject in subjects {
            info!("IMAP: Delete message with subject '{}'", subject);
        }
        let marked = self.expunge_subjects(&folder, subjects).await?;
        debug!("Expunged {} message(s) from '{}'", marked, folder);
        for subject in subjects {
            let message = path::build_path(&folder, &[subject])?;
            self.presence.wait_until_absent(&message).await?;
        }
        Ok(self)
    }

    pub async fn delete_message_by_subject(&mut self, subject: &str) -> Result<&mut Self> {
        self.delete_messages(&[subject]).await
    }

    /// Delete the last touched message.
    ///
    /// A missing message is logged, not reported. Afterwards the
    /// location is the message's folder.
    pub async fn delete_message(&mut self) -> Result<&mut Self> {
        let resource = self.location.last_resource().to_string();
        let (folder, subject) = split_message_path(&resource, "Delete message")?;
        info!("IMAP: Delete message with subject '{}'", subject);
        if self.expunge_subjects(folder, &[subject]).await? == 0 {
            warn!("IMAP: No message with subject '{}' in '{}'", subject, folder);
        }
        self.presence.wait_until_absent(&resource).await?;
        self.location.set(folder);
        Ok(self)
    }

    /// Flag matching messages deleted, expunge, and reopen read-write.
    async fn expunge_subjects(&mut self, folder: &str, subjects: &[&str]) -> Result<usize> {
        let messages = self.folder_messages(folder, OpenMode::ReadWrite).await?;
        let matching = locator::find_all_by_subject(&messages, subjects);
        let deleted = Flags::from(Flag::Deleted);
        for message in &matching {
            self.store
                .set_flags(folder, message.uid, &deleted, true)
                .await?;
            info!("IMAP: Marked DELETED message '{}'", message.subject);
        }
        self.store.close(folder, true).await?;
        self.store.open(folder, OpenMode::ReadWrite).await?;
        Ok(matching.len())
    }

    /// Copy the last touched message into `destination`.
    pub async fn copy_message_to(&mut self, destination: &str) -> Result<&mut Self> {
        let resource = self.location.last_resource().to_string();
        let destination = path::with_prefix(destination)?;
        let (folder, subject) = split_message_path(&resource, "Copy message")?;
        info!("IMAP: Copy message '{}' to '{}'", subject, destination);
        let messages = self.folder_messages(folder, OpenMode::ReadOnly).await?;
        let message = locator::find_by_subject(&messages, subject)
            .ok_or_else(|| Error::not_found("Copy message", &resource))?;
        self.store
            .append(&destination, std::slice::from_ref(message))
            .await?;
        self.location.set(&destination);
        Ok(self)
    }

    /// Copy every message of the last touched folder into `destination`.
    pub async fn copy_messages_to(&mut self, destination: &str) -> Result<&mut Self> {
        let folder = self.location.last_resource().to_string();
        let destination = path::with_prefix(destination)?;
        info!("IMAP: Copy messages of '{}' to '{}'", folder, destination);
        let messages = self.folder_messages(&folder, OpenMode::ReadOnly).await?;
        if !messages.is_empty() {
            self.store.append(&destination, &messages).await?;
        }
        self.location.set(&destination);
        Ok(self)
    }

    /// Copy the last touched message into `destination`, then delete
    /// the original.
    pub async fn move_message_to(&mut self, destination: &str) -> Result<&mut Self> {
        let resource = self.location.last_resource().to_string();
        let destination = path::with_prefix(destination)?;
        let (folder, subject) = split_message_path(&resource, "Move message")?;
        info!("IMAP: Move message '{}' to '{}'", subject, destination);
        self.copy_message_to(&destination).await?;
        self.location.set(folder);
        self.delete_messages(&[subject]).await?;
        self.location.set(&destination);
        Ok(self)
    }

    /// Search the current folder for subjects containing `term`.
    pub async fn search_subject_for(&mut self, term: &str) -> Result<&mut Self> {
        self.search(term, |subject| subject.contains(term)).await
    }

    /// Search the current folder for subjects matching the regular
    /// expression `pattern` in full.
    pub async fn search_subject_with_wildcards_for(&mut self, pattern: &str) -> Result<&mut Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| Error::invalid_argument("pattern", e.to_string()))?;
        self.search(pattern, |subject| regex.is_match(subject)).await
    }

    async fn search<F>(&mut self, term: &str, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&str) -> bool,
    {
        let folder = self.location.current().to_string();
        info!("IMAP: Search for term '{}' in folder '{}'", term, folder);
        self.ensure_open(&folder, OpenMode::ReadWrite).await?;
        let found = self.store.search(&folder, predicate).await?;
        self.search_results = SearchResults::new(found);
        Ok(self)
    }

    /// Flag editing for the last touched message.
    pub async fn with_message(&mut self) -> Result<FlagEditor<'_, S, P>> {
        let resource = self.location.last_resource().to_string();
        let (folder, subject) = split_message_path(&resource, "Edit flags of")?;
        let messages = self.folder_messages(folder, OpenMode::ReadWrite).await?;
        let message = locator::find_by_subject(&messages, subject)
            .ok_or_else(|| Error::not_found("Edit flags of", &resource))?;
        let (folder, uid, subject) = (folder.to_string(), message.uid, message.subject.clone());
        Ok(FlagEditor::new(self, folder, uid, subject))
    }

    // -- helpers --

    /// Open `folder` in at least `mode`. A read-only folder is reopened
    /// read-write when writing is needed.
    pub(crate) async fn ensure_open(&mut self, folder: &str, mode: OpenMode) -> Result<()> {
        match (self.store.mode(folder), mode) {
            (Some(OpenMode::ReadWrite), _) | (Some(OpenMode::ReadOnly), OpenMode::ReadOnly) => {
                Ok(())
            }
            (Some(OpenMode::ReadOnly), OpenMode::ReadWrite) => {
                self.store.close(folder, false).await?;
                self.store.open(folder, mode).await
            }
            (None, _) => self.store.open(folder, mode).await,
        }
    }

    pub(crate) async fn folder_messages(
        &mut self,
        folder: &str,
        mode: OpenMode,
    ) -> Result<Vec<Message>> {
        self.ensure_open(folder, mode).await?;
        self.store.messages(folder).await
    }

    async fn close_if_open(&mut self, folder: &str, expunge: bool) -> Result<()> {
        if self.store.mode(folder).is_some() {
            self.store.close(folder, expunge).await?;
        }
        Ok(())
    }
}

/// Split `<folder>/<subject>` into its parts.
fn split_message_path<'a>(resource: &'a str, action: &str) -> Result<(&'a str, &'a str)> {
    let folder = path::parent_path(resource);
    let subject = path::object_name(resource);
    if folder.is_empty() || subject.is_empty() {
        return Err(Error::invalid_state(
            action,
            resource,
            "location does not point at a message",
        ));
    }
    Ok((folder, subject))
}

impl<S: MailboxStore, P: ContentPresence> Protocol for Navigator<S, P> {
    fn name(&self) -> &'static str {
        "IMAP"
    }

    async fn authenticate(&mut self, user: &User) -> Result<&mut Self> {
        info!("IMAP: Connect as '{}'", user.username);
        self.store.authenticate(user).await?;
        self.user = Some(user.clone());
        Ok(self)
    }

    async fn disconnect(&mut self) -> Result<&mut Self> {
        info!("IMAP: Disconnect");
        if !self.store.is_connected() {
            return Err(Error::invalid_state(
                "Disconnect",
                self.location.current(),
                "not connected",
            ));
        }
        self.store.disconnect().await?;
        Ok(self)
    }

    fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    fn location(&self) -> &Location {
        &self.location
    }
}
