//! In-process mailbox tree

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{FolderKind, MailboxStore, OpenMode};
use crate::config::User;
use crate::error::{Error, Result};
use crate::flag::{Flag, Flags};
use crate::message::Message;
use crate::path;
use crate::presence::ContentProbe;

#[derive(Debug)]
struct Folder {
    kind: FolderKind,
    messages: Vec<Message>,
    subscribed: bool,
}

impl Folder {
    const fn new(kind: FolderKind) -> Self {
        Self {
            kind,
            messages: Vec::new(),
            subscribed: false,
        }
    }
}

#[derive(Debug, Default)]
struct Tree {
    folders: BTreeMap<String, Folder>,
    next_uid: u32,
    credentials: Option<User>,
}

impl Tree {
    fn folder(&self, action: &str, path: &str) -> Result<&Folder> {
        self.folders
            .get(path)
            .ok_or_else(|| Error::not_found(action, path))
    }

    fn folder_mut(&mut self, action: &str, path: &str) -> Result<&mut Folder> {
        self.folders
            .get_mut(path)
            .ok_or_else(|| Error::not_found(action, path))
    }

    fn subtree(&self, root: &str) -> Vec<String> {
        self.folders
            .keys()
            .filter(|k| path::is_within(k, root))
            .cloned()
            .collect()
    }

    fn ensure_ancestors(&mut self, folder: &str) {
        let parent = path::parent_path(folder);
        if parent.is_empty() || self.folders.contains_key(parent) {
            return;
        }
        let parent = parent.to_string();
        self.ensure_ancestors(&parent);
        self.folders
            .insert(parent, Folder::new(FolderKind::HoldsFolders));
    }

    fn push_message(&mut self, folder: &str, mut message: Message) {
        self.next_uid += 1;
        message.uid = self.next_uid;
        message.folder = folder.to_string();
        if let Some(f) = self.folders.get_mut(folder) {
            f.messages.push(message);
        }
    }
}

/// A mailbox tree held in memory.
///
/// Clones share the tree but each handle has its own connection and
/// open-folder state, like separate sessions against one server.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tree: Arc<Mutex<Tree>>,
    open: HashMap<String, OpenMode>,
    connected: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStoreBuilder::new().build()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_connected(&self, action: &str, path: &str) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::invalid_state(action, path, "store is not connected"))
        }
    }

    fn open_within(&self, root: &str) -> Option<&str> {
        self.open
            .keys()
            .find(|p| path::is_within(p, root))
            .map(String::as_str)
    }

    /// Every folder path in the tree, sorted.
    #[must_use]
    pub fn folder_paths(&self) -> Vec<String> {
        self.tree().folders.keys().cloned().collect()
    }

    /// Subjects of the messages in `folder`, without opening it.
    #[must_use]
    pub fn subjects(&self, folder: &str) -> Vec<String> {
        self.tree().folders.get(folder).map_or_else(Vec::new, |f| {
            f.messages.iter().map(|m| m.subject.clone()).collect()
        })
    }

    /// Whether `path` names a folder or a message, without a session.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let tree = self.tree();
        if tree.folders.contains_key(path) {
            return true;
        }
        let subject = path::object_name(path);
        tree.folders
            .get(path::parent_path(path))
            .is_some_and(|f| f.messages.iter().any(|m| m.subject == subject))
    }
}

impl MailboxStore for MemoryStore {
    async fn authenticate(&mut self, user: &User) -> Result<()> {
        debug!("Memory store login as {}", user.username);
        if let Some(expected) = &self.tree().credentials
            && expected != user
        {
            return Err(Error::AuthenticationFailed {
                target: "memory store".to_string(),
                reason: format!("invalid credentials for {}", user.username),
            });
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.open.clear();
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn open(&mut self, path: &str, mode: OpenMode) -> Result<()> {
        const ACTION: &str = "Open folder";
        self.require_connected(ACTION, path)?;
        self.tree().folder(ACTION, path)?;
        debug!("Open {} {:?}", path, mode);
        self.open.insert(path.to_string(), mode);
        Ok(())
    }

    async fn close(&mut self, path: &str, expunge: bool) -> Result<()> {
        const ACTION: &str = "Close folder";
        self.require_connected(ACTION, path)?;
        let mode = self
            .open
            .remove(path)
            .ok_or_else(|| Error::invalid_state(ACTION, path, "folder is not open"))?;
        debug!("Close {} expunge={}", path, expunge);
        if expunge && mode == OpenMode::ReadWrite {
            let mut tree = self.tree();
            let folder = tree.folder_mut(ACTION, path)?;
            folder.messages.retain(|m| !m.has_flag(Flag::Deleted));
        }
        Ok(())
    }

    fn mode(&self, path: &str) -> Option<OpenMode> {
        self.open.get(path).copied()
    }

    async fn create(&mut self, path: &str, kind: FolderKind) -> Result<()> {
        const ACTION: &str = "Create folder";
        self.require_connected(ACTION, path)?;
        let mut tree = self.tree();
        if tree.folders.contains_key(path) {
            return Err(Error::invalid_state(ACTION, path, "folder already exists"));
        }
        let parent = path::parent_path(path);
        if !parent.is_empty() {
            let parent_folder = tree.folder(ACTION, parent)?;
            if parent_folder.kind == FolderKind::HoldsMessages {
                return Err(Error::invalid_state(
                    ACTION,
                    path,
                    "parent folder cannot hold folders",
                ));
            }
        }
        debug!("Create {} {:?}", path, kind);
        tree.folders.insert(path.to_string(), Folder::new(kind));
        Ok(())
    }

    async fn delete(&mut self, path: &str, recurse: bool) -> Result<()> {
        const ACTION: &str = "Delete folder";
        self.require_connected(ACTION, path)?;
        if let Some(open) = self.open_within(path) {
            return Err(Error::invalid_state(
                ACTION,
                path,
                format!("folder '{open}' is open"),
            ));
        }
        let mut tree = self.tree();
        tree.folder(ACTION, path)?;
        let subtree = tree.subtree(path);
        if subtree.len() > 1 && !recurse {
            return Err(Error::invalid_state(ACTION, path, "folder has sub-folders"));
        }
        debug!("Delete {} ({} folders)", path, subtree.len());
        for folder in subtree {
            tree.folders.remove(&folder);
        }
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        const ACTION: &str = "Rename folder";
        self.require_connected(ACTION, from)?;
        if let Some(open) = self.open_within(from) {
            return Err(Error::invalid_state(
                ACTION,
                from,
                format!("folder '{open}' is open"),
            ));
        }
        let mut tree = self.tree();
        tree.folder(ACTION, from)?;
        if tree.folders.contains_key(to) {
            return Err(Error::invalid_state(
                ACTION,
                from,
                format!("'{to}' already exists"),
            ));
        }
        let target_parent = path::parent_path(to);
        if !target_parent.is_empty() {
            tree.folder(ACTION, target_parent)?;
        }
        debug!("Rename {} -> {}", from, to);
        for old in tree.subtree(from) {
            let Some(new) = path::rebase(&old, from, to) else {
                continue;
            };
            if let Some(mut folder) = tree.folders.remove(&old) {
                for message in &mut folder.messages {
                    message.folder.clone_from(&new);
                }
                tree.folders.insert(new, folder);
            }
        }
        Ok(())
    }

    async fn list(&mut self, path: &str) -> Result<Vec<String>> {
        const ACTION: &str = "List folder";
        self.require_connected(ACTION, path)?;
        let tree = self.tree();
        if !path.is_empty() {
            tree.folder(ACTION, path)?;
        }
        Ok(tree
            .folders
            .keys()
            .filter(|k| path::parent_path(k) == path)
            .cloned()
            .collect())
    }

    async fn exists(&mut self, path: &str) -> Result<bool> {
        self.require_connected("Check existence of", path)?;
        Ok(self.contains(path))
    }

    async fn messages(&mut self, path: &str) -> Result<Vec<Message>> {
        const ACTION: &str = "Get messages of";
        self.require_connected(ACTION, path)?;
        let tree = self.tree();
        let folder = tree.folder(ACTION, path)?;
        if self.mode(path).is_none() {
            return Err(Error::invalid_state(ACTION, path, "folder is not open"));
        }
        Ok(folder.messages.clone())
    }

    async fn append(&mut self, path: &str, messages: &[Message]) -> Result<()> {
        const ACTION: &str = "Append messages to";
        self.require_connected(ACTION, path)?;
        let mut tree = self.tree();
        tree.folder(ACTION, path)?;
        debug!("Append {} messages to {}", messages.len(), path);
        for message in messages {
            let mut copy = message.clone();
            copy.flags.insert(Flag::Recent);
            tree.push_message(path, copy);
        }
        Ok(())
    }

    async fn set_flags(
        &mut self,
        path: &str,
        uid: u32,
        flags: &Flags,
        value: bool,
    ) -> Result<()> {
        const ACTION: &str = "Set flags in";
        self.require_connected(ACTION, path)?;
        if self.mode(path) != Some(OpenMode::ReadWrite) {
            return Err(Error::invalid_state(
                ACTION,
                path,
                "folder is not open read-write",
            ));
        }
        let mut tree = self.tree();
        let folder = tree.folder_mut(ACTION, path)?;
        let message = folder
            .messages
            .iter_mut()
            .find(|m| m.uid == uid)
            .ok_or_else(|| Error::not_found(ACTION, &format!("{path} (uid {uid})")))?;
        message.flags.apply(flags, value);
        Ok(())
    }

    async fn set_subscribed(&mut self, path: &str, subscribed: bool) -> Result<()> {
        const ACTION: &str = "Set subscription of";
        self.require_connected(ACTION, path)?;
        self.tree().folder_mut(ACTION, path)?.subscribed = subscribed;
        Ok(())
    }

    async fn is_subscribed(&mut self, path: &str) -> Result<bool> {
        const ACTION: &str = "Get subscription of";
        self.require_connected(ACTION, path)?;
        Ok(self.tree().folder(ACTION, path)?.subscribed)
    }
}

impl ContentProbe for MemoryStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.contains(path))
    }
}

/// Seeds a [`MemoryStore`].
///
/// Folders are created along with any missing ancestors.
///
/// ```
/// use mailnav::{Message, MemoryStore};
///
/// let store = MemoryStore::builder()
///     .folder("Alfresco IMAP/Sites/s1/documentLibrary")
///     .message("Alfresco IMAP/Sites/s1/documentLibrary", Message::new("a.txt"))
///     .build();
/// assert!(store.contains("Alfresco IMAP/Sites/s1/documentLibrary/a.txt"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    tree: Tree,
}

impl MemoryStoreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept `user` when authenticating.
    #[must_use]
    pub fn credentials(mut self, user: User) -> Self {
        self.tree.credentials = Some(user);
        self
    }

    #[must_use]
    pub fn folder(mut self, path: &str) -> Self {
        let path = path::remove_trailing_slash(path);
        self.tree.ensure_ancestors(path);
        self.tree
            .folders
            .entry(path.to_string())
            .or_insert_with(|| Folder::new(FolderKind::HoldsFolders));
        self
    }

    #[must_use]
    pub fn subscribed(mut self, path: &str) -> Self {
        self = self.folder(path);
        if let Some(folder) = self.tree.folders.get_mut(path::remove_trailing_slash(path)) {
            folder.subscribed = true;
        }
        self
    }

    #[must_use]
    pub fn message(mut self, folder: &str, message: Message) -> Self {
        self = self.folder(folder);
        self.tree
            .push_message(path::remove_trailing_slash(folder), message);
        self
    }

    #[must_use]
    pub fn build(self) -> MemoryStore {
        MemoryStore {
            tree: Arc::new(Mutex::new(self.tree)),
            open: HashMap::new(),
            connected: false,
        }
    }
}
