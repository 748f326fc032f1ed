//! Mailbox store over a live IMAP session

use std::collections::BTreeMap;

use async_imap::error::Error as ImapError;
use async_imap::types::{Fetch, Flag as ImapFlag};
use futures::TryStreamExt;
use tracing::debug;

use super::{FolderKind, MailboxStore, OpenMode};
use crate::config::{EmailProperties, User};
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::flag::{Flag, Flags};
use crate::message::Message;
use crate::path;

const FETCH_QUERY: &str = "(UID FLAGS INTERNALDATE BODY.PEEK[])";

/// [`MailboxStore`] backed by the server's IMAP endpoint.
///
/// IMAP selects one folder at a time, so at most one folder is open;
/// opening another closes the previous one without expunging.
pub struct ImapStore {
    props: EmailProperties,
    session: Option<ImapSession>,
    selected: Option<(String, OpenMode)>,
}

impl ImapStore {
    #[must_use]
    pub const fn new(props: EmailProperties) -> Self {
        Self {
            props,
            session: None,
            selected: None,
        }
    }

    fn session(&mut self, action: &str, path: &str) -> Result<&mut ImapSession> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::invalid_state(action, path, "store is not connected"))
    }

    fn open_within(&self, root: &str) -> Option<&str> {
        self.selected
            .as_ref()
            .map(|(p, _)| p.as_str())
            .filter(|p| path::is_within(p, root))
    }

    async fn select(&mut self, action: &str, path: &str, mode: OpenMode) -> Result<()> {
        let session = self.session(action, path)?;
        let result = match mode {
            OpenMode::ReadWrite => session.select(path).await,
            OpenMode::ReadOnly => session.examine(path).await,
        };
        match result {
            Ok(_) => {
                self.selected = Some((path.to_string(), mode));
                Ok(())
            }
            Err(ImapError::No(_)) => {
                self.selected = None;
                Err(Error::not_found(action, path))
            }
            Err(e) => {
                self.selected = None;
                Err(Error::remote(action, path, e))
            }
        }
    }

    /// Bring back a selection that an internal operation replaced.
    async fn reselect(&mut self, previous: Option<(String, OpenMode)>) -> Result<()> {
        if self.selected == previous {
            return Ok(());
        }
        match previous {
            Some((path, mode)) => self.select("Reopen folder", &path, mode).await,
            None => {
                if let Some((path, _)) = self.selected.take() {
                    self.session("Close folder", &path)?
                        .close()
                        .await
                        .map_err(|e| Error::remote("Close folder", &path, e))?;
                }
                Ok(())
            }
        }
    }

    async fn list_pattern(&mut self, action: &str, path: &str, pattern: &str) -> Result<Vec<String>> {
        let pattern = quoted(pattern);
        let session = self.session(action, path)?;
        let names = session
            .list(Some(""), Some(&pattern))
            .await
            .map_err(|e| Error::remote(action, path, e))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::remote(action, path, e))?;
        Ok(names
            .iter()
            .map(|name| path::remove_trailing_slash(name.name()).to_string())
            .collect())
    }

    async fn folder_exists(&mut self, action: &str, path: &str) -> Result<bool> {
        let names = self.list_pattern(action, path, path).await?;
        Ok(names.iter().any(|n| n == path))
    }

    async fn fetch_selected(&mut self, action: &str, path: &str) -> Result<Vec<Message>> {
        let session = self.session(action, path)?;
        let fetches = session
            .uid_fetch("1:*", FETCH_QUERY)
            .await
            .map_err(|e| Error::remote(action, path, e))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::remote(action, path, e))?;

        let mut messages = Vec::with_capacity(fetches.len());
        for fetch in &fetches {
            if let Some(message) = to_message(path, fetch)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    /// Every folder below `root`, deepest first.
    async fn descendants(&mut self, root: &str) -> Result<Vec<String>> {
        let mut pending = vec![root.to_string()];
        let mut found = Vec::new();
        while let Some(folder) = pending.pop() {
            let children = self.list(&folder).await?;
            found.extend(children.iter().cloned());
            pending.extend(children);
        }
        found.sort_by_key(|p| std::cmp::Reverse(p.matches(path::SEPARATOR).count()));
        Ok(found)
    }
}

/// List patterns are sent as-is, so mailbox names with spaces need
/// quoting here.
fn quoted(pattern: &str) -> String {
    format!("\"{}\"", pattern.replace('\\', "\\\\").replace('"', "\\\""))
}

fn to_message(folder: &str, fetch: &Fetch) -> Result<Option<Message>> {
    let (Some(uid), Some(body)) = (fetch.uid, fetch.body()) else {
        return Ok(None);
    };
    let mut message = Message::parse(folder, uid, body)?;
    message.flags = fetch
        .flags()
        .filter_map(|flag| match flag {
            ImapFlag::Seen => Some(Flag::Seen),
            ImapFlag::Answered => Some(Flag::Answered),
            ImapFlag::Flagged => Some(Flag::Flagged),
            ImapFlag::Deleted => Some(Flag::Deleted),
            ImapFlag::Draft => Some(Flag::Draft),
            ImapFlag::Recent => Some(Flag::Recent),
            _ => None,
        })
        .collect();
    message.internal_date = fetch.internal_date();
    Ok(Some(message))
}

impl MailboxStore for ImapStore {
    async fn authenticate(&mut self, user: &User) -> Result<()> {
        if let Some(mut old) = self.session.take() {
            old.logout().await.ok();
        }
        self.selected = None;
        self.session = Some(connection::connect(&self.props, user).await?);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut session = self
            .session
            .take()
            .ok_or_else(|| Error::invalid_state("Disconnect", "", "store is not connected"))?;
        self.selected = None;
        session
            .logout()
            .await
            .map_err(|e| Error::remote("Disconnect", "", e))
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn open(&mut self, path: &str, mode: OpenMode) -> Result<()> {
        debug!("Open {} {:?}", path, mode);
        self.select("Open folder", path, mode).await
    }

    async fn close(&mut self, path: &str, expunge: bool) -> Result<()> {
        const ACTION: &str = "Close folder";
        let Some((_, mode)) = self.selected.clone().filter(|(p, _)| p == path) else {
            return Err(Error::invalid_state(ACTION, path, "folder is not open"));
        };
        debug!("Close {} expunge={}", path, expunge);
        let session = self.session(ACTION, path)?;
        if !expunge && mode == OpenMode::ReadWrite {
            session
                .examine(path)
                .await
                .map_err(|e| Error::remote(ACTION, path, e))?;
        }
        session
            .close()
            .await
            .map_err(|e| Error::remote(ACTION, path, e))?;
        self.selected = None;
        Ok(())
    }

    fn mode(&self, path: &str) -> Option<OpenMode> {
        self.selected
            .as_ref()
            .filter(|(p, _)| p == path)
            .map(|(_, mode)| *mode)
    }

    async fn create(&mut self, path: &str, kind: FolderKind) -> Result<()> {
        const ACTION: &str = "Create folder";
        let name = match kind {
            FolderKind::HoldsFolders => format!("{path}{}", path::SEPARATOR),
            FolderKind::HoldsMessages => path.to_string(),
        };
        debug!("Create {} {:?}", path, kind);
        self.session(ACTION, path)?
            .create(&name)
            .await
            .map_err(|e| match e {
                ImapError::No(reason) => Error::invalid_state(ACTION, path, reason),
                other => Error::remote(ACTION, path, other),
            })
    }

    async fn delete(&mut self, path: &str, recurse: bool) -> Result<()> {
        const ACTION: &str = "Delete folder";
        self.session(ACTION, path)?;
        if let Some(open) = self.open_within(path) {
            return Err(Error::invalid_state(
                ACTION,
                path,
                format!("folder '{open}' is open"),
            ));
        }
        if !self.folder_exists(ACTION, path).await? {
            return Err(Error::not_found(ACTION, path));
        }

        let children = self.descendants(path).await?;
        if !children.is_empty() && !recurse {
            return Err(Error::invalid_state(ACTION, path, "folder has sub-folders"));
        }
        debug!("Delete {} ({} sub-folders)", path, children.len());
        for folder in children.iter().map(String::as_str).chain([path]) {
            self.session(ACTION, folder)?
                .delete(folder)
                .await
                .map_err(|e| Error::remote(ACTION, folder, e))?;
        }
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        const ACTION: &str = "Rename folder";
        self.session(ACTION, from)?;
        if let Some(open) = self.open_within(from) {
            return Err(Error::invalid_state(
                ACTION,
                from,
                format!("folder '{open}' is open"),
            ));
        }
        if !self.folder_exists(ACTION, from).await? {
            return Err(Error::not_found(ACTION, from));
        }
        debug!("Rename {} -> {}", from, to);
        self.session(ACTION, from)?
            .rename(from, to)
            .await
            .map_err(|e| match e {
                ImapError::No(reason) => Error::invalid_state(ACTION, from, reason),
                other => Error::remote(ACTION, from, other),
            })
    }

    async fn list(&mut self, path: &str) -> Result<Vec<String>> {
        const ACTION: &str = "List folder";
        let pattern = if path.is_empty() {
            "%".to_string()
        } else {
            format!("{path}{}%", path::SEPARATOR)
        };
        let mut children = self.list_pattern(ACTION, path, &pattern).await?;
        children.retain(|c| c != path);
        Ok(children)
    }

    async fn exists(&mut self, path: &str) -> Result<bool> {
        const ACTION: &str = "Check existence of";
        if self.folder_exists(ACTION, path).await? {
            return Ok(true);
        }
        let parent = path::parent_path(path);
        if parent.is_empty() || !self.folder_exists(ACTION, parent).await? {
            return Ok(false);
        }

        let previous = self.selected.clone();
        if self.mode(parent).is_none() {
            self.select(ACTION, parent, OpenMode::ReadOnly).await?;
        }
        let subject = path::object_name(path);
        let found = self
            .fetch_selected(ACTION, parent)
            .await
            .map(|messages| messages.iter().any(|m| m.subject == subject));
        self.reselect(previous).await?;
        found
    }

    async fn messages(&mut self, path: &str) -> Result<Vec<Message>> {
        const ACTION: &str = "Get messages of";
        if self.mode(path).is_none() {
            return Err(Error::invalid_state(ACTION, path, "folder is not open"));
        }
        self.fetch_selected(ACTION, path).await
    }

    async fn append(&mut self, path: &str, messages: &[Message]) -> Result<()> {
        const ACTION: &str = "Append messages to";
        let mut by_origin: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for message in messages {
            if message.folder.is_empty() || message.uid == 0 {
                return Err(Error::invalid_argument(
                    "messages",
                    format!("'{}' was not read from this store", message.subject),
                ));
            }
            by_origin
                .entry(message.folder.as_str())
                .or_default()
                .push(message.uid.to_string());
        }
        debug!("Append {} messages to {}", messages.len(), path);

        let previous = self.selected.clone();
        for (origin, uids) in by_origin {
            if self.mode(origin).is_none() {
                self.select(ACTION, origin, OpenMode::ReadOnly).await?;
            }
            self.session(ACTION, path)?
                .uid_copy(uids.join(","), path)
                .await
                .map_err(|e| match e {
                    ImapError::No(_) => Error::not_found(ACTION, path),
                    other => Error::remote(ACTION, path, other),
                })?;
        }
        self.reselect(previous).await
    }

    async fn set_flags(
        &mut self,
        path: &str,
        uid: u32,
        flags: &Flags,
        value: bool,
    ) -> Result<()> {
        const ACTION: &str = "Set flags in";
        if self.mode(path) != Some(OpenMode::ReadWrite) {
            return Err(Error::invalid_state(
                ACTION,
                path,
                "folder is not open read-write",
            ));
        }
        let query = format!(
            "{}FLAGS ({})",
            if value { '+' } else { '-' },
            flags.to_imap_list()
        );
        debug!("UID STORE {} {} in {}", uid, query, path);
        self.session(ACTION, path)?
            .uid_store(uid.to_string(), &query)
            .await
            .map_err(|e| Error::remote(ACTION, path, e))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::remote(ACTION, path, e))?;
        Ok(())
    }

    async fn set_subscribed(&mut self, path: &str, subscribed: bool) -> Result<()> {
        const ACTION: &str = "Set subscription of";
        let session = self.session(ACTION, path)?;
        let result = if subscribed {
            session.subscribe(path).await
        } else {
            session.unsubscribe(path).await
        };
        result.map_err(|e| match e {
            ImapError::No(_) => Error::not_found(ACTION, path),
            other => Error::remote(ACTION, path, other),
        })
    }

    async fn is_subscribed(&mut self, path: &str) -> Result<bool> {
        const ACTION: &str = "Get subscription of";
        let session = self.session(ACTION, path)?;
        // Unlike LIST, async-imap quotes the LSUB pattern itself.
        let names = session
            .lsub(Some(""), Some(path))
            .await
            .map_err(|e| Error::remote(ACTION, path, e))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::remote(ACTION, path, e))?;
        Ok(names
            .iter()
            .any(|n| path::remove_trailing_slash(n.name()) == path))
    }
}
