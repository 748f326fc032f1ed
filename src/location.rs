//! The navigator's notion of "where we are"

use serde::Serialize;

use crate::path;

/// Current folder plus the most recently touched resource beneath it.
///
/// `last_resource` is always equal to `current` or a descendant of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    current: String,
    last_resource: String,
}

impl Location {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let mut location = Self::default();
        location.set(path);
        location
    }

    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    #[must_use]
    pub fn last_resource(&self) -> &str {
        &self.last_resource
    }

    /// Move to `path`; both the folder and the last resource point at it.
    pub fn set(&mut self, path: &str) {
        let path = path::remove_trailing_slash(path);
        self.current = path.to_string();
        self.last_resource = path.to_string();
    }

    /// Record a resource touched beneath the current folder.
    ///
    /// A resource outside the current folder moves the folder too, to
    /// the resource's parent.
    pub fn touch(&mut self, resource: &str) {
        let resource = path::remove_trailing_slash(resource);
        if !path::is_within(resource, &self.current) {
            self.current = path::parent_path(resource).to_string();
        }
        self.last_resource = resource.to_string();
    }

    /// Follow a folder rename: pointers inside `from` move under `to`.
    pub fn rebase(&mut self, from: &str, to: &str) {
        if let Some(current) = path::rebase(&self.current, from, to) {
            self.current = current;
        }
        if let Some(last) = path::rebase(&self.last_resource, from, to) {
            self.last_resource = last;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// `[current, last_resource]`, the paths this location refers to.
    #[must_use]
    pub fn paths(&self) -> [&str; 2] {
        [&self.current, &self.last_resource]
    }
}
