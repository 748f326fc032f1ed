//! Folder listing entries

use std::fmt;

use serde::Serialize;

use crate::path;

/// A folder returned by a listing, not opened.
///
/// # Examples
///
/// ```
/// use mailnav::FolderEntry;
///
/// let entry = FolderEntry::from_path("Alfresco IMAP/Sites/site1");
/// assert_eq!(entry.name, "site1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
}

impl FolderEntry {
    #[must_use]
    pub fn from_path(full_path: &str) -> Self {
        let full_path = path::remove_trailing_slash(full_path);
        Self {
            name: path::object_name(full_path).to_string(),
            path: full_path.to_string(),
        }
    }
}

impl fmt::Display for FolderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
