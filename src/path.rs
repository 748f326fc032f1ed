//! Mailbox path construction
//!
//! Pure functions that compose the canonical absolute mailbox paths the
//! content server exposes over IMAP. Paths are `/`-separated, never end
//! with a separator, and are rooted at [`PREFIX_SPACE`]. Building the
//! same logical location twice always yields byte-identical strings.

use crate::error::{Error, Result};

/// Root space under which the server publishes its repository.
pub const PREFIX_SPACE: &str = "Alfresco IMAP";

/// Hierarchy delimiter used by the server.
pub const SEPARATOR: char = '/';

const SITES: &str = "Sites";
const USER_HOMES: &str = "User Homes";
const DATA_DICTIONARY: &str = "Data Dictionary";
const DOCUMENT_LIBRARY: &str = "documentLibrary";

/// Join `segments` onto `base` with a single separator.
///
/// Duplicate separators are collapsed and any trailing separator is
/// dropped. `base` may be empty; a segment may not.
///
/// # Examples
///
/// ```
/// use mailnav::path::build_path;
///
/// let p = build_path("Alfresco IMAP/", &["Sites", "/site1"]).unwrap();
/// assert_eq!(p, "Alfresco IMAP/Sites/site1");
/// ```
pub fn build_path(base: &str, segments: &[&str]) -> Result<String> {
    let mut path = String::from(base);
    for segment in segments {
        if segment.trim_matches(SEPARATOR).is_empty() {
            return Err(Error::invalid_argument(
                "segment",
                format!("empty path segment under '{base}'"),
            ));
        }
        if !path.is_empty() {
            path.push(SEPARATOR);
        }
        path.push_str(segment);
    }
    Ok(collapse_separators(&path))
}

/// Strip any trailing separators. Idempotent.
#[must_use]
pub fn remove_trailing_slash(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for c in path.chars() {
        let is_separator = c == SEPARATOR;
        if !(is_separator && previous_was_separator) {
            out.push(c);
        }
        previous_was_separator = is_separator;
    }
    remove_trailing_slash(&out).to_string()
}

fn require<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(name, "must not be empty"));
    }
    Ok(value)
}

/// The IMAP root space.
#[must_use]
pub const fn prefix_space() -> &'static str {
    PREFIX_SPACE
}

/// `Alfresco IMAP/Sites`
#[must_use]
pub fn sites_path() -> String {
    format!("{PREFIX_SPACE}{SEPARATOR}{SITES}")
}

/// `Alfresco IMAP/User Homes`
#[must_use]
pub fn user_homes_path() -> String {
    format!("{PREFIX_SPACE}{SEPARATOR}{USER_HOMES}")
}

/// `Alfresco IMAP/Data Dictionary`
#[must_use]
pub fn data_dictionary_path() -> String {
    format!("{PREFIX_SPACE}{SEPARATOR}{DATA_DICTIONARY}")
}

/// The folder of a site itself, above its containers.
pub fn site_root_path(site_id: &str) -> Result<String> {
    build_path(&sites_path(), &[require("site id", site_id)?])
}

/// The document library container of a site.
pub fn site_document_library_path(site_id: &str) -> Result<String> {
    site_container_path(site_id, DOCUMENT_LIBRARY)
}

/// A named container of a site (`wiki`, `links`, `calendar`, ...).
pub fn site_container_path(site_id: &str, container_name: &str) -> Result<String> {
    build_path(
        &sites_path(),
        &[
            require("site id", site_id)?,
            require("container name", container_name)?,
        ],
    )
}

/// The home folder of `username`.
pub fn user_home_path(username: &str) -> Result<String> {
    build_path(&user_homes_path(), &[require("username", username)?])
}

/// Everything before the last separator, or `""` for a top-level path.
#[must_use]
pub fn parent_path(path: &str) -> &str {
    remove_trailing_slash(path)
        .rsplit_once(SEPARATOR)
        .map_or("", |(parent, _)| parent)
}

/// The last segment of a path.
///
/// e.g. `object_name("Sites/a/documentLibrary/file.txt")` is `file.txt`
#[must_use]
pub fn object_name(path: &str) -> &str {
    let trimmed = remove_trailing_slash(path);
    trimmed
        .rsplit_once(SEPARATOR)
        .map_or(trimmed, |(_, name)| name)
}

/// Repository path of a mailbox path: the prefix space is replaced by
/// a leading separator (`Alfresco IMAP/Sites/a` -> `/Sites/a`).
#[must_use]
pub fn without_prefix(path: &str) -> String {
    let rest = path
        .strip_prefix(PREFIX_SPACE)
        .filter(|rest| rest.is_empty() || rest.starts_with(SEPARATOR))
        .unwrap_or(path);
    let rest = remove_trailing_slash(rest).trim_start_matches(SEPARATOR);
    format!("{SEPARATOR}{rest}")
}

/// Mailbox path of either a mailbox path (returned unchanged apart
/// from normalisation) or a repository path (prefixed).
pub fn with_prefix(path: &str) -> Result<String> {
    if is_within(path, PREFIX_SPACE) {
        return build_path(path, &[]);
    }
    let relative = require("path", path.trim_matches(SEPARATOR))?;
    build_path(PREFIX_SPACE, &[relative])
}

/// Whether `path` is `ancestor` or lies beneath it.
#[must_use]
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(SEPARATOR))
}

/// Re-root `path` from `from` onto `to` if it lies within `from`.
#[must_use]
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    Some(format!("{to}{}", &path[from.len()..]))
}
