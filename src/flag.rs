//! IMAP message flags
//!
//! The navigator only ever manipulates the six IMAP system flags, so
//! [`Flag`] is a closed enum. [`Flags`] is the set value applied to a
//! message in a single store call.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// An IMAP system flag.
///
/// # Examples
///
/// ```
/// use mailnav::Flag;
///
/// assert_eq!(Flag::Seen.as_imap_str(), "\\Seen");
/// assert_eq!(Flag::from_imap_str("\\Deleted"), Some(Flag::Deleted));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Flag {
    /// Message has been answered (`\Answered`).
    Answered,
    /// Message is marked for deletion (`\Deleted`).
    Deleted,
    /// Message is a draft (`\Draft`).
    Draft,
    /// Message is flagged for attention (`\Flagged`).
    Flagged,
    /// Message arrived since the last session (`\Recent`).
    Recent,
    /// Message has been read (`\Seen`).
    Seen,
}

impl Flag {
    pub const ALL: [Self; 6] = [
        Self::Answered,
        Self::Deleted,
        Self::Draft,
        Self::Flagged,
        Self::Recent,
        Self::Seen,
    ];

    /// The IMAP wire representation, including the leading backslash.
    #[must_use]
    pub const fn as_imap_str(self) -> &'static str {
        match self {
            Self::Answered => "\\Answered",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Flagged => "\\Flagged",
            Self::Recent => "\\Recent",
            Self::Seen => "\\Seen",
        }
    }

    /// Upper-case name used in log and assertion messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Answered => "ANSWERED",
            Self::Deleted => "DELETED",
            Self::Draft => "DRAFT",
            Self::Flagged => "FLAGGED",
            Self::Recent => "RECENT",
            Self::Seen => "SEEN",
        }
    }

    /// Parse a wire flag. Case-insensitive; keywords yield `None`.
    #[must_use]
    pub fn from_imap_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_imap_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of flags, ordered for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Flags(BTreeSet<Flag>);

impl Flags {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn insert(&mut self, flag: Flag) {
        self.0.insert(flag);
    }

    pub fn remove(&mut self, flag: Flag) {
        self.0.remove(&flag);
    }

    /// Add (`value = true`) or remove every flag of `other`.
    pub fn apply(&mut self, other: &Self, value: bool) {
        for flag in other.iter() {
            if value {
                self.insert(flag);
            } else {
                self.remove(flag);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }

    /// Space separated wire form, e.g. `\Answered \Deleted`.
    #[must_use]
    pub fn to_imap_list(&self) -> String {
        self.iter()
            .map(Flag::as_imap_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Flag> for Flags {
    fn from(flag: Flag) -> Self {
        std::iter::once(flag).collect()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(Flag::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
