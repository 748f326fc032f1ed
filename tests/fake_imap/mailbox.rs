//! Test data model for the fake IMAP server
//!
//! Folders are stored flat by their full hierarchical name, the way an
//! IMAP server reports them in LIST:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .credentials("admin", "admin")
//!     .folder("Alfresco IMAP")
//!     .folder("Alfresco IMAP/Sites")
//!     .folder("Alfresco IMAP/Sites/s1/documentLibrary")
//!         .message("report.pdf")
//!         .subscribed()
//!     .build();
//! ```
//!
//! Handlers that modify state (CREATE, STORE, COPY, ...) lock the
//! shared `Mutex<Mailbox>`; read handlers work on a snapshot.

pub const SEPARATOR: char = '/';

/// A complete mailbox: every folder of one user plus the credentials
/// LOGIN accepts.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    /// `None` accepts any credentials.
    pub credentials: Option<(String, String)>,
}

impl Mailbox {
    /// Look up a folder by its full name (case-sensitive).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    pub fn has_children(&self, name: &str) -> bool {
        let prefix = format!("{name}{SEPARATOR}");
        self.folders.iter().any(|f| f.name.starts_with(&prefix))
    }

    /// Add `name` and any missing ancestors. Returns `false` if `name`
    /// already existed.
    pub fn create(&mut self, name: &str) -> bool {
        if self.get_folder(name).is_some() {
            return false;
        }
        let mut prefix = String::new();
        for segment in name.split(SEPARATOR) {
            if !prefix.is_empty() {
                prefix.push(SEPARATOR);
            }
            prefix.push_str(segment);
            if self.get_folder(&prefix).is_none() {
                self.folders.push(Folder::new(&prefix));
            }
        }
        true
    }
}

/// A single IMAP folder, named by its full path.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub subscribed: bool,
    pub emails: Vec<TestEmail>,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribed: false,
            emails: Vec::new(),
        }
    }

    pub fn next_uid(&self) -> u32 {
        self.emails.iter().map(|e| e.uid).max().map_or(1, |max| max + 1)
    }

    pub fn has_flag(&self, uid: u32, flag: &str) -> bool {
        self.emails
            .iter()
            .find(|e| e.uid == uid)
            .is_some_and(|e| e.has_flag(flag))
    }
}

/// A test email stored in a folder.
///
/// - `uid`: unique within the folder, never reused.
/// - `flags`: system flags in wire form (`\Seen`, `\Deleted`, ...).
/// - `raw`: the complete RFC 2822 message returned by `BODY[]`.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    pub flags: Vec<String>,
    pub raw: Vec<u8>,
}

impl TestEmail {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    pub fn add_flag(&mut self, flag: &str) {
        if !self.has_flag(flag) {
            self.flags.push(flag.to_string());
        }
    }

    pub fn remove_flag(&mut self, flag: &str) {
        self.flags.retain(|f| !f.eq_ignore_ascii_case(flag));
    }
}

/// Minimal plain-text message with the given subject, as the content
/// server would render a document.
pub fn document_message(subject: &str) -> Vec<u8> {
    format!(
        "From: admin@alfresco.test\r\n\
         To: admin@alfresco.test\r\n\
         Subject: {subject}\r\n\
         Date: Mon, 01 Jan 2024 10:00:00 +0000\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         Document name: {subject}\r\n"
    )
    .into_bytes()
}

/// Builder for constructing a `Mailbox` step by step.
///
/// `.folder(name)` starts a new folder; `.email()`, `.message()` and
/// `.subscribed()` apply to the most recently added one.
pub struct MailboxBuilder {
    mailbox: Mailbox,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            mailbox: Mailbox::default(),
        }
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.mailbox.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn folder(mut self, name: &str) -> Self {
        self.mailbox.folders.push(Folder::new(name));
        self
    }

    fn current(&mut self) -> &mut Folder {
        self.mailbox
            .folders
            .last_mut()
            .expect("call .folder() first")
    }

    pub fn subscribed(mut self) -> Self {
        self.current().subscribed = true;
        self
    }

    /// Add a raw email with explicit UID and flags.
    pub fn email(mut self, uid: u32, flags: &[&str], raw: &[u8]) -> Self {
        self.current().emails.push(TestEmail {
            uid,
            flags: flags.iter().map(ToString::to_string).collect(),
            raw: raw.to_vec(),
        });
        self
    }

    /// Add a document message with the next free UID and no flags.
    pub fn message(mut self, subject: &str) -> Self {
        let folder = self.current();
        let uid = folder.next_uid();
        folder.emails.push(TestEmail {
            uid,
            flags: Vec::new(),
            raw: document_message(subject),
        });
        self
    }

    pub fn build(self) -> Mailbox {
        self.mailbox
    }
}
