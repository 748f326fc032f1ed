//! Message snapshots returned by a mailbox store

use chrono::{DateTime, FixedOffset};
use mailparse::{MailAddr, MailHeaderMap, ParsedMail};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::flag::{Flag, Flags};
use crate::path;

/// A message as listed by a store at one point in time.
///
/// Messages are identified by `(folder, subject)`. The `uid` is only the
/// store's handle for addressing a message that was already located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub uid: u32,
    pub folder: String,
    pub subject: String,
    pub from: Vec<String>,
    pub flags: Flags,
    pub content: String,
    pub internal_date: Option<DateTime<FixedOffset>>,
}

impl Message {
    /// A detached message with the given subject, for seeding stores.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            uid: 0,
            folder: String::new(),
            subject: subject.into(),
            from: Vec::new(),
            flags: Flags::new(),
            content: String::new(),
            internal_date: None,
        }
    }

    #[must_use]
    pub fn sender(mut self, address: impl Into<String>) -> Self {
        self.from.push(address.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: &[Flag]) -> Self {
        self.flags = flags.iter().copied().collect();
        self
    }

    /// Full mailbox path of this message, `<folder>/<subject>`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}{}{}", self.folder, path::SEPARATOR, self.subject)
    }

    #[must_use]
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Local part of the first sender address.
    #[must_use]
    pub fn sender_name(&self) -> Option<&str> {
        self.from
            .first()
            .map(|addr| addr.split_once('@').map_or(addr.as_str(), |(local, _)| local))
    }

    /// Build a snapshot from a raw RFC 822 message.
    ///
    /// Text parts of a multipart body are concatenated in order.
    pub fn parse(folder: &str, uid: u32, raw: &[u8]) -> Result<Self> {
        let parse_error = |e: mailparse::MailParseError| {
            Error::remote("Parse message", &format!("{folder}#{uid}"), e)
        };
        let parsed = mailparse::parse_mail(raw).map_err(parse_error)?;

        let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();

        let mut from = Vec::new();
        for header in parsed.headers.get_all_headers("From") {
            let addresses = mailparse::addrparse_header(header).map_err(parse_error)?;
            for addr in addresses.iter() {
                match addr {
                    MailAddr::Single(info) => from.push(info.addr.clone()),
                    MailAddr::Group(group) => {
                        from.extend(group.addrs.iter().map(|info| info.addr.clone()));
                    }
                }
            }
        }

        let mut content = String::new();
        collect_text(&parsed, &mut content).map_err(parse_error)?;

        Ok(Self {
            uid,
            folder: folder.to_string(),
            subject,
            from,
            flags: Flags::new(),
            content,
            internal_date: None,
        })
    }
}

fn collect_text(
    part: &ParsedMail<'_>,
    out: &mut String,
) -> std::result::Result<(), mailparse::MailParseError> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.starts_with("text/") {
            out.push_str(&part.get_body()?);
        }
        return Ok(());
    }
    for sub in &part.subparts {
        collect_text(sub, out)?;
    }
    Ok(())
}
