//! Composing outgoing mail

use std::path::{Path, PathBuf};

use lettre::Message as Email;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};

use crate::error::{Error, Result};
use crate::smtp::{MailSender, SmtpSession};

/// A file attached to an outgoing mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MailAttachment {
    /// Read `path`, keeping its file name.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::invalid_argument("attachment", format!("'{}' has no file name", path.display()))
            })?
            .to_string();
        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::invalid_argument("attachment", format!("cannot read '{}': {e}", path.display()))
        })?;
        Ok(Self {
            content_type: content_type_for(&file_name).to_string(),
            file_name,
            data,
        })
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// A fully composed mail, ready for a [`MailSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: Option<String>,
    pub attachments: Vec<MailAttachment>,
}

impl OutgoingMail {
    /// Render as a `multipart/mixed` message: the plain body first,
    /// then each attachment.
    pub fn to_lettre(&self) -> Result<Email> {
        let mut builder = Email::builder()
            .from(parse_mailbox("from", &self.from)?)
            .subject(self.subject.clone());
        if self.to.is_empty() {
            return Err(Error::invalid_argument("recipients", "no recipients given"));
        }
        for to in &self.to {
            builder = builder.to(parse_mailbox("recipients", to)?);
        }

        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        if let Some(body) = &self.body {
            parts.push(SinglePart::plain(body.clone()));
        }
        for attachment in &self.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| Error::invalid_argument("attachment", e.to_string()))?;
            parts.push(
                Attachment::new(attachment.file_name.clone())
                    .body(attachment.data.clone(), content_type),
            );
        }
        let mut parts = parts.into_iter();
        let first = parts
            .next()
            .unwrap_or_else(|| SinglePart::plain(String::new()));
        let multipart = parts.fold(MultiPart::mixed().singlepart(first), MultiPart::singlepart);

        builder
            .multipart(multipart)
            .map_err(|e| Error::invalid_argument("message", e.to_string()))
    }
}

fn parse_mailbox(name: &str, value: &str) -> Result<Mailbox> {
    value
        .parse()
        .map_err(|e| Error::invalid_argument(name, format!("'{value}': {e}")))
}

/// Builder for one mail sent through an [`SmtpSession`].
pub struct ComposeMessage<'a, M> {
    session: &'a mut SmtpSession<M>,
    recipients: Vec<String>,
    subject: String,
    body: Option<String>,
    attachments: Vec<PathBuf>,
}

impl<'a, M: MailSender> ComposeMessage<'a, M> {
    pub(crate) const fn new(session: &'a mut SmtpSession<M>) -> Self {
        Self {
            session,
            recipients: Vec::new(),
            subject: String::new(),
            body: None,
            attachments: Vec::new(),
        }
    }

    /// `"a1@test.com, a2@test.com"`
    #[must_use]
    pub fn with_recipients(mut self, comma_separated: &str) -> Self {
        self.recipients = comma_separated
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string)
            .collect();
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Files are read when the mail is sent.
    #[must_use]
    pub fn with_attachments<P: AsRef<Path>>(mut self, files: &[P]) -> Self {
        self.attachments
            .extend(files.iter().map(|f| f.as_ref().to_path_buf()));
        self
    }

    /// Send as the authenticated user.
    pub async fn send_mail(self) -> Result<&'a mut SmtpSession<M>> {
        let from = self
            .session
            .test_user()
            .map(|u| u.username.clone())
            .ok_or_else(|| {
                Error::invalid_state("Send mail", &self.subject, "no authenticated user")
            })?;

        let mut attachments = Vec::with_capacity(self.attachments.len());
        for path in &self.attachments {
            attachments.push(MailAttachment::from_file(path).await?);
        }

        let mail = OutgoingMail {
            from,
            to: self.recipients,
            subject: self.subject,
            body: self.body,
            attachments,
        };
        self.session.deliver(&mail).await?;
        Ok(self.session)
    }
}
