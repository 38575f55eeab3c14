//! Module dedicated to email attachments.
//!
//! Attachments are classified as inline or regular based on their
//! `Content-Disposition` header.

use std::fmt;

use mail_parser::{MessagePart, MimeHeaders};
use serde::Serialize;

/// The default content type of an attachment without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// The attachment disposition.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// The attachment is referenced from the body, usually by its
    /// content ID.
    Inline,

    /// The attachment is a regular downloadable file.
    #[default]
    Attachment,
}

impl Disposition {
    /// Classifies a `Content-Disposition` header value.
    ///
    /// Only the disposition type is considered: `inline` gives
    /// [`Disposition::Inline`], anything else (including no header
    /// at all) gives [`Disposition::Attachment`].
    pub fn from_header(value: Option<&str>) -> Self {
        let kind = value
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .unwrap_or_default();

        if kind.eq_ignore_ascii_case("inline") {
            Self::Inline
        } else {
            Self::Attachment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The email attachment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attachment {
    /// The optional attachment filename.
    pub filename: Option<String>,

    /// The attachment MIME type.
    pub content_type: String,

    /// The attachment disposition.
    pub disposition: Disposition,

    /// The content ID, without angle brackets.
    pub content_id: Option<String>,

    /// The raw content of the attachment.
    pub body: Vec<u8>,
}

impl Attachment {
    /// Creates a regular attachment.
    pub fn new(filename: impl ToString, content_type: impl ToString, body: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.to_string()),
            content_type: content_type.to_string(),
            disposition: Disposition::Attachment,
            content_id: None,
            body,
        }
    }

    /// Creates an inline attachment referenced by the given content
    /// ID.
    pub fn new_inline(
        content_id: impl ToString,
        content_type: impl ToString,
        body: Vec<u8>,
    ) -> Self {
        Self {
            filename: None,
            content_type: content_type.to_string(),
            disposition: Disposition::Inline,
            content_id: Some(strip_angle_brackets(&content_id.to_string())),
            body,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.disposition == Disposition::Inline
    }

    /// Builds an attachment from a parsed MIME part.
    ///
    /// The filename is taken from the disposition `filename`
    /// parameter, then from the content type `name` parameter.
    pub(crate) fn from_part(part: &MessagePart) -> Self {
        let disposition =
            Disposition::from_header(part.content_disposition().map(|cd| cd.ctype()));

        let content_type = part
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(subtype) => format!("{}/{subtype}", ct.ctype()),
                None => ct.ctype().to_owned(),
            })
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());

        Self {
            filename: part.attachment_name().map(ToOwned::to_owned),
            content_type,
            disposition,
            content_id: part.content_id().map(strip_angle_brackets),
            body: part.contents().to_vec(),
        }
    }
}

fn strip_angle_brackets(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_owned()
}
