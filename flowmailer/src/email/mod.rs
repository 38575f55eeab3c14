//! Module dedicated to outbound emails.
//!
//! The core concept of this module is the [`Email`] structure: a
//! flattened view of a message made of addresses, bodies, headers
//! and attachments. An email can be built by hand using
//! [`Email::builder`] or parsed from a raw message using
//! [`Email::from_raw`].

pub mod address;
pub mod attachment;
pub mod envelope;

use mail_parser::{Header, HeaderName, MessageParser};
use thiserror::Error;
use tracing::debug;

#[doc(inline)]
pub use self::{
    address::Address,
    attachment::{Attachment, Disposition},
    envelope::Envelope,
};

/// Headers describing the MIME structure of a raw message, dropped
/// when parsing.
const MIME_STRUCTURE_HEADERS: [&str; 4] = [
    "mime-version",
    "content-transfer-encoding",
    "content-disposition",
    "content-id",
];

/// Errors related to emails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse email: raw email is empty")]
    ParseEmailEmptyRawError,
    #[error("cannot parse email")]
    ParseEmailError,
    #[error("cannot send email without a sender")]
    MissingSenderError,
    #[error("cannot send email without a recipient")]
    MissingRecipientError,
}

/// The outbound email.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Email {
    /// The `From` addresses.
    pub from: Vec<Address>,

    /// The `Sender` address, used as envelope sender when defined.
    pub sender: Option<Address>,

    /// The `To` addresses.
    pub to: Vec<Address>,

    /// The `Cc` addresses.
    pub cc: Vec<Address>,

    /// The `Bcc` addresses.
    pub bcc: Vec<Address>,

    /// The subject.
    pub subject: Option<String>,

    /// The plain text body.
    pub text: Option<String>,

    /// The HTML body.
    pub html: Option<String>,

    /// The headers, in order of appearance.
    pub headers: Vec<(String, String)>,

    /// The attachments, inline ones included.
    pub attachments: Vec<Attachment>,
}

impl Email {
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }

    /// Parses a raw message.
    pub fn from_raw(raw: &[u8]) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::ParseEmailEmptyRawError);
        }

        let msg = parser().parse(raw).ok_or(Error::ParseEmailError)?;

        let headers = msg
            .headers()
            .iter()
            .filter(|header| {
                let name = header.name.as_str();
                !MIME_STRUCTURE_HEADERS
                    .iter()
                    .any(|skip| skip.eq_ignore_ascii_case(name))
            })
            .filter_map(|header| {
                let value = match header.value.as_text_list() {
                    Some(values) => values.join(", "),
                    None => raw_header_value(msg.raw_message(), header)?,
                };
                Some((header.name.as_str().to_owned(), value))
            })
            .collect();

        let text = msg
            .text_bodies()
            .find(|part| part.is_text() && !part.is_text_html())
            .and_then(|part| part.text_contents())
            .map(ToOwned::to_owned);

        let html = msg
            .html_bodies()
            .find(|part| part.is_text_html())
            .and_then(|part| part.text_contents())
            .map(ToOwned::to_owned);

        let attachments: Vec<Attachment> =
            msg.attachments().map(Attachment::from_part).collect();

        debug!(
            "parsed email with {} header(s) and {} attachment(s)",
            msg.headers().len(),
            attachments.len()
        );

        Ok(Self {
            from: Address::from_parsed_list(msg.from()),
            sender: Address::from_parsed_list(msg.sender()).into_iter().next(),
            to: Address::from_parsed_list(msg.to()),
            cc: Address::from_parsed_list(msg.cc()),
            bcc: Address::from_parsed_list(msg.bcc()),
            subject: msg.subject().map(ToOwned::to_owned),
            text,
            html,
            headers,
            attachments,
        })
    }

    /// Finds all the values of the header matching the given name,
    /// case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, val)| val.as_str())
    }
}

/// Builds the raw message parser.
///
/// Structured headers keep their dedicated parser. Every other header,
/// custom ones included, is parsed as unstructured text so that RFC
/// 2047 encoded words get decoded.
fn parser() -> MessageParser {
    MessageParser::new()
        .with_mime_headers()
        .with_date_headers()
        .with_address_headers()
        .with_message_ids()
        .header_text(HeaderName::Subject)
        .header_text(HeaderName::Comments)
        .header_comma_separated(HeaderName::Keywords)
        .header_comma_separated(HeaderName::ContentLanguage)
        .header_received(HeaderName::Received)
        .header_id(HeaderName::ReturnPath)
        .header_raw(HeaderName::MimeVersion)
        .header_address(HeaderName::ListArchive)
        .header_address(HeaderName::ListHelp)
        .header_address(HeaderName::ListId)
        .header_address(HeaderName::ListOwner)
        .header_address(HeaderName::ListPost)
        .header_address(HeaderName::ListSubscribe)
        .header_address(HeaderName::ListUnsubscribe)
        .default_header_text()
}

/// Extracts the unfolded raw value of a structured header.
fn raw_header_value(raw: &[u8], header: &Header) -> Option<String> {
    let start = header.offset_start as usize;
    let end = header.offset_end as usize;
    let value = String::from_utf8_lossy(raw.get(start..end)?);

    let value = value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Some(value)
}

/// Builder for constructing [`Email`] instances.
#[derive(Debug, Default)]
pub struct EmailBuilder {
    email: Email,
}

impl EmailBuilder {
    pub fn from(mut self, addr: impl Into<Address>) -> Self {
        self.email.from.push(addr.into());
        self
    }

    pub fn sender(mut self, addr: impl Into<Address>) -> Self {
        self.email.sender = Some(addr.into());
        self
    }

    pub fn to(mut self, addr: impl Into<Address>) -> Self {
        self.email.to.push(addr.into());
        self
    }

    pub fn cc(mut self, addr: impl Into<Address>) -> Self {
        self.email.cc.push(addr.into());
        self
    }

    pub fn bcc(mut self, addr: impl Into<Address>) -> Self {
        self.email.bcc.push(addr.into());
        self
    }

    pub fn subject(mut self, subject: impl ToString) -> Self {
        self.email.subject = Some(subject.to_string());
        self
    }

    pub fn text(mut self, text: impl ToString) -> Self {
        self.email.text = Some(text.to_string());
        self
    }

    pub fn html(mut self, html: impl ToString) -> Self {
        self.email.html = Some(html.to_string());
        self
    }

    /// Appends a header. Headers with the same name are kept.
    pub fn header(mut self, name: impl ToString, value: impl ToString) -> Self {
        self.email
            .headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.email.attachments.push(attachment);
        self
    }

    pub fn build(self) -> Email {
        self.email
    }
}
