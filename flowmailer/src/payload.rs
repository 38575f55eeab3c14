//! Module dedicated to the Flowmailer submit payload.
//!
//! This module flattens an [`Email`] and its [`Envelope`] into the
//! field names expected by the Flowmailer `messages/submit`
//! endpoint. Since the endpoint accepts a single recipient per
//! message, a [`Payload`] holds a message template plus the
//! classified recipients, and produces one [`SubmitMessage`] per
//! recipient.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    config::FlowmailerConfig,
    email::{self, Address, Attachment, Disposition, Email, Envelope},
    settings::Settings,
};

/// Headers never forwarded to Flowmailer, since they are mapped to
/// dedicated payload fields.
pub const BYPASS_HEADERS: [&str; 6] = ["from", "to", "cc", "bcc", "subject", "content-type"];

/// Header whose values are forwarded as Flowmailer tags.
pub const TAG_HEADER: &str = "X-Tag";

/// Prefix of headers forwarded as Flowmailer data entries.
pub const METADATA_HEADER_PREFIX: &str = "X-Metadata-";

/// Returns `true` if the given header name is part of
/// [`BYPASS_HEADERS`].
pub fn is_bypass_header(name: &str) -> bool {
    BYPASS_HEADERS
        .iter()
        .any(|bypass| bypass.eq_ignore_ascii_case(name.trim()))
}

/// The Flowmailer message type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    #[default]
    Email,
}

/// A custom header of a submitted message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubmitHeader {
    pub name: String,
    pub value: String,
}

/// An attachment of a submitted message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttachment {
    /// The base64-encoded content.
    pub content: String,
    pub content_type: String,
    pub filename: String,
    pub disposition: Disposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl From<&Attachment> for SubmitAttachment {
    fn from(attachment: &Attachment) -> Self {
        let filename = attachment
            .filename
            .clone()
            .or_else(|| attachment.content_id.clone())
            .unwrap_or_else(|| String::from("attachment"));

        Self {
            content: STANDARD.encode(&attachment.body),
            content_type: attachment.content_type.clone(),
            filename,
            disposition: attachment.disposition,
            content_id: if attachment.is_inline() {
                attachment.content_id.clone()
            } else {
                None
            },
        }
    }
}

/// The Flowmailer `SubmitMessage` model.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessage {
    pub message_type: MessageType,
    pub recipient_address: String,
    /// The envelope sender, also known as return path.
    pub sender_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_from_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_from_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_to_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_to_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_selector: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<SubmitHeader>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SubmitAttachment>,
}

/// The envelope recipients, classified by kind.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Recipients {
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
}

impl Recipients {
    /// Classifies the envelope recipients.
    ///
    /// A recipient is bcc if it belongs to the email bcc list, else
    /// cc if it belongs to the email cc list, else to.
    pub fn classify(email: &Email, envelope: &Envelope) -> Self {
        let mut recipients = Self::default();

        for recipient in &envelope.recipients {
            let list = if email.bcc.iter().any(|addr| addr.matches(recipient)) {
                &mut recipients.bcc
            } else if email.cc.iter().any(|addr| addr.matches(recipient)) {
                &mut recipients.cc
            } else {
                &mut recipients.to
            };

            list.push(recipient.clone());
        }

        recipients
    }

    /// Iterates over all recipients: to first, then cc, then bcc.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    pub fn len(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The email headers, split into Flowmailer tags, data and custom
/// headers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForwardedHeaders {
    pub headers: Vec<SubmitHeader>,
    pub tags: Vec<String>,
    pub data: Map<String, Value>,
}

impl ForwardedHeaders {
    /// Splits the headers of the given email.
    ///
    /// [`BYPASS_HEADERS`] are dropped, [`TAG_HEADER`] values become
    /// tags, [`METADATA_HEADER_PREFIX`] headers become data entries
    /// keyed by the rest of their name, and the remaining headers
    /// are forwarded verbatim.
    pub fn from_email(email: &Email) -> Self {
        let mut forwarded = Self::default();

        for (name, value) in &email.headers {
            let name = name.trim();

            if is_bypass_header(name) {
                continue;
            }

            if name.eq_ignore_ascii_case(TAG_HEADER) {
                let tag = value.trim();
                if !tag.is_empty() && !forwarded.tags.iter().any(|t| t == tag) {
                    forwarded.tags.push(tag.to_owned());
                }
                continue;
            }

            if let Some(key) = strip_prefix_ignore_case(name, METADATA_HEADER_PREFIX) {
                if !key.is_empty() {
                    forwarded
                        .data
                        .insert(key.to_owned(), Value::String(value.clone()));
                    continue;
                }
            }

            forwarded.headers.push(SubmitHeader {
                name: name.to_owned(),
                value: value.clone(),
            });
        }

        forwarded
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;

    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..)
    } else {
        None
    }
}

/// The flattened email, ready to be submitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    /// The message shared by all recipients, without recipient
    /// address.
    pub message: SubmitMessage,

    /// The classified envelope recipients.
    pub recipients: Recipients,
}

impl Payload {
    /// Flattens the given email and envelope.
    pub fn build(
        config: &FlowmailerConfig,
        settings: &Settings,
        email: &Email,
        envelope: &Envelope,
    ) -> Result<Self, email::Error> {
        if envelope.sender.addr.trim().is_empty() {
            return Err(email::Error::MissingSenderError);
        }

        let recipients = Recipients::classify(email, envelope);

        if recipients.is_empty() {
            return Err(email::Error::MissingRecipientError);
        }

        let header_from = email.from.first().unwrap_or(&envelope.sender);
        let header_to = recipients.to.first();
        let forwarded = ForwardedHeaders::from_email(email);

        let message = SubmitMessage {
            message_type: MessageType::Email,
            recipient_address: String::new(),
            sender_address: settings.apply_return_path(&envelope.sender),
            subject: email.subject.clone(),
            html: email.html.clone(),
            text: email.text.clone(),
            header_from_address: Some(header_from.addr.clone()),
            header_from_name: header_from.name().map(ToOwned::to_owned),
            header_to_address: header_to.map(|addr| addr.addr.clone()),
            header_to_name: header_to.and_then(Address::name).map(ToOwned::to_owned),
            flow_selector: config.template().map(ToOwned::to_owned),
            headers: forwarded.headers,
            tags: forwarded.tags,
            data: forwarded.data,
            attachments: email.attachments.iter().map(Into::into).collect(),
        };

        debug!(
            "built payload for {} recipient(s) with {} attachment(s)",
            recipients.len(),
            message.attachments.len()
        );

        Ok(Self {
            message,
            recipients,
        })
    }

    /// Produces one message per recipient.
    pub fn messages(&self) -> impl Iterator<Item = SubmitMessage> + '_ {
        self.recipients.iter().map(|recipient| SubmitMessage {
            recipient_address: recipient.addr.clone(),
            ..self.message.clone()
        })
    }
}
