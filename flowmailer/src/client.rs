//! Module dedicated to the Flowmailer REST API client.
//!
//! Only the `messages/submit` endpoint is covered.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{config::FlowmailerConfig, oauth::AccessToken, payload::SubmitMessage};

/// The versioned media type of the Flowmailer API.
pub const MEDIA_TYPE: &str = "application/vnd.flowmailer.v1.12+json;charset=UTF-8";

/// Errors related to the Flowmailer API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot serialize message for {1}")]
    SerializeMessageError(#[source] serde_json::Error, String),
    #[error("cannot submit message for {1}")]
    SubmitMessageRequestError(#[source] http::Error, String),
    #[error("cannot submit message for {1}: flowmailer responded with status {0}: {2}")]
    SubmitMessageError(u16, String, ApiErrorDetail),
    #[error("cannot submit message for {0}: missing message id in response")]
    MissingMessageIdError(String),
}

impl Error {
    /// Returns the recipient address of the failed submission.
    pub fn recipient(&self) -> &str {
        match self {
            Self::SerializeMessageError(_, recipient)
            | Self::SubmitMessageRequestError(_, recipient)
            | Self::SubmitMessageError(_, recipient, _)
            | Self::MissingMessageIdError(recipient) => recipient,
        }
    }
}

/// A single validation error returned by Flowmailer.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiError {
    pub code: Option<String>,
    pub default_message: Option<String>,
    pub field: Option<String>,
    pub object_name: Option<String>,
    pub rejected_value: Option<serde_json::Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{field}: ")?;
        }

        write!(
            f,
            "{}",
            self.default_message.as_deref().unwrap_or("unknown error")
        )?;

        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }

        Ok(())
    }
}

/// The error envelope returned by Flowmailer on failures.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiErrors {
    pub all_errors: Vec<ApiError>,
}

/// The detail of a rejected submission: the decoded Flowmailer
/// errors, or the raw response body when it could not be decoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiErrorDetail {
    Errors(ApiErrors),
    Raw(String),
}

impl ApiErrorDetail {
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrors>(body) {
            Ok(errors) if !errors.all_errors.is_empty() => Self::Errors(errors),
            _ => Self::Raw(String::from_utf8_lossy(body).trim().to_owned()),
        }
    }
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Errors(errors) => {
                let errors = errors
                    .all_errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                write!(f, "{}", errors.join(", "))
            }
            Self::Raw(body) if body.is_empty() => write!(f, "empty response"),
            Self::Raw(body) => write!(f, "{body}"),
        }
    }
}

/// Interprets a submission response.
///
/// Only a `201 Created` carrying a `Location` header is a success:
/// the message ID is the last segment of its path.
pub fn parse_submit_response(
    recipient: &str,
    status: u16,
    location: Option<&str>,
    body: &[u8],
) -> Result<String, Error> {
    if status != 201 {
        let detail = ApiErrorDetail::from_body(body);
        return Err(Error::SubmitMessageError(
            status,
            recipient.to_owned(),
            detail,
        ));
    }

    location
        .map(|location| location.trim().trim_end_matches('/'))
        .and_then(|location| location.rsplit('/').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| Error::MissingMessageIdError(recipient.to_owned()))
}

/// Submits a single message and returns its Flowmailer ID.
pub async fn submit_message(
    client: &http::Client,
    config: &FlowmailerConfig,
    token: &AccessToken,
    message: &SubmitMessage,
) -> Result<String, Error> {
    let recipient = message.recipient_address.as_str();
    let uri = format!(
        "{}/{}/messages/submit",
        config.api_url(),
        urlencoding::encode(config.submit_account()),
    );

    info!("submitting flowmailer message for {recipient}");

    let body = serde_json::to_vec(message)
        .map_err(|err| Error::SerializeMessageError(err, recipient.to_owned()))?;

    let headers = vec![
        ("Authorization", token.authorization()),
        ("Content-Type", String::from(MEDIA_TYPE)),
        ("Accept", String::from(MEDIA_TYPE)),
    ];

    let res = client
        .post(uri, headers, body)
        .await
        .map_err(|err| Error::SubmitMessageRequestError(err, recipient.to_owned()))?;

    let id = parse_submit_response(recipient, res.status, res.header("location"), &res.body)?;
    debug!("flowmailer accepted message {id} for {recipient}");

    Ok(id)
}
