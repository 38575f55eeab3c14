//! Module dedicated to the Flowmailer transport.
//!
//! The transport is made of a [`FlowmailerContext`], built once from
//! a [`FlowmailerConfig`] using the [`FlowmailerContextBuilder`], and
//! of features sharing this context:
//!
//! - [`SendMessage`] sends a structured [`Email`] along with its
//!   [`Envelope`],
//! - [`SendRawMessage`] parses a raw message first.
//!
//! Every send requests a fresh access token, then submits one message
//! per envelope recipient. All recipients are attempted, even when
//! some of them fail.

pub mod send;
pub mod send_raw;

use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::{info, warn};

#[doc(inline)]
pub use self::{
    send::{SendFlowmailerMessage, SendMessage},
    send_raw::{SendFlowmailerRawMessage, SendRawMessage},
};
use crate::{
    client,
    config::FlowmailerConfig,
    email::{self, Email, Envelope},
    oauth,
    payload::Payload,
    settings::Settings,
    Result,
};

/// Errors related to the transport.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot send email")]
    SendEmailError(#[source] client::Error),
    #[error(
        "cannot send one or multiple emails: {} failure(s) for {}",
        .0.len(),
        format_recipients(.0)
    )]
    SendEmailsError(Vec<client::Error>),
    #[error("cannot parse raw email")]
    ParseRawEmailError(#[source] email::Error),
}

fn format_recipients(failures: &[client::Error]) -> String {
    failures
        .iter()
        .map(client::Error::recipient)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Returns the per-recipient submission failures.
    pub fn failures(&self) -> Vec<&client::Error> {
        match self {
            Self::SendEmailError(err) => vec![err],
            Self::SendEmailsError(errs) => errs.iter().collect(),
            Self::ParseRawEmailError(_) => Vec::new(),
        }
    }
}

/// The outcome of a successful send.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SentMessage {
    /// The recipient addresses along with the Flowmailer message ID
    /// of their submission.
    pub messages: Vec<(String, String)>,
}

impl SentMessage {
    /// Finds the message ID of the given recipient,
    /// case-insensitively.
    pub fn find_message_id(&self, recipient: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|(addr, _)| addr.eq_ignore_ascii_case(recipient))
            .map(|(_, id)| id.as_str())
    }

    pub fn message_ids(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|(_, id)| id.as_str())
    }
}

/// The Flowmailer transport context.
///
/// The context is cheap to clone: configuration and settings are
/// shared, and so is the underlying HTTP agent.
#[derive(Clone, Debug)]
pub struct FlowmailerContext {
    /// The expanded and validated configuration.
    pub config: Arc<FlowmailerConfig>,

    /// The transport settings.
    pub settings: Arc<Settings>,

    /// The HTTP client.
    client: http::Client,
}

impl FlowmailerContext {
    /// Sends the given email to every recipient of the given
    /// envelope.
    pub async fn send(&self, email: &Email, envelope: &Envelope) -> Result<SentMessage> {
        let payload = Payload::build(&self.config, &self.settings, email, envelope)?;
        let total = payload.recipients.len();

        info!("sending flowmailer email to {total} recipient(s)");

        let token = oauth::request_access_token(&self.client, &self.config).await?;

        let mut sent = SentMessage::default();
        let mut failures = Vec::new();

        for message in payload.messages() {
            let recipient = message.recipient_address.clone();

            match client::submit_message(&self.client, &self.config, &token, &message).await {
                Ok(id) => sent.messages.push((recipient, id)),
                Err(err) => {
                    warn!("cannot send flowmailer email to {recipient}: {err}");
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            return Ok(sent);
        }

        if total == 1 {
            if let Some(err) = failures.pop() {
                return Err(Error::SendEmailError(err).into());
            }
        }

        Err(Error::SendEmailsError(failures).into())
    }

    /// Parses the given raw message, derives its envelope from the
    /// headers, then sends it.
    pub async fn send_raw(&self, raw: &[u8]) -> Result<SentMessage> {
        let email = Email::from_raw(raw).map_err(Error::ParseRawEmailError)?;
        let envelope = Envelope::from_email(&email)?;
        self.send(&email, &envelope).await
    }
}

impl fmt::Display for FlowmailerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flowmailer+api://{}", self.config.account_id)
    }
}

/// The Flowmailer transport context builder.
#[derive(Clone, Debug, Default)]
pub struct FlowmailerContextBuilder {
    config: FlowmailerConfig,
    settings: Settings,
}

impl FlowmailerContextBuilder {
    pub fn new(config: FlowmailerConfig) -> Self {
        Self {
            config,
            settings: Settings::default(),
        }
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.set_settings(settings);
        self
    }

    /// Builds the transport context.
    ///
    /// The configuration is shell expanded then validated, and the
    /// HTTP client is configured with its timeout.
    pub fn build(self) -> Result<FlowmailerContext> {
        info!("building new flowmailer context");

        let config = self.config.expand()?;
        config.validate()?;

        let client = http::Client::with_timeout(config.timeout());

        Ok(FlowmailerContext {
            config: Arc::new(config),
            settings: Arc::new(self.settings),
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FlowmailerConfig {
        FlowmailerConfig {
            account_id: "1234".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn build_validates_config() {
        let ctx = FlowmailerContextBuilder::new(config()).build().unwrap();
        assert_eq!(ctx.to_string(), "flowmailer+api://1234");

        let err = FlowmailerContextBuilder::new(FlowmailerConfig {
            client_secret: String::new(),
            ..config()
        })
        .build()
        .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Config(crate::config::Error::MissingFieldError("client-secret"))
        ));
    }

    #[test]
    fn send_emails_error_names_failed_recipients() {
        let err = Error::SendEmailsError(vec![
            client::Error::MissingMessageIdError("bob@localhost".into()),
            client::Error::MissingMessageIdError("carol@localhost".into()),
        ]);

        assert_eq!(
            err.to_string(),
            "cannot send one or multiple emails: 2 failure(s) for bob@localhost, carol@localhost"
        );
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn sent_message_lookup() {
        let sent = SentMessage {
            messages: vec![
                ("bob@localhost".into(), "1".into()),
                ("carol@localhost".into(), "2".into()),
            ],
        };

        assert_eq!(sent.find_message_id("BOB@localhost"), Some("1"));
        assert_eq!(sent.find_message_id("dave@localhost"), None);
        assert_eq!(sent.message_ids().collect::<Vec<_>>(), ["1", "2"]);
    }

    #[test_log::test(tokio::test)]
    async fn send_raw_rejects_empty_message() {
        let ctx = FlowmailerContextBuilder::new(config()).build().unwrap();
        let err = ctx.send_raw(b"").await.unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Transport(Error::ParseRawEmailError(
                email::Error::ParseEmailEmptyRawError
            ))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn send_without_recipient_does_not_hit_network() {
        let ctx = FlowmailerContextBuilder::new(FlowmailerConfig {
            login_url: Some("http://127.0.0.1:1".into()),
            ..config()
        })
        .build()
        .unwrap();

        let email = Email::builder().from("alice@localhost").build();
        let envelope = Envelope::new("alice@localhost", Vec::<email::Address>::new());
        let err = ctx.send(&email, &envelope).await.unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Email(email::Error::MissingRecipientError)
        ));
    }
}
