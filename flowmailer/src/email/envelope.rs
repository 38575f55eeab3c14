//! Module dedicated to the SMTP-like envelope.
//!
//! The envelope holds the addressing used for delivery, which can
//! differ from what the message headers display (bcc recipients for
//! example).

use super::{Address, Email, Error};

/// The delivery envelope.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Envelope {
    /// The envelope sender.
    pub sender: Address,

    /// The envelope recipients.
    pub recipients: Vec<Address>,
}

impl Envelope {
    pub fn new(
        sender: impl Into<Address>,
        recipients: impl IntoIterator<Item = impl Into<Address>>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }

    /// Derives the envelope from the email headers.
    ///
    /// The sender is the `Sender` address or the first `From`
    /// address. The recipients are the to, cc and bcc addresses,
    /// without duplicates.
    pub fn from_email(email: &Email) -> Result<Self, Error> {
        let sender = email
            .sender
            .as_ref()
            .or_else(|| email.from.first())
            .cloned()
            .ok_or(Error::MissingSenderError)?;

        let mut recipients: Vec<Address> = Vec::new();

        for addr in email.to.iter().chain(&email.cc).chain(&email.bcc) {
            if !recipients.iter().any(|r| r.matches(addr)) {
                recipients.push(addr.clone());
            }
        }

        if recipients.is_empty() {
            return Err(Error::MissingRecipientError);
        }

        Ok(Self { sender, recipients })
    }
}
