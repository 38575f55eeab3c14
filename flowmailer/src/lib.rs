#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! Rust library to send transactional emails through the
//! [Flowmailer](https://flowmailer.com) REST API.
//!
//! The library turns an outbound [`Email`] and its [`Envelope`] into
//! Flowmailer submit messages, acquires an OAuth 2.0 access token
//! using the client credentials grant, then submits one message per
//! envelope recipient.
//!
//! ```rust,ignore
//! use flowmailer::{
//!     config::FlowmailerConfig,
//!     email::{Email, Envelope},
//!     transport::{FlowmailerContextBuilder, SendFlowmailerMessage, SendMessage},
//! };
//!
//! let config = FlowmailerConfig {
//!     account_id: "1234".into(),
//!     client_id: "$FLOWMAILER_CLIENT_ID".into(),
//!     client_secret: "$FLOWMAILER_CLIENT_SECRET".into(),
//!     ..Default::default()
//! };
//!
//! let ctx = FlowmailerContextBuilder::new(config).build()?;
//! let email = Email::builder()
//!     .from(("Alice", "alice@example.com"))
//!     .to("bob@example.com")
//!     .subject("Hello")
//!     .text("Hello, world!")
//!     .build();
//! let envelope = Envelope::from_email(&email)?;
//!
//! let sent = SendFlowmailerMessage::new(&ctx)
//!     .send_message(&email, &envelope)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod email;
mod error;
pub mod oauth;
pub mod payload;
pub mod settings;
pub mod transport;

#[doc(inline)]
pub use self::{
    email::{Email, Envelope},
    error::{Error, Result},
};
