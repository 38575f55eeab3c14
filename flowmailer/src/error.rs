//! # Error
//!
//! Module dedicated to library errors. It contains an [`Error`] enum
//! based on [`thiserror::Error`] and a type alias [`Result`].

use thiserror::Error;

use crate::{client, config, email, oauth, transport};

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Email(#[from] email::Error),
    #[error(transparent)]
    OAuth(#[from] oauth::Error),
    #[error(transparent)]
    Client(#[from] client::Error),
    #[error(transparent)]
    Transport(#[from] transport::Error),
    #[error(transparent)]
    Http(#[from] http::Error),
}
