//! # Error
//!
//! Module dedicated to HTTP errors. It contains an [`Error`] enum
//! based on [`thiserror::Error`] and a type alias [`Result`].

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error while sending POST request to {1}")]
    SendPostRequestError(#[source] ureq::Error, String),
    #[error("error while reading response body from {1}")]
    ReadResponseBodyError(#[source] ureq::Error, String),

    #[error(transparent)]
    JoinError(#[from] tokio::task::JoinError),
}
