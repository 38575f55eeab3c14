#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
//! High-level, asynchronous API for [`ureq`].
//!
//! The blocking agent runs on the tokio blocking pool, and every
//! response is fully buffered before being handed back, whatever its
//! status code. Interpreting the status is left to the caller.

mod error;

use std::time::Duration;

use tracing::debug;
pub use ureq;
use ureq::{
    tls::{RootCerts, TlsConfig, TlsProvider},
    Agent,
};

#[doc(inline)]
pub use crate::error::{Error, Result};

#[cfg(any(
    all(feature = "rustls", feature = "native-tls"),
    not(any(feature = "rustls", feature = "native-tls"))
))]
compile_error!("Either feature `rustls` or `native-tls` must be enabled for this crate.");

/// The default global timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP client structure.
///
/// This structure wraps a HTTP agent, which is used by the
/// [`Client::post`] function.
#[derive(Clone, Debug)]
pub struct Client {
    /// The HTTP agent used to perform calls.
    agent: Agent,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a new HTTP client with sane defaults.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a new HTTP client with the given global timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let tls = TlsConfig::builder()
            .root_certs(RootCerts::PlatformVerifier)
            .provider(
                #[cfg(feature = "native-tls")]
                TlsProvider::NativeTls,
                #[cfg(feature = "rustls")]
                TlsProvider::Rustls,
            );

        let agent: Agent = Agent::config_builder()
            .tls_config(tls.build())
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent }
    }

    /// Sends a POST request with the given headers and body.
    ///
    /// The returned response is buffered. Non-2xx statuses are not
    /// considered as errors.
    pub async fn post(
        &self,
        uri: impl ToString,
        headers: impl IntoIterator<Item = (impl ToString, impl ToString)>,
        body: Vec<u8>,
    ) -> Result<Response> {
        let agent = self.agent.clone();
        let uri = uri.to_string();
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(key, val)| (key.to_string(), val.to_string()))
            .collect();

        debug!("sending POST request to {uri}");

        tokio::task::spawn_blocking(move || {
            let mut request = agent.post(&uri);

            for (key, val) in &headers {
                request = request.header(key.as_str(), val.as_str());
            }

            let response = request
                .send(&body[..])
                .map_err(|err| Error::SendPostRequestError(err, uri.clone()))?;

            let status = response.status().as_u16();

            let headers = response
                .headers()
                .iter()
                .filter_map(|(key, val)| {
                    let val = val.to_str().ok()?;
                    Some((key.as_str().to_owned(), val.to_owned()))
                })
                .collect();

            let body = response
                .into_body()
                .read_to_vec()
                .map_err(|err| Error::ReadResponseBodyError(err, uri.clone()))?;

            debug!("received response from {uri} with status {status}");

            Ok(Response {
                status,
                headers,
                body,
            })
        })
        .await?
    }
}

/// A fully buffered HTTP response.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Response {
    /// The response status code.
    pub status: u16,

    /// The response headers, names in lowercase.
    pub headers: Vec<(String, String)>,

    /// The raw response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Finds the first header matching the given name,
    /// case-insensitively.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, val)| val.as_str())
    }
}
