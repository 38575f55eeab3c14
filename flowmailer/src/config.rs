//! Module dedicated to the Flowmailer configuration.
//!
//! This module contains the credentials and endpoints needed to talk
//! to the Flowmailer API. A string made of a single environment
//! variable reference (`$VAR` or `${VAR}`) is replaced by the value
//! of that variable in [`FlowmailerConfig::expand`]. Any other string
//! is kept as is, so secrets may contain a literal `$`.

use std::time::Duration;

use shellexpand_utils::try_shellexpand_str;
use thiserror::Error;
use tracing::debug;

/// The default Flowmailer REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.flowmailer.net";

/// The default Flowmailer OAuth 2.0 server base URL.
pub const DEFAULT_LOGIN_URL: &str = "https://login.flowmailer.net";

/// The default HTTP timeout, in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Errors related to the Flowmailer configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot validate flowmailer config: {0} cannot be blank")]
    MissingFieldError(&'static str),
    #[error("cannot expand flowmailer config {1}")]
    ExpandFieldError(#[source] shellexpand_utils::Error, &'static str),
}

/// The Flowmailer configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case", default)
)]
pub struct FlowmailerConfig {
    /// The Flowmailer account ID.
    pub account_id: String,

    /// The OAuth 2.0 client ID.
    pub client_id: String,

    /// The OAuth 2.0 client secret.
    pub client_secret: String,

    /// The subaccount messages are submitted to.
    ///
    /// When defined, it replaces the account ID in the submission
    /// endpoint. Credentials stay the ones of the main account.
    pub subaccount: Option<String>,

    /// The template name, sent as Flowmailer flow selector.
    pub template: Option<String>,

    /// The REST API base URL.
    ///
    /// Defaults to [`DEFAULT_API_URL`].
    pub api_url: Option<String>,

    /// The OAuth 2.0 server base URL.
    ///
    /// Defaults to [`DEFAULT_LOGIN_URL`].
    pub login_url: Option<String>,

    /// The HTTP timeout, in seconds.
    ///
    /// Defaults to [`DEFAULT_TIMEOUT`].
    pub timeout: Option<u64>,
}

impl FlowmailerConfig {
    /// Returns a copy of the configuration where every environment
    /// variable reference has been expanded.
    pub fn expand(&self) -> Result<Self, Error> {
        debug!("expanding flowmailer config");

        Ok(Self {
            account_id: expand(&self.account_id, "account-id")?,
            client_id: expand(&self.client_id, "client-id")?,
            client_secret: expand(&self.client_secret, "client-secret")?,
            subaccount: expand_opt(&self.subaccount, "subaccount")?,
            template: expand_opt(&self.template, "template")?,
            api_url: expand_opt(&self.api_url, "api-url")?,
            login_url: expand_opt(&self.login_url, "login-url")?,
            timeout: self.timeout,
        })
    }

    /// Checks that the required fields are defined.
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("account-id", &self.account_id),
            ("client-id", &self.client_id),
            ("client-secret", &self.client_secret),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingFieldError(name));
            }
        }

        Ok(())
    }

    /// Returns the account messages are submitted to: the subaccount
    /// if defined, otherwise the main account.
    pub fn submit_account(&self) -> &str {
        self.subaccount
            .as_deref()
            .map(str::trim)
            .filter(|subaccount| !subaccount.is_empty())
            .unwrap_or(&self.account_id)
    }

    /// Returns the template name, if defined and not blank.
    pub fn template(&self) -> Option<&str> {
        self.template
            .as_deref()
            .map(str::trim)
            .filter(|template| !template.is_empty())
    }

    /// Returns the REST API base URL, without trailing slash.
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }

    /// Returns the OAuth 2.0 server base URL, without trailing slash.
    pub fn login_url(&self) -> &str {
        self.login_url
            .as_deref()
            .unwrap_or(DEFAULT_LOGIN_URL)
            .trim_end_matches('/')
    }

    /// Returns the HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
    }
}

/// Returns `true` if the given value is exactly `$VAR` or `${VAR}`.
fn is_env_var(value: &str) -> bool {
    let name = value
        .strip_prefix("${")
        .and_then(|value| value.strip_suffix('}'))
        .or_else(|| value.strip_prefix('$'));

    matches!(name, Some(name) if !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

fn expand(value: &str, name: &'static str) -> Result<String, Error> {
    let trimmed = value.trim();

    if !is_env_var(trimmed) {
        return Ok(value.to_owned());
    }

    try_shellexpand_str(trimmed).map_err(|err| Error::ExpandFieldError(err, name))
}

fn expand_opt(value: &Option<String>, name: &'static str) -> Result<Option<String>, Error> {
    value.as_ref().map(|value| expand(value, name)).transpose()
}
