//! OAuth 2.0 Client Credentials Grant helper, as defined in the
//! [RFC6749](https://datatracker.ietf.org/doc/html/rfc6749#section-4.4).
//!
//! Flowmailer issues short-lived bearer tokens in exchange for the
//! account client ID and secret. Tokens are not cached: callers
//! request a new one for every send.

use std::{fmt, time::Duration};

use oauth2::{
    basic::{BasicErrorResponse, BasicTokenResponse, BasicTokenType},
    http::Response,
    AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpRequest, HttpResponse,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FlowmailerConfig;

/// The token endpoint path, relative to the login URL.
pub const TOKEN_PATH: &str = "/oauth/token";

/// The scope requested for API access.
pub const SCOPE: &str = "api";

/// The OAuth 2.0 client, with only the token endpoint set.
pub type OAuthClient = oauth2::basic::BasicClient<
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Errors related to access token acquisition.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot build token url {1}")]
    BuildTokenUrlError(#[source] oauth2::url::ParseError, String),
    #[error("cannot request access token")]
    RequestAccessTokenError(#[source] http::Error),
    #[error("cannot build access token response")]
    BuildTokenResponseError(#[source] oauth2::http::Error),
    #[error("cannot request access token: server responded with {0}")]
    RequestAccessTokenRejectedError(BasicErrorResponse),
    #[error("cannot request access token: {0}")]
    RequestAccessTokenUnexpectedError(String),
    #[error("cannot parse access token response {1:?}")]
    ParseTokenResponseError(#[source] serde_json::Error, String),
    #[error("cannot get access token: token is missing")]
    MissingAccessTokenError,
    #[error("cannot get access token: invalid token type {0:?}")]
    InvalidTokenTypeError(String),
    #[error("cannot get access token: invalid expiration {0}")]
    InvalidExpirationError(u64),
}

/// A bearer access token.
#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken {
    secret: String,
    expires_in: Duration,
}

impl AccessToken {
    /// Returns the raw token.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the token lifetime, as announced by the server.
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Returns the value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Builds the OAuth 2.0 client of the given configuration.
///
/// Credentials are sent in the request body rather than through
/// HTTP basic authentication.
pub fn build_oauth_client(config: &FlowmailerConfig) -> Result<OAuthClient, Error> {
    let token_url = format!("{}{TOKEN_PATH}", config.login_url());

    let client = oauth2::basic::BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_client_secret(ClientSecret::new(config.client_secret.clone()))
        .set_auth_type(AuthType::RequestBody)
        .set_token_uri(
            TokenUrl::new(token_url.clone())
                .map_err(|err| Error::BuildTokenUrlError(err, token_url))?,
        );

    Ok(client)
}

/// Interprets the outcome of a token exchange.
///
/// Transport and server errors are mapped to [`Error`]. A token type
/// other than `bearer`, a blank token or a non-positive expiration
/// are errors as well.
pub fn parse_token_response(
    res: Result<BasicTokenResponse, RequestTokenError<Error, BasicErrorResponse>>,
) -> Result<AccessToken, Error> {
    let res = res.map_err(|err| match err {
        RequestTokenError::Request(err) => err,
        RequestTokenError::ServerResponse(res) => Error::RequestAccessTokenRejectedError(res),
        RequestTokenError::Parse(err, body) => {
            let body = String::from_utf8_lossy(&body).trim().to_owned();
            Error::ParseTokenResponseError(err.into_inner(), body)
        }
        RequestTokenError::Other(reason) => Error::RequestAccessTokenUnexpectedError(reason),
    })?;

    let token_type = match res.token_type() {
        BasicTokenType::Bearer => None,
        BasicTokenType::Extension(kind) => Some(kind.clone()),
        kind => Some(format!("{kind:?}").to_lowercase()),
    };

    if let Some(kind) = token_type {
        return Err(Error::InvalidTokenTypeError(kind));
    }

    let secret = res.access_token().secret();
    if secret.trim().is_empty() {
        return Err(Error::MissingAccessTokenError);
    }

    let expires_in = res.expires_in().unwrap_or_default();
    if expires_in.is_zero() {
        return Err(Error::InvalidExpirationError(expires_in.as_secs()));
    }

    Ok(AccessToken {
        secret: secret.to_owned(),
        expires_in,
    })
}

/// Sends an OAuth 2.0 request through the given HTTP client.
///
/// Token requests are always `POST` requests.
async fn send_oauth2_request(
    client: http::Client,
    oauth2_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let uri = oauth2_request.uri().to_string();

    let headers: Vec<(String, String)> = oauth2_request
        .headers()
        .iter()
        .filter_map(|(key, val)| {
            let val = val.to_str().ok()?;
            Some((key.as_str().to_owned(), val.to_owned()))
        })
        .collect();

    let res = client
        .post(uri, headers, oauth2_request.into_body())
        .await
        .map_err(Error::RequestAccessTokenError)?;

    let mut oauth2_response = Response::builder().status(res.status);

    for (key, val) in &res.headers {
        oauth2_response = oauth2_response.header(key.as_str(), val.as_str());
    }

    oauth2_response
        .body(res.body)
        .map_err(Error::BuildTokenResponseError)
}

/// Requests a new access token using the client credentials of the
/// given configuration.
pub async fn request_access_token(
    client: &http::Client,
    config: &FlowmailerConfig,
) -> Result<AccessToken, Error> {
    let oauth = build_oauth_client(config)?;
    info!("requesting flowmailer access token from {}", oauth.token_uri().as_str());

    let client = client.clone();
    let res = oauth
        .exchange_client_credentials()
        .add_scope(Scope::new(SCOPE.to_owned()))
        .request_async(&move |request: HttpRequest| send_oauth2_request(client.clone(), request))
        .await;

    let token = parse_token_response(res)?;
    debug!("access token expires in {:?}", token.expires_in());

    Ok(token)
}
