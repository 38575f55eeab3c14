//! Fake Flowmailer API for testing purpose.
//!
//! The server exposes the OAuth 2.0 token endpoint and the message
//! submission endpoint, records every request it receives and can be
//! configured to reject tokens or recipients.

use std::{
    collections::HashMap,
    future::Future,
    net::{Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::debug;

/// The access token issued by the fake token endpoint.
pub const ACCESS_TOKEN: &str = "flowmailer-testing-token";

/// The fake server configuration.
#[derive(Clone, Debug)]
pub struct FlowmailerTestingConfig {
    /// The only client ID accepted by the token endpoint.
    pub client_id: String,

    /// The only client secret accepted by the token endpoint.
    pub client_secret: String,

    /// The token type announced by the token endpoint.
    pub token_type: String,

    /// The token lifetime announced by the token endpoint.
    pub expires_in: i64,

    /// Recipients the submission endpoint rejects with a validation
    /// error.
    pub rejected_recipients: Vec<String>,

    /// Whether successful submissions omit the `Location` header.
    pub omit_location: bool,
}

impl Default for FlowmailerTestingConfig {
    fn default() -> Self {
        Self {
            client_id: String::from("client-id"),
            client_secret: String::from("client-secret"),
            token_type: String::from("bearer"),
            expires_in: 60,
            rejected_recipients: Vec::new(),
            omit_location: false,
        }
    }
}

/// A request received by the token endpoint.
#[derive(Clone, Debug, Default)]
pub struct TokenRequest {
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub form: HashMap<String, String>,
}

/// A request received by the submission endpoint.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    pub account: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub body: Value,
}

impl Submission {
    /// Returns the string field of the submitted body matching the
    /// given name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Default)]
struct Recorded {
    token_requests: Vec<TokenRequest>,
    submissions: Vec<Submission>,
}

#[derive(Clone, Debug)]
struct ServerState {
    config: Arc<FlowmailerTestingConfig>,
    recorded: Arc<Mutex<Recorded>>,
}

/// Handle to a running fake server.
#[derive(Clone, Debug)]
pub struct FlowmailerTestingServer {
    /// The base URL of the server, without trailing slash.
    pub url: String,
    state: ServerState,
}

impl FlowmailerTestingServer {
    pub fn token_requests(&self) -> Vec<TokenRequest> {
        self.state
            .recorded
            .lock()
            .expect("recorded requests should not be poisoned")
            .token_requests
            .clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state
            .recorded
            .lock()
            .expect("recorded requests should not be poisoned")
            .submissions
            .clone()
    }
}

/// Spawns a fake Flowmailer API on a random local port, runs the
/// given task against it, then shuts it down.
pub async fn with_flowmailer_testing_server<F: Future<Output = ()>>(
    config: FlowmailerTestingConfig,
    task: impl FnOnce(FlowmailerTestingServer) -> F,
) {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .expect("should bind fake flowmailer server");
    let addr = listener
        .local_addr()
        .expect("should get fake flowmailer server address");

    let state = ServerState {
        config: Arc::new(config),
        recorded: Arc::default(),
    };

    let router = Router::new()
        .route("/oauth/token", post(token))
        .route("/:account/messages/submit", post(submit))
        .with_state(state.clone());

    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("fake flowmailer server should run")
    });

    debug!("fake flowmailer server listening on {addr}");

    task(FlowmailerTestingServer {
        url: format!("http://{addr}"),
        state,
    })
    .await;

    server.abort();
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

async fn token(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let request = TokenRequest {
        content_type: header_value(&headers, header::CONTENT_TYPE),
        accept: header_value(&headers, header::ACCEPT),
        form: form.clone(),
    };

    state
        .recorded
        .lock()
        .expect("recorded requests should not be poisoned")
        .token_requests
        .push(request);

    let config = &state.config;
    let valid = form.get("client_id") == Some(&config.client_id)
        && form.get("client_secret") == Some(&config.client_secret)
        && form.get("grant_type").map(String::as_str) == Some("client_credentials");

    if !valid {
        let body = json!({
            "error": "invalid_client",
            "error_description": "Bad client credentials",
        });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    let body = json!({
        "access_token": ACCESS_TOKEN,
        "token_type": config.token_type,
        "expires_in": config.expires_in,
        "scope": form.get("scope").cloned().unwrap_or_default(),
    });

    (StatusCode::OK, Json(body)).into_response()
}

async fn submit(
    State(state): State<ServerState>,
    Path(account): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let authorization = header_value(&headers, header::AUTHORIZATION);
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let submission = Submission {
        account: account.clone(),
        authorization: authorization.clone(),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        accept: header_value(&headers, header::ACCEPT),
        body,
    };

    let recipient = submission.field("recipientAddress").map(ToOwned::to_owned);

    let id = {
        let mut recorded = state
            .recorded
            .lock()
            .expect("recorded requests should not be poisoned");
        recorded.submissions.push(submission);
        format!("msg-{}", recorded.submissions.len())
    };

    if authorization.as_deref() != Some(&format!("Bearer {ACCESS_TOKEN}")) {
        return (StatusCode::UNAUTHORIZED, "Full authentication is required").into_response();
    }

    let Some(recipient) = recipient else {
        let body = json!({
            "allErrors": [{
                "code": "NotNull",
                "defaultMessage": "may not be null",
                "field": "recipientAddress",
                "objectName": "submitMessage",
                "rejectedValue": null,
            }]
        });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    let rejected = state
        .config
        .rejected_recipients
        .iter()
        .any(|addr| addr.eq_ignore_ascii_case(&recipient));

    if rejected {
        let body = json!({
            "allErrors": [{
                "code": "Invalid",
                "defaultMessage": "recipient address is rejected",
                "field": "recipientAddress",
                "objectName": "submitMessage",
                "rejectedValue": recipient,
            }]
        });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    if state.config.omit_location {
        return StatusCode::CREATED.into_response();
    }

    let location = format!("/{account}/messages/{id}");
    (StatusCode::CREATED, [(header::LOCATION, location)]).into_response()
}
