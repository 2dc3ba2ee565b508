//! Request handlers for the proxy's HTTP surface
//!
//! Every request is validated and answered independently; the only outbound
//! call is the token exchange. Validation failures map straight to HTTP
//! responses here — they never propagate as Rust errors. Redirect-flow
//! failures travel back to the client application as an `error` query
//! parameter, since the user-agent is mid-redirect and a status code alone
//! would strand it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::Url;

use github_auth::{
    AUTHORIZE_ENDPOINT, ClientRegistry, EXTENSION_REDIRECT_DOMAIN, ExchangeOutcome,
    GITHUB_PROVIDER, Grant, StateToken, exchange_code,
};

use crate::metrics;

/// Shared application state accessible from all handlers.
///
/// Everything here is immutable after startup; cloning is cheap (Arcs and a
/// pooled reqwest client), so axum's State extractor hands each request its
/// own copy without locking.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub clients: Arc<ClientRegistry>,
    pub allowed_providers: Arc<Vec<String>>,
    pub callback_url: String,
    pub token_url: String,
    pub prometheus: PrometheusHandle,
}

/// GET /health — liveness probe, unconditional.
pub async fn health() -> &'static str {
    "ok"
}

/// GET /config — public OAuth configuration for clients bootstrapping a flow.
/// Client ids only, never secrets.
pub async fn public_config(State(app): State<AppState>) -> Response {
    let client_ids: Vec<&str> = app.clients.client_ids().collect();
    Json(serde_json::json!({
        "github": {
            "client_ids": client_ids,
            "authorize_url": AUTHORIZE_ENDPOINT,
            "callback_url": app.callback_url,
        }
    }))
    .into_response()
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics_exposition(State(app): State<AppState>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        app.prometheus.render(),
    )
        .into_response()
}

/// Fallback for unrouted paths.
pub async fn not_found() -> Response {
    plain(StatusCode::NOT_FOUND, "Not found")
}

/// Permissive CORS for browser-extension and web-app callers: every response
/// gets the allow headers, and preflight OPTIONS requests short-circuit to
/// 204 before routing.
pub async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Query parameters GitHub appends to the callback redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// GET /callback — the provider redirect lands here.
pub async fn callback(
    State(app): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    handle_callback(&app, params, request_id).await
}

#[instrument(skip_all, fields(request_id = %request_id))]
async fn handle_callback(app: &AppState, params: CallbackParams, request_id: String) -> Response {
    // The provider reported a failure instead of issuing a code.
    if let Some(err) = non_empty(&params.error) {
        metrics::record_callback("provider_error");
        let message = match non_empty(&params.error_description) {
            Some(desc) => format!("OAuth error: {err} - {desc}"),
            None => format!("OAuth error: {err}"),
        };
        return plain(StatusCode::BAD_REQUEST, message);
    }

    let (Some(code), Some(raw_state)) = (non_empty(&params.code), non_empty(&params.state))
    else {
        metrics::record_callback("rejected");
        return plain(StatusCode::BAD_REQUEST, "Missing code or state parameter");
    };

    let state = match StateToken::decode(raw_state) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "rejecting undecodable state");
            metrics::record_callback("rejected");
            return plain(StatusCode::BAD_REQUEST, "Invalid state parameter");
        }
    };

    let Some(provider) = state.provider() else {
        metrics::record_callback("rejected");
        return plain(StatusCode::BAD_REQUEST, "Invalid state: missing provider");
    };

    if !app.allowed_providers.iter().any(|p| p == provider) {
        warn!(provider, "rejecting provider outside allow-list");
        metrics::record_callback("rejected");
        return plain(
            StatusCode::BAD_REQUEST,
            format!("Provider not allowed: {provider}"),
        );
    }

    // Web apps carry a redirect_url and get the code exchanged server-side.
    if let Some(redirect_url) = state.redirect_url() {
        return web_app_callback(app, redirect_url, state.client_id(), code).await;
    }

    extension_callback(&state, code, raw_state)
}

/// Web-app flow: exchange the code immediately, then return control to the
/// application with `token=` or `error=` appended to its redirect URL.
async fn web_app_callback(
    app: &AppState,
    redirect_url: &str,
    client_id: Option<&str>,
    code: &str,
) -> Response {
    let target = match Url::parse(redirect_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => {
            warn!("rejecting state with unparsable redirect_url");
            metrics::record_callback("rejected");
            return plain(
                StatusCode::BAD_REQUEST,
                "Invalid state: malformed redirect_url",
            );
        }
    };

    let Some(client) = app.clients.resolve(client_id) else {
        warn!(client_id, "no credentials for requested client");
        metrics::record_callback("rejected");
        return found(with_query(target, "error", "Unknown client_id"));
    };

    let started = std::time::Instant::now();
    let outcome = exchange_code(&app.http, &app.token_url, code, client.id, client.secret).await;
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(ExchangeOutcome::Granted(grant)) => {
            info!(client_id = client.id, "exchanged code for web-app flow");
            metrics::record_callback("exchange_redirect");
            metrics::record_token_exchange("granted", elapsed);
            found(with_query(target, "token", &grant.access_token))
        }
        Ok(ExchangeOutcome::Denied(denial)) => {
            warn!(client_id = client.id, error = %denial.error, "provider denied exchange");
            metrics::record_callback("exchange_redirect");
            metrics::record_token_exchange("denied", elapsed);
            found(with_query(target, "error", denial.message()))
        }
        Err(e) => {
            error!(client_id = client.id, error = %e, "token exchange failed");
            metrics::record_callback("exchange_redirect");
            metrics::record_token_exchange("failed", elapsed);
            found(with_query(target, "error", &e.to_string()))
        }
    }
}

/// Legacy extension flow: forward code and raw state unmodified to the
/// extension's fixed redirect host. No server-side exchange — the extension
/// completes it through POST /exchange.
fn extension_callback(state: &StateToken, code: &str, raw_state: &str) -> Response {
    let Some(extension_id) = state.extension_id() else {
        metrics::record_callback("rejected");
        return plain(
            StatusCode::BAD_REQUEST,
            "Invalid state: missing extensionId or redirect_url",
        );
    };

    // The id becomes a hostname label; anything beyond alphanumerics could
    // smuggle a different host or path into the redirect.
    if !extension_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        warn!("rejecting state with malformed extensionId");
        metrics::record_callback("rejected");
        return plain(StatusCode::BAD_REQUEST, "Invalid state: malformed extensionId");
    }

    let Ok(mut target) = Url::parse(&format!(
        "https://{extension_id}.{EXTENSION_REDIRECT_DOMAIN}/"
    )) else {
        metrics::record_callback("rejected");
        return plain(StatusCode::BAD_REQUEST, "Invalid state: malformed extensionId");
    };

    target
        .query_pairs_mut()
        .append_pair("code", code)
        .append_pair("state", raw_state);

    metrics::record_callback("extension_redirect");
    found(target)
}

/// JSON body for POST /exchange.
#[derive(Debug, Deserialize)]
pub struct ExchangeParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
}

/// Failure modes of POST /exchange, each carrying its HTTP status.
///
/// Bad input and provider denials are the caller's problem (400); missing
/// credentials and transport failures are ours (500).
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Missing code or provider")]
    MissingParams,

    #[error("Unsupported provider")]
    UnsupportedProvider,

    #[error("OAuth not configured for this client")]
    NotConfigured,

    #[error("{0}")]
    Denied(String),

    #[error("{0}")]
    Internal(String),
}

impl ExchangeError {
    fn status(&self) -> StatusCode {
        match self {
            ExchangeError::MissingParams
            | ExchangeError::UnsupportedProvider
            | ExchangeError::Denied(_) => StatusCode::BAD_REQUEST,
            ExchangeError::NotConfigured | ExchangeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            ExchangeError::MissingParams => "rejected",
            ExchangeError::UnsupportedProvider => "rejected",
            ExchangeError::NotConfigured => "not_configured",
            ExchangeError::Denied(_) => "denied",
            ExchangeError::Internal(_) => "failed",
        }
    }
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// POST /exchange — exchange an authorization code for an access token on
/// behalf of a client that cannot hold a secret.
///
/// The body is parsed by hand so a malformed payload maps to the same
/// 500 `{error}` shape as any other exchange failure, instead of an
/// extractor-flavored rejection.
pub async fn exchange(State(app): State<AppState>, body: Bytes) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    match handle_exchange(&app, body, request_id).await {
        Ok(grant) => {
            metrics::record_exchange("granted");
            Json(grant).into_response()
        }
        Err(e) => {
            metrics::record_exchange(e.metric_label());
            e.into_response()
        }
    }
}

#[instrument(skip_all, fields(request_id = %request_id))]
async fn handle_exchange(
    app: &AppState,
    body: Bytes,
    request_id: String,
) -> Result<Grant, ExchangeError> {
    let params: ExchangeParams = serde_json::from_slice(&body)
        .map_err(|e| ExchangeError::Internal(format!("invalid request body: {e}")))?;

    let (Some(code), Some(provider)) = (non_empty(&params.code), non_empty(&params.provider))
    else {
        return Err(ExchangeError::MissingParams);
    };

    // Only GitHub exchange is implemented; checked before credential lookup
    // so an unsupported provider never reaches the network.
    if provider != GITHUB_PROVIDER {
        warn!(provider, "rejecting exchange for unsupported provider");
        return Err(ExchangeError::UnsupportedProvider);
    }

    let client = app
        .clients
        .resolve(non_empty(&params.client_id))
        .ok_or(ExchangeError::NotConfigured)?;

    let started = std::time::Instant::now();
    let outcome = exchange_code(&app.http, &app.token_url, code, client.id, client.secret).await;
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(ExchangeOutcome::Granted(grant)) => {
            info!(client_id = client.id, "exchanged code");
            metrics::record_token_exchange("granted", elapsed);
            Ok(grant)
        }
        Ok(ExchangeOutcome::Denied(denial)) => {
            warn!(client_id = client.id, error = %denial.error, "provider denied exchange");
            metrics::record_token_exchange("denied", elapsed);
            Err(ExchangeError::Denied(denial.message().to_string()))
        }
        Err(e) => {
            error!(client_id = client.id, error = %e, "token exchange failed");
            metrics::record_token_exchange("failed", elapsed);
            Err(ExchangeError::Internal(e.to_string()))
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

/// 302 Found. axum's `Redirect` picks 303/307/308; the OAuth dance
/// observably uses 302, so the response is built directly.
fn found(location: Url) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

fn with_query(mut url: Url, key: &str, value: &str) -> Url {
    url.query_pairs_mut().append_pair(key, value);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_query_appends_to_existing_params() {
        let url = Url::parse("https://app.example.com/done?session=1").unwrap();
        let url = with_query(url, "error", "nope");
        assert_eq!(
            url.as_str(),
            "https://app.example.com/done?session=1&error=nope"
        );
    }

    #[test]
    fn with_query_encodes_values() {
        let url = Url::parse("https://app.example.com/done").unwrap();
        let url = with_query(url, "error", "Unknown client_id");
        let (_, value) = url.query_pairs().next().unwrap();
        assert_eq!(value, "Unknown client_id");
    }

    #[test]
    fn found_sets_location_and_302() {
        let resp = found(Url::parse("https://app.example.com/done?token=T").unwrap());
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://app.example.com/done?token=T"
        );
    }

    #[test]
    fn exchange_error_statuses() {
        assert_eq!(
            ExchangeError::MissingParams.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExchangeError::UnsupportedProvider.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExchangeError::Denied("bad_verification_code".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExchangeError::NotConfigured.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ExchangeError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn exchange_error_messages_match_wire_contract() {
        assert_eq!(
            ExchangeError::MissingParams.to_string(),
            "Missing code or provider"
        );
        assert_eq!(
            ExchangeError::UnsupportedProvider.to_string(),
            "Unsupported provider"
        );
        assert_eq!(
            ExchangeError::NotConfigured.to_string(),
            "OAuth not configured for this client"
        );
    }
}
