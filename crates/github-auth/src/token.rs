//! Authorization-code exchange
//!
//! One outbound POST to the provider's token endpoint. GitHub reports OAuth
//! failures (expired code, bad secret) in the response body with a 200
//! status, so the body is parsed into [`ExchangeOutcome`] the same way
//! regardless of status — only transport failures and unparsable bodies
//! surface as Rust errors.

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Successful token grant, relayed verbatim to the caller.
///
/// `token_type` and `scope` are optional because the proxy relays whatever
/// the provider sent; GitHub includes both.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Grant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Provider-reported failure (`bad_verification_code` and friends).
#[derive(Debug, Clone, Deserialize)]
pub struct Denial {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl Denial {
    /// Human-readable message: the description when the provider sent one,
    /// otherwise the error code itself.
    pub fn message(&self) -> &str {
        self.error_description.as_deref().unwrap_or(&self.error)
    }
}

/// The provider's verdict on an exchange attempt.
///
/// Deserialization dispatches on field presence: a body carrying `error` is a
/// denial, a body carrying `access_token` is a grant. Anything else fails to
/// parse and becomes [`Error::InvalidResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExchangeOutcome {
    Denied(Denial),
    Granted(Grant),
}

/// Exchange an authorization code for an access token.
///
/// Sends `{client_id, client_secret, code}` as JSON with
/// `Accept: application/json` so GitHub answers in JSON instead of its
/// form-encoded default. The request timeout comes from the `reqwest::Client`
/// the caller built; no retries are attempted — a failed exchange is terminal
/// for the request that triggered it.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    code: &str,
    client_id: &str,
    client_secret: &Secret<String>,
) -> Result<ExchangeOutcome> {
    let response = client
        .post(token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&serde_json::json!({
            "client_id": client_id,
            "client_secret": client_secret.expose(),
            "code": code,
        }))
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("reading token response failed: {e}")))?;

    serde_json::from_slice(&body).map_err(|e| {
        warn!(%status, error = %e, "token endpoint returned unparsable body");
        Error::InvalidResponse
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_deserializes() {
        let json = r#"{"access_token":"gho_abc","token_type":"bearer","scope":"repo"}"#;
        let outcome: ExchangeOutcome = serde_json::from_str(json).unwrap();
        match outcome {
            ExchangeOutcome::Granted(grant) => {
                assert_eq!(grant.access_token, "gho_abc");
                assert_eq!(grant.token_type.as_deref(), Some("bearer"));
                assert_eq!(grant.scope.as_deref(), Some("repo"));
            }
            ExchangeOutcome::Denied(_) => panic!("expected grant"),
        }
    }

    #[test]
    fn denial_deserializes() {
        let json = r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired.","error_uri":"https://docs.github.com"}"#;
        let outcome: ExchangeOutcome = serde_json::from_str(json).unwrap();
        match outcome {
            ExchangeOutcome::Denied(denial) => {
                assert_eq!(denial.error, "bad_verification_code");
                assert_eq!(
                    denial.message(),
                    "The code passed is incorrect or expired."
                );
            }
            ExchangeOutcome::Granted(_) => panic!("expected denial"),
        }
    }

    #[test]
    fn denial_without_description_falls_back_to_code() {
        let json = r#"{"error":"bad_verification_code"}"#;
        let outcome: ExchangeOutcome = serde_json::from_str(json).unwrap();
        match outcome {
            ExchangeOutcome::Denied(denial) => {
                assert_eq!(denial.message(), "bad_verification_code");
            }
            ExchangeOutcome::Granted(_) => panic!("expected denial"),
        }
    }

    #[test]
    fn grant_without_scope_deserializes() {
        let json = r#"{"access_token":"gho_abc"}"#;
        let outcome: ExchangeOutcome = serde_json::from_str(json).unwrap();
        assert!(matches!(outcome, ExchangeOutcome::Granted(_)));
    }

    #[test]
    fn unrelated_body_is_not_an_outcome() {
        let err = serde_json::from_str::<ExchangeOutcome>(r#"{"message":"Not Found"}"#);
        assert!(err.is_err(), "a body with neither field must not parse");
    }

    #[test]
    fn grant_serialization_omits_absent_fields() {
        let grant = Grant {
            access_token: "gho_abc".into(),
            token_type: None,
            scope: None,
        };
        let json = serde_json::to_string(&grant).unwrap();
        assert_eq!(json, r#"{"access_token":"gho_abc"}"#);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let client = reqwest::Client::new();
        let secret = Secret::new("s".to_string());
        let result = exchange_code(
            &client,
            "http://127.0.0.1:1/login/oauth/access_token",
            "code",
            "id",
            &secret,
        )
        .await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
