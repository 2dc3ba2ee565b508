//! Opaque state token carried through the provider redirect
//!
//! Clients construct the state value before sending the user to GitHub:
//! a JSON object, base64-encoded, passed through the authorize redirect and
//! returned verbatim on the callback. The proxy never writes state, it only
//! decodes and validates what comes back.
//!
//! The token selects one of two callback flows:
//! - `redirect_url` present: the proxy exchanges the code server-side and
//!   redirects to the web app with the token (or an error) appended
//! - `extensionId` present: the proxy forwards code + state unmodified to the
//!   Chrome extension's `chromiumapp.org` redirect host

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use serde::Deserialize;

// Clients in the wild encode with either alphabet and are inconsistent about
// padding, since the value travels inside a query string. Both engines accept
// padded and unpadded input.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded state token.
///
/// All fields are optional at the serde level; which ones must be present
/// depends on the flow, so the handlers decide via the accessor methods.
/// An empty string is treated the same as an absent field. Unknown fields
/// (e.g. a client-side nonce) are ignored and survive the round-trip inside
/// the raw value.
#[derive(Debug, Clone, Deserialize)]
pub struct StateToken {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default, rename = "extensionId")]
    extension_id: Option<String>,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
}

impl StateToken {
    /// Decode a raw query-string value: base64, then JSON.
    pub fn decode(raw: &str) -> Result<Self, StateError> {
        let bytes = STANDARD_LENIENT
            .decode(raw)
            .or_else(|_| URL_SAFE_LENIENT.decode(raw))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// OAuth provider named by the client, if present and non-empty.
    pub fn provider(&self) -> Option<&str> {
        non_empty(&self.provider)
    }

    /// Chrome extension id for the legacy redirect flow.
    pub fn extension_id(&self) -> Option<&str> {
        non_empty(&self.extension_id)
    }

    /// Web-app return URL; presence selects the server-side exchange flow.
    pub fn redirect_url(&self) -> Option<&str> {
        non_empty(&self.redirect_url)
    }

    /// OAuth client id selecting a configured credential pair.
    pub fn client_id(&self) -> Option<&str> {
        non_empty(&self.client_id)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Failure to decode a state value. The proxy reports every variant as the
/// same client-input error, so the split only matters for logging.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    fn encode(json: &str) -> String {
        STANDARD.encode(json)
    }

    #[test]
    fn decodes_extension_state() {
        let raw = encode(r#"{"provider":"github","extensionId":"abcdefghijklmnop"}"#);
        let token = StateToken::decode(&raw).unwrap();
        assert_eq!(token.provider(), Some("github"));
        assert_eq!(token.extension_id(), Some("abcdefghijklmnop"));
        assert_eq!(token.redirect_url(), None);
        assert_eq!(token.client_id(), None);
    }

    #[test]
    fn decodes_web_app_state() {
        let raw = encode(
            r#"{"provider":"github","redirect_url":"https://app.example.com/done","client_id":"Iv1.abc"}"#,
        );
        let token = StateToken::decode(&raw).unwrap();
        assert_eq!(token.redirect_url(), Some("https://app.example.com/done"));
        assert_eq!(token.client_id(), Some("Iv1.abc"));
        assert_eq!(token.extension_id(), None);
    }

    #[test]
    fn decodes_url_safe_alphabet() {
        // A payload whose standard encoding contains '+' and '/' — the
        // URL-safe encoding of the same bytes must also decode.
        let json = r#"{"provider":"github","extensionId":"abc","nonce":"????????>>>"}"#;
        let raw = URL_SAFE_NO_PAD.encode(json);
        let token = StateToken::decode(&raw).unwrap();
        assert_eq!(token.provider(), Some("github"));
    }

    #[test]
    fn decodes_without_padding() {
        let json = r#"{"provider":"github"}"#;
        let mut raw = STANDARD.encode(json);
        while raw.ends_with('=') {
            raw.pop();
        }
        assert!(StateToken::decode(&raw).is_ok());
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = StateToken::decode("!!not-base64!!").unwrap_err();
        assert!(matches!(err, StateError::Encoding(_)));
    }

    #[test]
    fn rejects_non_json_payload() {
        let raw = STANDARD.encode("this is not json");
        let err = StateToken::decode(&raw).unwrap_err();
        assert!(matches!(err, StateError::Json(_)));
    }

    #[test]
    fn rejects_json_scalar_payload() {
        // Valid JSON but not an object — must not decode into a token.
        let raw = STANDARD.encode("42");
        assert!(StateToken::decode(&raw).is_err());
    }

    #[test]
    fn empty_fields_read_as_absent() {
        let raw = encode(r#"{"provider":"","extensionId":""}"#);
        let token = StateToken::decode(&raw).unwrap();
        assert_eq!(token.provider(), None);
        assert_eq!(token.extension_id(), None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = encode(r#"{"provider":"github","nonce":"xyz","extra":{"a":1}}"#);
        let token = StateToken::decode(&raw).unwrap();
        assert_eq!(token.provider(), Some("github"));
    }
}
