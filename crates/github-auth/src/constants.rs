//! GitHub OAuth constants
//!
//! Fixed endpoints for GitHub's OAuth web application flow. These are not
//! secrets — the client secrets live in the credential registry, sourced
//! from the environment at startup.

/// Provider identifier accepted for server-side code exchange
pub const GITHUB_PROVIDER: &str = "github";

/// Authorization endpoint clients send users to (reported via /config)
pub const AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";

/// Token endpoint for authorization-code exchange
pub const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";

/// Domain suffix Chrome hands to extensions for OAuth redirects.
/// The legacy callback flow redirects to `https://<extensionId>.chromiumapp.org/`.
pub const EXTENSION_REDIRECT_DOMAIN: &str = "chromiumapp.org";
