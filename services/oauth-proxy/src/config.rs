//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The TOML file is optional at the default path, required when named
//! explicitly. Client secrets are sourced from the environment only
//! (GITHUB_CLIENTS / GITHUB_CLIENT_ID+GITHUB_CLIENT_SECRET), never from the
//! TOML, to avoid leaking secrets.

use common::{Error, Result, Secret};
use github_auth::{ClientRegistry, TOKEN_ENDPOINT};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "oauth-proxy.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OauthConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 1000,
        }
    }
}

/// OAuth brokering settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OauthConfig {
    /// Providers accepted in state tokens
    pub allowed_providers: Vec<String>,
    /// Public callback URL reported via /config (the URL registered with the
    /// OAuth app, not the local listen address)
    pub callback_url: String,
    /// Token endpoint for code exchange; overridable for tests and staging
    pub token_url: String,
    /// Upper bound on one outbound exchange call
    pub exchange_timeout_secs: u64,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            allowed_providers: vec![github_auth::GITHUB_PROVIDER.to_string()],
            callback_url: "http://127.0.0.1:3000/callback".to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
            exchange_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration, then overlay environment variables.
    ///
    /// An explicit path (CLI or CONFIG_PATH) must exist. With no explicit
    /// path the default file is used when present, defaults otherwise —
    /// the proxy runs fine on environment variables alone.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    /// None means "no file named": load() falls back to the default path.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from)
    }

    /// Environment overrides. PORT replaces only the port of listen_addr,
    /// matching how the proxy has historically been deployed.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| Error::env("PORT", format!("not a port number: {port}")))?;
            self.server.listen_addr.set_port(port);
        }

        if let Ok(providers) = std::env::var("ALLOWED_PROVIDERS") {
            self.oauth.allowed_providers = providers
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }

        if let Ok(url) = std::env::var("CALLBACK_URL") {
            self.oauth.callback_url = url;
        }

        if let Ok(url) = std::env::var("GITHUB_TOKEN_URL") {
            self.oauth.token_url = url;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.oauth.exchange_timeout_secs == 0 {
            return Err(Error::Config(
                "exchange_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.oauth.allowed_providers.is_empty() {
            return Err(Error::Config(
                "allowed_providers must not be empty".into(),
            ));
        }

        for (name, url) in [
            ("token_url", &self.oauth.token_url),
            ("callback_url", &self.oauth.callback_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        Ok(())
    }
}

/// Build the client registry from the environment.
///
/// GITHUB_CLIENTS is a JSON object `{client_id: secret, ...}`; its first key
/// becomes the default client. The single GITHUB_CLIENT_ID/GITHUB_CLIENT_SECRET
/// pair is merged afterwards for backwards compatibility, overwriting a
/// duplicate id. An empty registry is valid — the extension callback flow
/// needs no credentials.
pub fn load_client_registry() -> Result<ClientRegistry> {
    let mut registry = ClientRegistry::new();

    if let Ok(raw) = std::env::var("GITHUB_CLIENTS") {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|e| Error::env("GITHUB_CLIENTS", format!("not a JSON object: {e}")))?;
        for (id, secret) in map {
            let secret = secret.as_str().ok_or_else(|| {
                Error::env("GITHUB_CLIENTS", format!("secret for {id} is not a string"))
            })?;
            registry.insert(id, Secret::new(secret.to_string()));
        }
    }

    if let (Ok(id), Ok(secret)) = (
        std::env::var("GITHUB_CLIENT_ID"),
        std::env::var("GITHUB_CLIENT_SECRET"),
    ) {
        registry.insert(id, Secret::new(secret));
    }

    Ok(registry)
}
