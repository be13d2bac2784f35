//! Service settings loaded from `STORE_*` environment variables

use anyhow::Context;
use serde::Deserialize;

const ENV_PREFIX: &str = "STORE";

/// Top-level service configuration.
///
/// Nested keys use a double underscore: `STORE_SERVER__PORT=8080`,
/// `STORE_JWT__SECRET=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub jwt: JwtSettings,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to build configuration")?;

        let settings: Settings = cfg
            .try_deserialize()
            .context("failed to deserialize configuration (is STORE_JWT__SECRET set?)")?;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3001
    }

    /// `host:port` for the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// Access token signing parameters
#[derive(Clone, Deserialize)]
pub struct JwtSettings {
    /// HS256 shared secret
    pub secret: String,
    /// Lifetime of issued access tokens, in seconds
    #[serde(default = "JwtSettings::default_access_token_expiry")]
    pub access_token_expiry: u64,
}

impl JwtSettings {
    fn default_access_token_expiry() -> u64 {
        900
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("access_token_expiry", &self.access_token_expiry)
            .finish()
    }
}
