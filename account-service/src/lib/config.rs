use std::env;

use auth::JwtError;
use auth::TokenCodec;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    /// Absent means the in-memory credential store
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_ms: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_ms", &self.expiration_ms)
            .finish()
    }
}

impl JwtConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::milliseconds(self.expiration_ms)
    }

    /// Build the token codec for this configuration.
    ///
    /// # Errors
    /// * `WeakSecret` - Secret shorter than 32 bytes
    /// * `InvalidLifetime` - Non-positive expiration
    pub fn token_codec(&self) -> Result<TokenCodec, JwtError> {
        TokenCodec::new(self.secret.as_bytes(), self.lifetime())
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str, expiration_ms: i64) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            expiration_ms,
        }
    }

    #[test]
    fn test_token_codec_from_config() {
        let config = jwt("development_secret_key_at_least_32_bytes", 86_400_000);
        assert_eq!(config.lifetime(), Duration::hours(24));
        assert_eq!(config.token_codec().unwrap().lifetime(), Duration::hours(24));
    }

    #[test]
    fn test_token_codec_rejects_bad_config() {
        assert!(matches!(
            jwt("short", 1_000).token_codec(),
            Err(JwtError::WeakSecret { .. })
        ));
        assert_eq!(
            jwt("development_secret_key_at_least_32_bytes", 0)
                .token_codec()
                .err(),
            Some(JwtError::InvalidLifetime(0))
        );
    }

    #[test]
    fn test_environment_overrides_files() {
        let secret = "environment_secret_key_at_least_32_bytes";
        env::set_var("JWT__SECRET", secret);
        env::set_var("SERVER__HTTP_PORT", "9999");

        let loaded = Config::load();

        env::remove_var("JWT__SECRET");
        env::remove_var("SERVER__HTTP_PORT");

        let config = loaded.unwrap();
        assert_eq!(config.jwt.secret, secret);
        assert_eq!(config.server.http_port, 9999);
        assert_eq!(config.jwt.expiration_ms, 86_400_000);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = jwt("development_secret_key_at_least_32_bytes", 1_000);
        assert!(!format!("{:?}", config).contains("development_secret"));
    }
}
