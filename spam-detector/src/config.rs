use crate::error::{Result, SpamError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file looked up next to the binary's working directory
pub const DEFAULT_CONFIG_FILE: &str = "spam-detector.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, any origin when empty
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret_key: String,
    pub jwt_expiration_secs: u64,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Location of the persisted model artifact
    pub path: String,
    pub max_features: usize,
    pub alpha: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "dev_key_please_change_in_production".to_string(),
            jwt_expiration_secs: 86400, // 24 hours
            admin_name: "Admin User".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://spam_detection.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "spam_model.json".to_string(),
            max_features: 5000,
            alpha: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the optional TOML file, then
    /// `SPAM_*` environment variables, then the legacy variables
    /// (`SECRET_KEY`, `DATABASE_URL`, `JWT_EXPIRATION`, `PORT`).
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p.as_ref()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut cfg: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("SPAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SpamError::Config(e.to_string()))?;

        cfg.apply_legacy_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SpamError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply the environment variable names the service has always honoured
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(exp) = lookup("JWT_EXPIRATION") {
            self.auth.jwt_expiration_secs = exp
                .parse()
                .map_err(|_| SpamError::Config(format!("invalid JWT_EXPIRATION: {}", exp)))?;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| SpamError::Config(format!("invalid PORT: {}", port)))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.auth.secret_key.is_empty() {
            return Err(SpamError::Config("auth.secret_key must not be empty".into()));
        }
        if self.model.max_features == 0 {
            return Err(SpamError::Config("model.max_features must be positive".into()));
        }
        if !(self.model.alpha > 0.0 && self.model.alpha.is_finite()) {
            return Err(SpamError::Config("model.alpha must be a positive number".into()));
        }
        Ok(())
    }

    /// Socket address the API server binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.jwt_expiration_secs, 86400);
        assert_eq!(config.model.max_features, 5000);
        assert_eq!(config.model.path, "spam_model.json");
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 8080

            [model]
            path = "/var/lib/spam/model.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.path, "/var/lib/spam/model.json");
        assert_eq!(config.model.max_features, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let result = Config::from_toml_str("[model]\nalpha = 0.0\n");
        assert!(matches!(result, Err(SpamError::Config(_))));
    }

    #[test]
    fn test_legacy_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SECRET_KEY", "s3cret"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_EXPIRATION", "60"),
            ("PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_legacy_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.auth.secret_key, "s3cret");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.jwt_expiration_secs, 60);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_legacy_env_bad_port() {
        let mut config = Config::default();
        let result = config.apply_legacy_env(|k| (k == "PORT").then(|| "http".to_string()));
        assert!(result.is_err());
    }
}
