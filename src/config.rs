use std::env;

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// When unset the server keeps everything in memory
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    /// When unset any origin is allowed
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8080,
        };

        Ok(Self {
            mongodb_uri: lookup("MONGODB_URI").filter(|uri| !uri.is_empty()),
            database_name: lookup("MONGODB_DATABASE").unwrap_or_else(|| "GroupSplit".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.mongodb_uri, None);
        assert_eq!(config.database_name, "GroupSplit");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_allowed_origin, None);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("MONGODB_DATABASE", "ledger"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(
            config.mongodb_uri.as_deref(),
            Some("mongodb://localhost:27017")
        );
        assert_eq!(config.database_name, "ledger");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn empty_mongodb_uri_means_in_memory() {
        let config = config_from(&[("MONGODB_URI", "")]).unwrap();
        assert_eq!(config.mongodb_uri, None);
    }

    #[test]
    fn rejects_invalid_port() {
        assert_eq!(
            config_from(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort("http".to_string()))
        );
    }
}
