// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Runtime Configuration
//!
//! All configuration is read from the environment once, at startup, into a
//! typed [`AppConfig`]. A missing required variable fails process startup
//! with the variable's name instead of surfacing as a runtime error at
//! first use.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `APPWRITE_ENDPOINT` | Identity/document provider REST endpoint | `https://cloud.appwrite.io/v1` |
//! | `APPWRITE_PROJECT_ID` | Provider project ID | Required |
//! | `APPWRITE_API_KEY` | Server API key (admin scope) | Required |
//! | `APPWRITE_DATABASE_ID` | Database holding the directories | Required |
//! | `APPWRITE_USER_COLLECTION_ID` | User directory collection | Required |
//! | `APPWRITE_BANK_COLLECTION_ID` | Bank-account directory collection | Required |
//! | `PLAID_BASE_URL` | Aggregator API base URL | `https://sandbox.plaid.com` |
//! | `PLAID_CLIENT_ID` | Aggregator client ID | Required |
//! | `PLAID_SECRET` | Aggregator secret | Required |
//! | `PLAID_CLIENT_NAME` | Client name shown in the link UI | `Bankbridge` |
//! | `DWOLLA_BASE_URL` | Payment-rail API base URL | `https://api-sandbox.dwolla.com` |
//! | `DWOLLA_KEY` | Payment-rail OAuth client key | Required |
//! | `DWOLLA_SECRET` | Payment-rail OAuth client secret | Required |
//! | `SHAREABLE_ID_KEY` | HMAC key for shareable account IDs | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_APPWRITE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
const DEFAULT_PLAID_BASE_URL: &str = "https://sandbox.plaid.com";
const DEFAULT_PLAID_CLIENT_NAME: &str = "Bankbridge";
const DEFAULT_DWOLLA_BASE_URL: &str = "https://api-sandbox.dwolla.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable is missing or empty: {0}")]
    Missing(String),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

/// Identity provider and document store settings.
#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub user_collection_id: String,
    pub bank_collection_id: String,
}

/// Bank-data aggregator settings.
#[derive(Debug, Clone)]
pub struct PlaidConfig {
    pub base_url: String,
    pub client_id: String,
    pub secret: String,
    pub client_name: String,
}

/// Payment-rail provider settings.
#[derive(Debug, Clone)]
pub struct DwollaConfig {
    pub base_url: String,
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub appwrite: AppwriteConfig,
    pub plaid: PlaidConfig,
    pub dwolla: DwollaConfig,
    pub shareable_id_key: String,
}

impl AppConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Tests supply a map-backed lookup so they never touch process-wide
    /// environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let host = env.or_default("HOST", DEFAULT_HOST);
        let port = match env.optional("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT".to_string(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let appwrite = AppwriteConfig {
            endpoint: env.or_default("APPWRITE_ENDPOINT", DEFAULT_APPWRITE_ENDPOINT),
            project_id: env.required("APPWRITE_PROJECT_ID")?,
            api_key: env.required("APPWRITE_API_KEY")?,
            database_id: env.required("APPWRITE_DATABASE_ID")?,
            user_collection_id: env.required("APPWRITE_USER_COLLECTION_ID")?,
            bank_collection_id: env.required("APPWRITE_BANK_COLLECTION_ID")?,
        };

        let plaid = PlaidConfig {
            base_url: env.or_default("PLAID_BASE_URL", DEFAULT_PLAID_BASE_URL),
            client_id: env.required("PLAID_CLIENT_ID")?,
            secret: env.required("PLAID_SECRET")?,
            client_name: env.or_default("PLAID_CLIENT_NAME", DEFAULT_PLAID_CLIENT_NAME),
        };

        let dwolla = DwollaConfig {
            base_url: env.or_default("DWOLLA_BASE_URL", DEFAULT_DWOLLA_BASE_URL),
            key: env.required("DWOLLA_KEY")?,
            secret: env.required("DWOLLA_SECRET")?,
        };

        Ok(Self {
            host,
            port,
            appwrite,
            plaid,
            dwolla,
            shareable_id_key: env.required("SHAREABLE_ID_KEY")?,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name)
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("APPWRITE_PROJECT_ID", "proj_1"),
            ("APPWRITE_API_KEY", "key_1"),
            ("APPWRITE_DATABASE_ID", "db_1"),
            ("APPWRITE_USER_COLLECTION_ID", "users"),
            ("APPWRITE_BANK_COLLECTION_ID", "banks"),
            ("PLAID_CLIENT_ID", "plaid_id"),
            ("PLAID_SECRET", "plaid_secret"),
            ("DWOLLA_KEY", "dwolla_key"),
            ("DWOLLA_SECRET", "dwolla_secret"),
            ("SHAREABLE_ID_KEY", "hmac_key"),
        ])
    }

    fn lookup<'a>(env: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        |name| env.get(name).map(|v| v.to_string())
    }

    #[test]
    fn loads_with_defaults_for_optional_values() {
        let env = full_env();
        let config = AppConfig::from_lookup(lookup(&env)).expect("config should load");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.appwrite.endpoint, "https://cloud.appwrite.io/v1");
        assert_eq!(config.plaid.base_url, "https://sandbox.plaid.com");
        assert_eq!(config.plaid.client_name, "Bankbridge");
        assert_eq!(config.dwolla.base_url, "https://api-sandbox.dwolla.com");
        assert_eq!(config.shareable_id_key, "hmac_key");
    }

    #[test]
    fn missing_required_variable_names_the_variable() {
        let mut env = full_env();
        env.remove("APPWRITE_DATABASE_ID");

        let error = AppConfig::from_lookup(lookup(&env)).expect_err("load should fail");
        assert!(error.to_string().contains("APPWRITE_DATABASE_ID"));
    }

    #[test]
    fn blank_required_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert("PLAID_SECRET", "   ");

        let error = AppConfig::from_lookup(lookup(&env)).expect_err("load should fail");
        assert!(matches!(error, ConfigError::Missing(name) if name == "PLAID_SECRET"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut env = full_env();
        env.insert("PORT", "not-a-port");

        let error = AppConfig::from_lookup(lookup(&env)).expect_err("load should fail");
        assert!(matches!(error, ConfigError::Invalid { name, .. } if name == "PORT"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut env = full_env();
        env.insert("PORT", "9090");
        env.insert("PLAID_BASE_URL", "https://development.plaid.com");

        let config = AppConfig::from_lookup(lookup(&env)).expect("config should load");
        assert_eq!(config.port, 9090);
        assert_eq!(config.plaid.base_url, "https://development.plaid.com");
    }
}
