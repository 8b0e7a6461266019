//! e-Manifest client configuration.
//!
//! Read from the environment (a `.env` file is loaded first if present):
//!
//! | Variable                 | Default   |
//! |--------------------------|-----------|
//! | `EMANIFEST_ENV`          | `preprod` |
//! | `EMANIFEST_API_ID`       | (empty)   |
//! | `EMANIFEST_API_KEY`      | (empty)   |
//! | `EMANIFEST_TIMEOUT_SECS` | `10`      |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_VAR: &str = "EMANIFEST_ENV";
pub const API_ID_VAR: &str = "EMANIFEST_API_ID";
pub const API_KEY_VAR: &str = "EMANIFEST_API_KEY";
pub const TIMEOUT_VAR: &str = "EMANIFEST_TIMEOUT_SECS";

/// Request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Target RCRAInfo environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    Dev,
    #[default]
    Preprod,
    Prod,
}

impl Environment {
    /// Root of the REST API.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Dev => "https://rcrainfodev.com/rcrainfo",
            Self::Preprod => "https://rcrainfopreprod.epa.gov/rcrainfo",
            Self::Prod => "https://rcrainfo.epa.gov/rcrainfoprod",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Preprod => "preprod",
            Self::Prod => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "preprod" => Ok(Self::Preprod),
            "prod" => Ok(Self::Prod),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for [`crate::api::EManifestClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api_id: String,
    pub api_key: String,
    pub timeout: Duration,
}

// keep the key out of logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("environment", &self.environment)
            .field("api_id", &self.api_id)
            .field("api_key", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(environment: Environment, api_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            environment,
            api_id: api_id.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load from environment variables, reading `.env` first.
    ///
    /// Missing credentials are not an error here; the client reports them
    /// when it first needs to authenticate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup(ENV_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Environment::default(),
        };

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: TIMEOUT_VAR.to_string(),
                value,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(
            environment,
            lookup(API_ID_VAR).unwrap_or_default().trim(),
            lookup(API_KEY_VAR).unwrap_or_default().trim(),
        )
        .with_timeout(Duration::from_secs(timeout)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_id.is_empty() && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Preprod);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_full_config() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_VAR, "PROD"),
            (API_ID_VAR, " id-123 "),
            (API_KEY_VAR, "secret"),
            (TIMEOUT_VAR, "30"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.api_id, "id-123");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.has_credentials());
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(ENV_VAR, "staging")])),
            Err(ConfigError::InvalidEnvironment(_))
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_environment_urls() {
        assert_eq!(
            Environment::Dev.base_url(),
            "https://rcrainfodev.com/rcrainfo"
        );
        assert_eq!("preprod".parse::<Environment>().unwrap().to_string(), "preprod");
    }
}
