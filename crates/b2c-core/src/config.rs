use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{
    DEFAULT_INSTANCE_HOST, DEFAULT_RESOURCE_TIMEOUT_SECONDS, REFRESH_SKEW_SECONDS,
};
use crate::{AuthorityShape, PolicySet, ScopeSet};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("config read failed ({path}): {message}")]
    Read { path: String, message: String },
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid config: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Static application registration for one B2C tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct B2cConfig {
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_instance_host")]
    pub instance_host: String,
    #[serde(default)]
    pub authority_shape: AuthorityShape,
    #[serde(default)]
    pub policies: PolicySet,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default = "default_refresh_skew_seconds")]
    pub refresh_skew_seconds: i64,
}

impl Default for B2cConfig {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            client_id: String::new(),
            redirect_uri: String::new(),
            instance_host: default_instance_host(),
            authority_shape: AuthorityShape::default(),
            policies: PolicySet::default(),
            scopes: Vec::new(),
            api_endpoint: None,
            timeouts: TimeoutConfig::default(),
            refresh_skew_seconds: default_refresh_skew_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Upper bound for an interactive prompt; unbounded when unset.
    #[serde(default)]
    pub interactive_seconds: Option<u64>,
    #[serde(default = "default_resource_seconds")]
    pub resource_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            interactive_seconds: None,
            resource_seconds: default_resource_seconds(),
        }
    }
}

fn default_instance_host() -> String {
    DEFAULT_INSTANCE_HOST.to_string()
}

fn default_refresh_skew_seconds() -> i64 {
    REFRESH_SKEW_SECONDS
}

fn default_resource_seconds() -> u64 {
    DEFAULT_RESOURCE_TIMEOUT_SECONDS
}

impl B2cConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads a YAML file and applies `B2C_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let mut config = Self::from_yaml_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("B2C_TENANT") {
            self.tenant = value.trim().to_string();
        }
        if let Some(value) = lookup("B2C_CLIENT_ID") {
            self.client_id = value.trim().to_string();
        }
        if let Some(value) = lookup("B2C_REDIRECT_URI") {
            self.redirect_uri = value.trim().to_string();
        }
        if let Some(value) = lookup("B2C_INSTANCE_HOST") {
            self.instance_host = value.trim().to_string();
        }
        if let Some(value) = lookup("B2C_AUTHORITY_SHAPE") {
            if let Some(shape) = parse_authority_shape(&value) {
                self.authority_shape = shape;
            } else {
                warn!(event = "config_invalid", field = "B2C_AUTHORITY_SHAPE", value = %value);
            }
        }
        if let Some(value) = lookup("B2C_API_ENDPOINT") {
            let value = value.trim();
            self.api_endpoint = (!value.is_empty()).then(|| value.to_string());
        }
        if let Some(value) = lookup("B2C_SCOPES") {
            self.scopes = value
                .split([',', ' '])
                .map(str::trim)
                .filter(|scope| !scope.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("B2C_REFRESH_SKEW_SECONDS") {
            match value.trim().parse::<i64>() {
                Ok(seconds) if seconds >= 0 => self.refresh_skew_seconds = seconds,
                _ => warn!(
                    event = "config_invalid",
                    field = "B2C_REFRESH_SKEW_SECONDS",
                    value = %value
                ),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenant.trim().is_empty() {
            return Err(ConfigError::invalid("tenant", "must not be empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::invalid("client_id", "must not be empty"));
        }
        if self.instance_host.trim().is_empty() {
            return Err(ConfigError::invalid("instance_host", "must not be empty"));
        }
        let mut seen: Vec<String> = Vec::new();
        for (policy, name) in self.policies.iter() {
            let normalized = name.trim().to_ascii_lowercase();
            if normalized.is_empty() {
                return Err(ConfigError::invalid("policies", format!("{policy} is empty")));
            }
            if seen.contains(&normalized) {
                return Err(ConfigError::invalid(
                    "policies",
                    format!("{name} is configured for more than one policy"),
                ));
            }
            seen.push(normalized);
        }
        if self.scope_set().is_empty() {
            return Err(ConfigError::invalid("scopes", "at least one scope is required"));
        }
        if let Some(endpoint) = self.api_endpoint.as_deref() {
            let parsed = url::Url::parse(endpoint)
                .map_err(|err| ConfigError::invalid("api_endpoint", err.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::invalid("api_endpoint", "must be an http(s) url"));
            }
        }
        if self.refresh_skew_seconds < 0 {
            return Err(ConfigError::invalid("refresh_skew_seconds", "must not be negative"));
        }
        Ok(())
    }

    #[must_use]
    pub fn scope_set(&self) -> ScopeSet {
        ScopeSet::new(&self.scopes)
    }

    #[must_use]
    pub fn interactive_timeout(&self) -> Option<Duration> {
        self.timeouts.interactive_seconds.map(Duration::from_secs)
    }

    #[must_use]
    pub fn resource_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.resource_seconds.max(1))
    }
}

fn parse_authority_shape(value: &str) -> Option<AuthorityShape> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "tfp" => Some(AuthorityShape::Tfp),
        "b2c_login" | "b2clogin" => Some(AuthorityShape::B2cLogin),
        "te" => Some(AuthorityShape::Te),
        _ => None,
    }
}
