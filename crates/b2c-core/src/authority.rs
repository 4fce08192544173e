use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Policy, PolicySet};

/// URL layout of a policy authority.
///
/// Providers have moved deployments between these layouts, so the shape is
/// configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityShape {
    /// `https://{instance}/tfp/{tenant}/{policy}`
    #[default]
    Tfp,
    /// `https://{instance}/{tenant}/{policy}`
    B2cLogin,
    /// `https://{instance}/te/{tenant}/{policy}`
    Te,
}

impl AuthorityShape {
    fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Tfp => Some("tfp"),
            Self::Te => Some("te"),
            Self::B2cLogin => None,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("malformed authority '{value}': {reason}")]
    Malformed { value: String, reason: &'static str },
    #[error("authority is not registered for this application: {0}")]
    Unknown(String),
}

impl AuthorityError {
    fn malformed(value: impl Into<String>, reason: &'static str) -> Self {
        Self::Malformed {
            value: value.into(),
            reason,
        }
    }
}

/// Canonical issuer + policy identifier used to acquire tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Authority {
    instance_host: String,
    tenant: String,
    policy: String,
    shape: AuthorityShape,
    canonical: String,
}

impl Authority {
    pub fn new(
        instance_host: &str,
        tenant: &str,
        policy: &str,
        shape: AuthorityShape,
    ) -> Result<Self, AuthorityError> {
        let instance_host = instance_host.trim().trim_end_matches('/');
        if instance_host.is_empty() || instance_host.contains(['/', '?', '#', '@']) {
            return Err(AuthorityError::malformed(instance_host, "invalid instance host"));
        }
        validate_segment(tenant, "invalid tenant segment")?;
        validate_segment(policy, "invalid policy segment")?;

        let raw = match shape.prefix() {
            Some(prefix) => format!("https://{instance_host}/{prefix}/{tenant}/{policy}"),
            None => format!("https://{instance_host}/{tenant}/{policy}"),
        };
        let url = Url::parse(&raw).map_err(|_| AuthorityError::malformed(&raw, "unparseable url"))?;
        let host_matches = url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(instance_host.split(':').next().unwrap_or_default()));
        if !host_matches {
            return Err(AuthorityError::malformed(&raw, "host changed while parsing"));
        }

        Ok(Self {
            instance_host: instance_host.to_string(),
            tenant: tenant.to_string(),
            policy: policy.to_string(),
            shape,
            canonical: url.as_str().to_string(),
        })
    }

    /// Parses a canonical authority URL in any supported shape.
    pub fn parse(raw: &str) -> Result<Self, AuthorityError> {
        let url = Url::parse(raw.trim()).map_err(|_| AuthorityError::malformed(raw, "unparseable url"))?;
        if url.scheme() != "https" {
            return Err(AuthorityError::malformed(raw, "authority must use https"));
        }
        let host = url
            .host_str()
            .ok_or_else(|| AuthorityError::malformed(raw, "missing host"))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            ["tfp", tenant, policy] => Self::new(&host, tenant, policy, AuthorityShape::Tfp),
            ["te", tenant, policy] => Self::new(&host, tenant, policy, AuthorityShape::Te),
            [tenant, policy] => Self::new(&host, tenant, policy, AuthorityShape::B2cLogin),
            _ => Err(AuthorityError::malformed(raw, "unexpected path layout")),
        }
    }

    #[must_use]
    pub fn instance_host(&self) -> &str {
        &self.instance_host
    }

    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    #[must_use]
    pub fn policy(&self) -> &str {
        &self.policy
    }

    #[must_use]
    pub fn shape(&self) -> AuthorityShape {
        self.shape
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.canonical)
    }

    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.canonical)
    }

    #[must_use]
    pub fn same_as(&self, other: &Authority) -> bool {
        self.canonical.eq_ignore_ascii_case(&other.canonical)
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl TryFrom<String> for Authority {
    type Error = AuthorityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Authority> for String {
    fn from(value: Authority) -> Self {
        value.canonical
    }
}

fn validate_segment(value: &str, reason: &'static str) -> Result<(), AuthorityError> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'));
    if valid {
        Ok(())
    } else {
        Err(AuthorityError::malformed(value, reason))
    }
}

/// Builds and caches per-policy authorities for one application.
///
/// The authorities of every configured policy form the application's known
/// authority set; acquisitions against anything else are rejected.
#[derive(Debug)]
pub struct AuthorityResolver {
    instance_host: String,
    tenant: String,
    shape: AuthorityShape,
    policies: PolicySet,
    resolved: Mutex<HashMap<(String, Policy), Authority>>,
}

impl AuthorityResolver {
    #[must_use]
    pub fn new(
        instance_host: impl Into<String>,
        tenant: impl Into<String>,
        shape: AuthorityShape,
        policies: PolicySet,
    ) -> Self {
        Self {
            instance_host: instance_host.into(),
            tenant: tenant.into(),
            shape,
            policies,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &crate::B2cConfig) -> Self {
        Self::new(
            config.instance_host.clone(),
            config.tenant.clone(),
            config.authority_shape,
            config.policies.clone(),
        )
    }

    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    #[must_use]
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn resolve(&self, tenant: &str, policy: Policy) -> Result<Authority, AuthorityError> {
        let key = (tenant.to_string(), policy);
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(authority) = resolved.get(&key) {
            return Ok(authority.clone());
        }
        let authority = Authority::new(
            &self.instance_host,
            tenant,
            self.policies.name(policy),
            self.shape,
        )?;
        tracing::debug!(
            event = "authority_resolved",
            policy = %policy,
            authority = %authority
        );
        resolved.insert(key, authority.clone());
        Ok(authority)
    }

    /// Resolves `policy` under the configured tenant.
    pub fn for_policy(&self, policy: Policy) -> Result<Authority, AuthorityError> {
        self.resolve(&self.tenant, policy)
    }

    pub fn known_authorities(&self) -> Result<Vec<Authority>, AuthorityError> {
        Policy::ALL
            .into_iter()
            .map(|policy| self.for_policy(policy))
            .collect()
    }

    pub fn ensure_known(&self, authority: &Authority) -> Result<Policy, AuthorityError> {
        for policy in Policy::ALL {
            if self.for_policy(policy)?.same_as(authority) {
                return Ok(policy);
            }
        }
        Err(AuthorityError::Unknown(authority.to_string()))
    }
}
