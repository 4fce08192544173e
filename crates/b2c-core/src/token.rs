use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, Authority, HomeAccountId};

/// Normalized scope set: trimmed, non-empty, sorted, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            scopes
                .into_iter()
                .map(|scope| scope.as_ref().trim().to_string())
                .filter(|scope| !scope.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains_all(&self, other: &ScopeSet) -> bool {
        other.0.is_subset(&self.0)
    }

    /// Space separated, as sent in an OAuth `scope` parameter.
    #[must_use]
    pub fn to_scope_string(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<ScopeSet> for Vec<String> {
    fn from(value: ScopeSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// A successful acquisition.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    pub expires_on: DateTime<Utc>,
    pub account: Account,
    pub scopes: ScopeSet,
    pub authority: Authority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResult {
    /// True when the token expires within `skew_seconds` of now.
    #[must_use]
    pub fn is_expired(&self, skew_seconds: i64) -> bool {
        Utc::now() + Duration::seconds(skew_seconds) >= self.expires_on
    }

    #[must_use]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.authority, &self.account.home_account_id, &self.scopes)
    }
}

impl std::fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .field("account", &self.account.home_account_id)
            .field("scopes", &self.scopes)
            .field("authority", &self.authority.as_str())
            .field("id_token_set", &self.id_token.is_some())
            .field("refresh_token_set", &self.refresh_token.is_some())
            .finish()
    }
}

/// Token cache key: authority canonical form, account id, sorted scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub authority: String,
    pub account_id: HomeAccountId,
    pub scopes: ScopeSet,
}

impl CacheKey {
    #[must_use]
    pub fn new(authority: &Authority, account_id: &HomeAccountId, scopes: &ScopeSet) -> Self {
        Self {
            authority: authority.as_str().to_ascii_lowercase(),
            account_id: account_id.clone(),
            scopes: scopes.clone(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.authority,
            self.account_id,
            self.scopes.to_scope_string()
        )
    }
}
