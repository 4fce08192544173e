use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Policy, PolicySet};

/// Home account identifier as minted by the provider.
///
/// B2C embeds the policy in the object-id segment, e.g.
/// `<objectId>-b2c_1_susi.<tenantId>`, so the same person signed in under two
/// policies yields two distinct identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeAccountId(String);

impl HomeAccountId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the first `.`.
    #[must_use]
    pub fn object_segment(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(head, _)| head)
    }

    /// Text after the first `.`, if any.
    #[must_use]
    pub fn tenant_segment(&self) -> Option<&str> {
        self.0
            .split_once('.')
            .map(|(_, tail)| tail)
            .filter(|tail| !tail.is_empty())
    }
}

impl std::fmt::Display for HomeAccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HomeAccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub home_account_id: HomeAccountId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub id_token_claims: Map<String, Value>,
}

impl Account {
    #[must_use]
    pub fn new(home_account_id: impl Into<String>) -> Self {
        Self {
            home_account_id: HomeAccountId::new(home_account_id),
            display_name: None,
            id_token_claims: Map::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Username-like claim suitable for a login hint.
    #[must_use]
    pub fn login_hint(&self) -> Option<&str> {
        ["preferred_username", "email", "emails"]
            .iter()
            .find_map(|claim| match self.id_token_claims.get(*claim) {
                Some(Value::String(value)) => Some(value.as_str()),
                Some(Value::Array(values)) => values.first().and_then(Value::as_str),
                _ => None,
            })
            .or(self.display_name.as_deref())
    }
}

/// Structured form of a [`HomeAccountId`] decoded against the configured policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub object_id: String,
    pub policy: Policy,
    pub tenant_id: Option<String>,
}

/// Policy-aware view over cached accounts.
#[derive(Debug, Clone)]
pub struct AccountStore {
    policies: PolicySet,
}

impl AccountStore {
    #[must_use]
    pub fn new(policies: PolicySet) -> Self {
        Self { policies }
    }

    #[must_use]
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Decodes the policy carried by an account identifier.
    ///
    /// The object segment must end with a configured policy name (case
    /// insensitive). When several names match, the longest one wins so that a
    /// policy named `susi` never claims an account minted for `b2c_1_susi`.
    #[must_use]
    pub fn decode(&self, id: &HomeAccountId) -> Option<AccountKey> {
        let segment = id.object_segment().to_ascii_lowercase();
        let (policy, name) = self
            .policies
            .iter()
            .map(|(policy, name)| (policy, name.to_ascii_lowercase()))
            .filter(|(_, name)| !name.is_empty() && segment.ends_with(name.as_str()))
            .max_by_key(|(_, name)| name.len())?;
        let object_id = segment[..segment.len() - name.len()]
            .trim_end_matches('-')
            .to_string();
        Some(AccountKey {
            object_id,
            policy,
            tenant_id: id.tenant_segment().map(str::to_string),
        })
    }

    #[must_use]
    pub fn matches(&self, account: &Account, policy: Policy) -> bool {
        self.decode(&account.home_account_id)
            .is_some_and(|key| key.policy == policy)
    }

    /// First account minted under `policy`, in enumeration order.
    ///
    /// Duplicate matches are not an error; they are logged and the first one
    /// is returned.
    #[must_use]
    pub fn find_by_policy<'a>(
        &self,
        accounts: &'a [Account],
        policy: Policy,
    ) -> Option<&'a Account> {
        let mut matches = accounts.iter().filter(|account| self.matches(account, policy));
        let first = matches.next()?;
        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(
                event = "account_duplicate_policy_match",
                policy = %policy,
                selected = %first.home_account_id,
                ignored = extra
            );
        }
        Some(first)
    }

    #[must_use]
    pub fn accounts_for_policy<'a>(
        &self,
        accounts: &'a [Account],
        policy: Policy,
    ) -> Vec<&'a Account> {
        accounts
            .iter()
            .filter(|account| self.matches(account, policy))
            .collect()
    }

    /// Every policy-scoped record belonging to the same object id as `account`.
    #[must_use]
    pub fn related<'a>(&self, accounts: &'a [Account], account: &Account) -> Vec<&'a Account> {
        let Some(target) = self.decode(&account.home_account_id) else {
            return accounts
                .iter()
                .filter(|candidate| candidate.home_account_id == account.home_account_id)
                .collect();
        };
        accounts
            .iter()
            .filter(|candidate| {
                candidate.home_account_id == account.home_account_id
                    || self.decode(&candidate.home_account_id).is_some_and(|key| {
                        key.object_id == target.object_id && key.tenant_id == target.tenant_id
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AccountStore {
        AccountStore::new(PolicySet::default())
    }

    #[test]
    fn empty_list_has_no_match() {
        assert!(store().find_by_policy(&[], Policy::SignUpOrSignIn).is_none());
    }

    #[test]
    fn finds_account_by_policy_suffix() {
        let accounts = vec![
            Account::new("objectid1-b2c_1_edit_profile.tenantid"),
            Account::new("objectid1-b2c_1_susi.tenantid"),
        ];
        let found = store()
            .find_by_policy(&accounts, Policy::SignUpOrSignIn)
            .expect("match");
        assert_eq!(found.home_account_id.as_str(), "objectid1-b2c_1_susi.tenantid");
        let edit = store()
            .find_by_policy(&accounts, Policy::EditProfile)
            .expect("match");
        assert_eq!(
            edit.home_account_id.as_str(),
            "objectid1-b2c_1_edit_profile.tenantid"
        );
        assert!(store().find_by_policy(&accounts, Policy::ResetPassword).is_none());
    }

    #[test]
    fn suffix_match_ignores_case() {
        let accounts = vec![Account::new("ObjectId-B2C_1_SUSI.Tenant")];
        assert!(store()
            .find_by_policy(&accounts, Policy::SignUpOrSignIn)
            .is_some());
    }

    #[test]
    fn first_match_wins() {
        let accounts = vec![
            Account::new("stale-b2c_1_susi.oldtenant"),
            Account::new("fresh-b2c_1_susi.tenant"),
        ];
        let found = store()
            .find_by_policy(&accounts, Policy::SignUpOrSignIn)
            .expect("match");
        assert_eq!(found.home_account_id.as_str(), "stale-b2c_1_susi.oldtenant");
        assert_eq!(
            store()
                .accounts_for_policy(&accounts, Policy::SignUpOrSignIn)
                .len(),
            2
        );
    }

    #[test]
    fn policy_in_tenant_segment_does_not_match() {
        let accounts = vec![Account::new("objectid.b2c_1_susi")];
        assert!(store()
            .find_by_policy(&accounts, Policy::SignUpOrSignIn)
            .is_none());
    }

    #[test]
    fn decode_prefers_longest_policy_name() {
        let policies = PolicySet {
            sign_in: "susi".to_string(),
            edit_profile: "b2c_1_susi".to_string(),
            reset_password: "b2c_1_reset".to_string(),
        };
        let store = AccountStore::new(policies);
        let key = store
            .decode(&HomeAccountId::new("abc-b2c_1_susi.tid"))
            .expect("decode");
        assert_eq!(key.policy, Policy::EditProfile);
        assert_eq!(key.object_id, "abc");
        assert_eq!(key.tenant_id.as_deref(), Some("tid"));
    }

    #[test]
    fn related_collects_every_policy_record() {
        let accounts = vec![
            Account::new("oid-b2c_1_susi.tid"),
            Account::new("oid-b2c_1_edit_profile.tid"),
            Account::new("other-b2c_1_susi.tid"),
        ];
        let related = store().related(&accounts, &accounts[0]);
        assert_eq!(related.len(), 2);
    }

    #[test]
    fn login_hint_prefers_claims() {
        let mut account = Account::new("oid-b2c_1_susi.tid").with_display_name("Alice");
        assert_eq!(account.login_hint(), Some("Alice"));
        account.id_token_claims.insert(
            "emails".to_string(),
            Value::Array(vec![Value::String("alice@example.com".to_string())]),
        );
        assert_eq!(account.login_hint(), Some("alice@example.com"));
    }
}
