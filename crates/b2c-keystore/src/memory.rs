use std::sync::{PoisonError, RwLock};

use b2c_core::{Account, CacheError, CacheKey, HomeAccountId, TokenCache, TokenResult};

use crate::CacheSnapshot;

/// Process-local cache, mostly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    state: RwLock<CacheSnapshot>,
}

impl MemoryTokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self, key: &CacheKey) -> Result<Option<TokenResult>, CacheError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.get(key))
    }

    fn put(&self, key: CacheKey, result: TokenResult) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.put(key, result);
        Ok(())
    }

    fn remove(&self, account_id: &HomeAccountId) -> Result<usize, CacheError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Ok(state.remove(account_id))
    }

    fn accounts(&self) -> Result<Vec<Account>, CacheError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.accounts())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use b2c_core::{Authority, ScopeSet};
    use chrono::{Duration, Utc};

    pub(crate) fn token(account_id: &str, policy: &str, access: &str) -> TokenResult {
        TokenResult {
            access_token: access.to_string(),
            expires_on: Utc::now() + Duration::hours(1),
            account: Account::new(account_id),
            scopes: ScopeSet::new(["demo.read"]),
            authority: Authority::parse(&format!(
                "https://login.microsoftonline.com/tfp/fabrikamb2c.onmicrosoft.com/{policy}"
            ))
            .expect("authority"),
            id_token: None,
            refresh_token: Some("refresh".to_string()),
        }
    }

    #[test]
    fn put_replaces_whole_entry() {
        let cache = MemoryTokenCache::new();
        let first = token("oid-b2c_1_susi.tid", "b2c_1_susi", "one");
        let key = first.cache_key();
        cache.put(key.clone(), first).expect("put");
        cache
            .put(key.clone(), token("oid-b2c_1_susi.tid", "b2c_1_susi", "two"))
            .expect("put");
        assert_eq!(cache.len(), 1);
        let stored = cache.get(&key).expect("get").expect("entry");
        assert_eq!(stored.access_token, "two");
    }

    #[test]
    fn remove_is_idempotent() {
        let cache = MemoryTokenCache::new();
        let result = token("oid-b2c_1_susi.tid", "b2c_1_susi", "one");
        let id = result.account.home_account_id.clone();
        cache.put(result.cache_key(), result).expect("put");
        assert_eq!(cache.remove(&id).expect("remove"), 1);
        assert_eq!(cache.remove(&id).expect("remove again"), 0);
        assert!(cache.accounts().expect("accounts").is_empty());
    }

    #[test]
    fn accounts_are_distinct_in_insertion_order() {
        let cache = MemoryTokenCache::new();
        for (id, policy) in [
            ("b-b2c_1_susi.tid", "b2c_1_susi"),
            ("a-b2c_1_edit_profile.tid", "b2c_1_edit_profile"),
            ("b-b2c_1_susi.tid", "b2c_1_susi"),
        ] {
            let mut result = token(id, policy, "x");
            result.scopes = ScopeSet::new([format!("{id}.scope")]);
            cache.put(result.cache_key(), result).expect("put");
        }
        let ids: Vec<String> = cache
            .accounts()
            .expect("accounts")
            .into_iter()
            .map(|account| account.home_account_id.to_string())
            .collect();
        assert_eq!(ids, vec!["b-b2c_1_susi.tid", "a-b2c_1_edit_profile.tid"]);
    }
}
