use crate::{Account, CacheError, CacheKey, HomeAccountId, TokenResult};

/// Durable token storage.
///
/// `put` replaces an entry as a whole; implementations must never expose a
/// partially written entry. `accounts` lists each distinct account once, in
/// the order it was first stored.
pub trait TokenCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<TokenResult>, CacheError>;
    fn put(&self, key: CacheKey, result: TokenResult) -> Result<(), CacheError>;
    /// Removes every entry of `account_id`; returns how many were removed.
    fn remove(&self, account_id: &HomeAccountId) -> Result<usize, CacheError>;
    fn accounts(&self) -> Result<Vec<Account>, CacheError>;
}
