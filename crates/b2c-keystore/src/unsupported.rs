use b2c_core::{Account, CacheError, CacheKey, HomeAccountId, TokenCache, TokenResult};

/// Keychain cache placeholder for platforms without a supported keychain.
pub struct KeychainTokenCache;

impl KeychainTokenCache {
    pub fn new(_service: &str, _account: &str) -> Self {
        Self
    }
}

impl TokenCache for KeychainTokenCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<TokenResult>, CacheError> {
        Err(CacheError::Unsupported)
    }

    fn put(&self, _key: CacheKey, _result: TokenResult) -> Result<(), CacheError> {
        Err(CacheError::Unsupported)
    }

    fn remove(&self, _account_id: &HomeAccountId) -> Result<usize, CacheError> {
        Err(CacheError::Unsupported)
    }

    fn accounts(&self) -> Result<Vec<Account>, CacheError> {
        Err(CacheError::Unsupported)
    }
}
