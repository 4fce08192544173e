use std::sync::{Mutex, PoisonError};

use b2c_core::{Account, CacheError, CacheKey, HomeAccountId, TokenCache, TokenResult};
use keyring::Entry;

use crate::CacheSnapshot;

/// Whole cache stored as one generic-password item in the login keychain.
pub struct KeychainTokenCache {
    service: String,
    account: String,
    lock: Mutex<()>,
}

impl KeychainTokenCache {
    pub fn new(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
            lock: Mutex::new(()),
        }
    }

    fn entry(&self) -> Result<Entry, CacheError> {
        Entry::new(&self.service, &self.account).map_err(|err| CacheError::Backend {
            message: err.to_string(),
        })
    }

    fn load(&self) -> Result<CacheSnapshot, CacheError> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(value) => CacheSnapshot::from_json(&value),
            Err(keyring::Error::NoEntry) => Ok(CacheSnapshot::default()),
            Err(err) => Err(CacheError::Backend {
                message: err.to_string(),
            }),
        }
    }

    fn store(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        let entry = self.entry()?;
        if snapshot.entries.is_empty() {
            return match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(err) => Err(CacheError::Backend {
                    message: err.to_string(),
                }),
            };
        }
        entry
            .set_password(&snapshot.to_json()?)
            .map_err(|err| CacheError::Backend {
                message: err.to_string(),
            })
    }
}

impl TokenCache for KeychainTokenCache {
    fn get(&self, key: &CacheKey) -> Result<Option<TokenResult>, CacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.get(key))
    }

    fn put(&self, key: CacheKey, result: TokenResult) -> Result<(), CacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.load()?;
        snapshot.put(key, result);
        self.store(&snapshot)
    }

    fn remove(&self, account_id: &HomeAccountId) -> Result<usize, CacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.load()?;
        let removed = snapshot.remove(account_id);
        if removed > 0 {
            self.store(&snapshot)?;
        }
        Ok(removed)
    }

    fn accounts(&self) -> Result<Vec<Account>, CacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.accounts())
    }
}
