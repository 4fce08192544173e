use b2c_core::{Account, CacheError, CacheKey, HomeAccountId, TokenResult};
use serde::{Deserialize, Serialize};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub result: TokenResult,
}

/// Serialized cache contents shared by every backend.
///
/// Entries keep insertion order; replacing an entry keeps its position so
/// account enumeration stays stable across refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<CacheEntry>,
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: Vec::new(),
        }
    }
}

impl CacheSnapshot {
    pub fn from_json(contents: &str) -> Result<Self, CacheError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let snapshot: Self = serde_json::from_str(contents).map_err(|err| CacheError::Corrupt {
            message: err.to_string(),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::Corrupt {
                message: format!("unsupported cache version {}", snapshot.version),
            });
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, CacheError> {
        serde_json::to_string_pretty(self).map_err(|err| CacheError::Corrupt {
            message: err.to_string(),
        })
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<TokenResult> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| entry.result.clone())
    }

    pub fn put(&mut self, key: CacheKey, result: TokenResult) {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.result = result,
            None => self.entries.push(CacheEntry { key, result }),
        }
    }

    pub fn remove(&mut self, account_id: &HomeAccountId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.key.account_id != account_id);
        before - self.entries.len()
    }

    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = Vec::new();
        for entry in &self.entries {
            let account = &entry.result.account;
            match accounts
                .iter_mut()
                .find(|known| known.home_account_id == account.home_account_id)
            {
                // later entries carry fresher claims
                Some(known) => *known = account.clone(),
                None => accounts.push(account.clone()),
            }
        }
        accounts
    }
}
