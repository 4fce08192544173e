use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use b2c_core::{Account, CacheError, CacheKey, HomeAccountId, TokenCache, TokenResult};
use tracing::debug;

use crate::CacheSnapshot;

/// JSON file cache.
///
/// Every mutation rewrites a sibling temp file and renames it over the
/// cache, so readers see either the old or the new contents.
#[derive(Debug)]
pub struct FileTokenCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CacheSnapshot, CacheError> {
        if !self.path.exists() {
            return Ok(CacheSnapshot::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(io_error)?;
        CacheSnapshot::from_json(&contents)
    }

    fn store(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = snapshot.to_json()?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(io_error)?;
            restrict_permissions(&tmp_path)?;
            file.write_all(contents.as_bytes()).map_err(io_error)?;
            file.sync_all().map_err(io_error)?;
        }
        fs::rename(&tmp_path, &self.path).map_err(io_error)?;
        debug!(
            event = "token_cache_written",
            path = %self.path.display(),
            entries = snapshot.entries.len()
        );
        Ok(())
    }

    fn update<T>(&self, apply: impl FnOnce(&mut CacheSnapshot) -> T) -> Result<T, CacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.load()?;
        let value = apply(&mut snapshot);
        self.store(&snapshot)?;
        Ok(value)
    }
}

fn io_error(err: std::io::Error) -> CacheError {
    CacheError::Io {
        message: err.to_string(),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CacheError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_error)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CacheError> {
    Ok(())
}

impl TokenCache for FileTokenCache {
    fn get(&self, key: &CacheKey) -> Result<Option<TokenResult>, CacheError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.get(key))
    }

    fn put(&self, key: CacheKey, result: TokenResult) -> Result<(), CacheError> {
        self.update(|snapshot| snapshot.put(key, result))
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
