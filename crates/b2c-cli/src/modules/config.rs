use std::path::{Path, PathBuf};
use std::sync::Arc;

use b2c_core::{B2cConfig, TokenCache};
use b2c_keystore::{FileTokenCache, KeychainTokenCache};
use tracing::debug;

const KEYCHAIN_SERVICE: &str = "b2c";
const KEYCHAIN_ACCOUNT: &str = "token_cache";

fn b2c_home() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("HOME is not set"))?;
    Ok(Path::new(&home).join(".b2c"))
}

/// Loads the explicit config file, or `~/.b2c/config.yaml` when present.
///
/// Without any file the configuration comes from `B2C_*` variables alone.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<B2cConfig> {
    if let Some(path) = path {
        return Ok(B2cConfig::load(path)?);
    }
    let path = b2c_home()?.join("config.yaml");
    if path.exists() {
        return Ok(B2cConfig::load(&path)?);
    }
    debug!(event = "config_default", path = %path.display());
    let mut config = B2cConfig::default();
    config.apply_env_overrides();
    Ok(config)
}

pub(crate) fn open_cache(
    path: Option<PathBuf>,
    keychain: bool,
) -> anyhow::Result<Arc<dyn TokenCache>> {
    if keychain {
        return Ok(Arc::new(KeychainTokenCache::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT)));
    }
    let path = match path {
        Some(path) => path,
        None => b2c_home()?.join("token_cache.json"),
    };
    Ok(Arc::new(FileTokenCache::new(path)))
}
