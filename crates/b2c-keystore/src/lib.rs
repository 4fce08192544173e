pub use b2c_core::TokenCache;

mod file;
mod memory;
mod snapshot;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod unsupported;

pub use file::FileTokenCache;
#[cfg(target_os = "macos")]
pub use macos::KeychainTokenCache;
pub use memory::MemoryTokenCache;
pub use snapshot::{CacheEntry, CacheSnapshot};
#[cfg(not(target_os = "macos"))]
pub use unsupported::KeychainTokenCache;
