pub(crate) mod config;
pub(crate) mod console;
pub(crate) mod redirect;

pub(crate) use config::{load_config, open_cache};
pub(crate) use console::ConsoleSurface;
