#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

pub mod account;
pub mod authority;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod outcome;
pub mod policy;
pub mod token;

pub use crate::account::*;
pub use crate::authority::*;
pub use crate::cache::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::outcome::*;
pub use crate::policy::*;
pub use crate::token::*;
