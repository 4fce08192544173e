#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

pub mod broker;
mod guard;
pub mod resource;
pub mod session;
pub mod surface;

pub use crate::broker::{BrokerOptions, TokenBroker};
pub use crate::guard::InFlightPolicy;
pub use crate::resource::{ResourceClient, ResourceError};
pub use crate::session::{Session, SessionController};
pub use crate::surface::{
    InteractiveRequest, InteractiveSurface, Prompt, RefreshRequest, SurfaceError, TokenRefresher,
};
pub use tokio_util::sync::CancellationToken;
