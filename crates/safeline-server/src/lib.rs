//! SafeLine Server - HTTP surface for the incident lifecycle
//!
//! - [`routes::api`]: the warp filter tree
//! - [`auth`]: bearer authentication seam
//! - [`state::AppState`]: composition root shared by handlers
//! - [`reply`]: `{data}` / `{error}` envelope and status mapping

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod auth;
mod handlers;
pub mod reply;
pub mod routes;
pub mod state;

pub use auth::{Authenticator, StaticAuthenticator};
pub use handlers::VideoQuery;
pub use routes::{api, handle_rejection, Unauthenticated};
pub use state::AppState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
