//! Playgate HTTP surface
//!
//! Thin axum handlers over the wallet engine and AML analyzer, behind the
//! auth, rate-limit and deadline middleware. This crate owns startup
//! configuration and the application context that wires every component
//! together.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifier;
pub mod response;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use routes::router;
pub use state::AppContext;
