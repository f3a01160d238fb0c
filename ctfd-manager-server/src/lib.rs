//! CTFd manager service: HTTP front door and setup wizard over the sync engine.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod setup;
pub mod state;

pub use config::{ConfigError, ManagerConfig};
pub use error::AppError;
pub use routes::router;
pub use setup::{SetupParams, SetupViolation, validate_setup};
pub use state::AppState;
