//! FinIntel gateway server.
//!
//! Loads configuration, wires the compliance-gated pipeline over SQLite and
//! the upstream provider, and exposes the gateway operations over HTTP.

pub mod app;
pub mod config;
pub mod error;
pub mod http;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
