pub mod app;
pub mod auth_handlers;
pub mod book_handlers;
pub mod config;
pub mod home_handlers;
pub mod metrics;
pub mod store;
pub mod telemetry;
pub mod tokens;

pub use app::{build_router, build_state, AppState};
