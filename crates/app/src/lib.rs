//! HTTP surface for uploading financial PDFs and asking questions about them.

pub mod config;
pub mod error;
pub mod routes;
pub mod schemas;
pub mod state;

pub use config::{Settings, VectorBackend};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
