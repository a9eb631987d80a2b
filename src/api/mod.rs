//! Browser-facing HTTP API
//!
//! Three stateless routes relay audio and text between the browser and the
//! provider: `/api/transcribe`, `/api/chat` and `/api/text-to-speech`.

pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use handlers::AppState;
pub use server::{create_router, serve};
