//! HTTP front end for the Segura authorization engine.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use server::{SeguraServer, ServerBuilder, build_app};
