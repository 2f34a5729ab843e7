//! In-memory directory backend for the Segura authorization engine.
//!
//! This crate implements every storage trait from `segura-authz` on top of
//! papaya lock-free hash maps. It backs the server when no database is
//! configured and is the reference backend for the engine's tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use segura_authz::{AuthorizationEngine, AuthzConfig, Directory};
//! use segura_authz_memory::InMemoryDirectory;
//!
//! let backend = Arc::new(InMemoryDirectory::new());
//! let engine = AuthorizationEngine::new(
//!     Directory::from_backend(backend.clone()),
//!     AuthzConfig::default(),
//! );
//! ```

mod directory;

pub use directory::{DEFAULT_AUDIT_RETENTION, InMemoryDirectory};

use std::sync::Arc;

use segura_authz::{AuthorizationEngine, AuthzConfig, Directory};

/// Creates an engine over a fresh in-memory directory, returning both.
#[must_use]
pub fn create_engine(config: AuthzConfig) -> (Arc<InMemoryDirectory>, AuthorizationEngine) {
    let backend = Arc::new(InMemoryDirectory::new());
    let engine = AuthorizationEngine::new(Directory::from_backend(backend.clone()), config);
    (backend, engine)
}
