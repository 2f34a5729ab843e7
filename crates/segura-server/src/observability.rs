// Tracing initialization with a configurable and reloadable log level.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// How a requested log level was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    /// The filter was replaced.
    Applied,
    /// RUST_LOG is set and keeps priority.
    OverriddenByEnv,
    /// Tracing was not initialized through this module.
    NotInitialized,
}

pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    // Prefer RUST_LOG from env, otherwise use provided level string.
    let base_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .or_else(|| level_filter(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init();
}

/// Parses a level or directive list such as `info,segura_authz=debug`.
pub fn level_filter(level: &str) -> Result<EnvFilter, String> {
    EnvFilter::try_new(level).map_err(|e| format!("invalid log level '{level}': {e}"))
}

/// Apply a new logging level at runtime. RUST_LOG, when set, keeps priority.
pub fn apply_logging_level(level: &str) -> Result<LevelChange, String> {
    let filter = level_filter(level)?;
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::info!(requested = %level, "RUST_LOG is set; keeping its filter");
        return Ok(LevelChange::OverriddenByEnv);
    }
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return Ok(LevelChange::NotInitialized);
    };
    handle
        .modify(|f| *f = filter)
        .map_err(|e| format!("failed to reload log filter: {e}"))?;
    tracing::info!(level = %level, "log level applied");
    Ok(LevelChange::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter_accepts_directives() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("warn,segura_authz=debug").is_ok());
    }

    #[test]
    fn level_filter_rejects_unknown_levels() {
        let err = level_filter("segura_authz=loud").unwrap_err();
        assert!(err.contains("segura_authz=loud"));
        assert!(apply_logging_level("segura_authz=loud").is_err());
    }
}
