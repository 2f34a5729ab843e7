//! Startup wiring: directory backend selection and default data.

use std::sync::Arc;

use segura_authz::{AuthorizationEngine, Directory, Role, RoleKind};
use segura_authz_memory::InMemoryDirectory;
use segura_authz_postgres::PgDirectory;

use crate::config::{StorageBackend, StorageConfig};

/// Builds the directory for the configured backend.
///
/// For PostgreSQL this connects the pool and applies the embedded
/// migrations before returning.
pub async fn build_directory(cfg: &StorageConfig) -> anyhow::Result<Directory> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::info!(backend = "memory", "Using in-memory directory");
            Ok(Directory::from_backend(Arc::new(InMemoryDirectory::new())))
        }
        StorageBackend::Postgres => {
            let pg = &cfg.postgres;
            let directory = PgDirectory::connect(&pg.connection_url(), pg.pool_size).await?;
            directory.migrate().await?;
            tracing::info!(
                backend = "postgres",
                pool_size = pg.pool_size,
                "PostgreSQL directory ready"
            );
            Ok(Directory::from_backend(Arc::new(directory)))
        }
    }
}

/// Creates the Administrador, Broker and Vendedor roles.
///
/// Roles that already exist are left untouched. Returns how many were created.
pub async fn seed_default_roles(engine: &AuthorizationEngine) -> anyhow::Result<usize> {
    let mut created = 0;
    for kind in RoleKind::ALL {
        match engine.create_role(Role::from_kind(kind)).await {
            Ok(role) => {
                tracing::info!(role = %role.name, level = role.access_level, "Seeded role");
                created += 1;
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!(role = kind.as_str(), "Role already present");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segura_authz::AuthzConfig;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let directory = build_directory(&StorageConfig::default()).await.unwrap();
        let engine = AuthorizationEngine::new(directory, AuthzConfig::default());

        assert_eq!(seed_default_roles(&engine).await.unwrap(), 3);
        assert_eq!(seed_default_roles(&engine).await.unwrap(), 0);

        let roles = engine.list_active_roles().await.unwrap();
        assert_eq!(roles.total, 3);
    }
}
