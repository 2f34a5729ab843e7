//! Grant existence checks.

use std::sync::Arc;

use crate::AuthzResult;
use crate::storage::GrantStorage;
use crate::types::Grant;

/// Answers "does this role hold a grant on this view?".
#[derive(Clone)]
pub struct GrantEvaluator {
    grants: Arc<dyn GrantStorage>,
}

impl GrantEvaluator {
    /// Creates an evaluator over a grant store.
    #[must_use]
    pub fn new(grants: Arc<dyn GrantStorage>) -> Self {
        Self { grants }
    }

    /// Checks for a grant on (role, view).
    ///
    /// With a permission id the exact triple must exist; without one any
    /// permission on the view counts.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn has_grant(
        &self,
        role_id: &str,
        view_id: &str,
        permission_id: Option<&str>,
    ) -> AuthzResult<bool> {
        match permission_id {
            Some(permission_id) => {
                self.grants
                    .grant_exists(&Grant::new(role_id, view_id, permission_id))
                    .await
            }
            None => self.grants.any_grant_exists(role_id, view_id).await,
        }
    }
}

impl std::fmt::Debug for GrantEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantEvaluator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InsertOutcome;
    use async_trait::async_trait;

    // Two grants: r1 holds p1 on v1, r2 holds nothing.
    struct FixedGrants(Vec<Grant>);

    #[async_trait]
    impl GrantStorage for FixedGrants {
        async fn grant_exists(&self, grant: &Grant) -> AuthzResult<bool> {
            Ok(self.0.contains(grant))
        }
        async fn any_grant_exists(&self, role_id: &str, view_id: &str) -> AuthzResult<bool> {
            Ok(self.0.iter().any(|g| g.is_for(role_id, view_id)))
        }
        async fn insert_grant(&self, _grant: &Grant) -> AuthzResult<InsertOutcome> {
            Ok(InsertOutcome::AlreadyExists)
        }
        async fn delete_grants(&self, _role_id: &str, _view_id: &str) -> AuthzResult<u64> {
            Ok(0)
        }
        async fn view_ids_with_permission(
            &self,
            role_id: &str,
            permission_id: &str,
        ) -> AuthzResult<Vec<String>> {
            Ok(self
                .0
                .iter()
                .filter(|g| g.role_id == role_id && g.permission_id == permission_id)
                .map(|g| g.view_id.clone())
                .collect())
        }
        async fn count_grants_for(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
            Ok(self.0.iter().filter(|g| g.is_for(role_id, view_id)).count() as u64)
        }
        async fn count_grants(&self) -> AuthzResult<u64> {
            Ok(self.0.len() as u64)
        }
    }

    fn evaluator() -> GrantEvaluator {
        GrantEvaluator::new(Arc::new(FixedGrants(vec![Grant::new("r1", "v1", "p1")])))
    }

    #[test]
    fn exact_permission_requires_the_triple() {
        let eval = evaluator();
        assert!(tokio_test::block_on(eval.has_grant("r1", "v1", Some("p1"))).unwrap());
        assert!(!tokio_test::block_on(eval.has_grant("r1", "v1", Some("p2"))).unwrap());
    }

    #[test]
    fn any_permission_counts_without_a_name() {
        let eval = evaluator();
        assert!(tokio_test::block_on(eval.has_grant("r1", "v1", None)).unwrap());
        assert!(!tokio_test::block_on(eval.has_grant("r2", "v1", None)).unwrap());
        assert!(!tokio_test::block_on(eval.has_grant("r1", "v2", None)).unwrap());
    }
}
