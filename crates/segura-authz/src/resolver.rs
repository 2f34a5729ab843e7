//! View resolution for requested paths.
//!
//! Resolution is two-phase: an exact route lookup first, then the active
//! views are fetched once and matched in process against the hierarchical
//! patterns from [`crate::matcher`]. Nothing here depends on a store's
//! pattern-matching dialect.

use std::sync::Arc;

use crate::AuthzResult;
use crate::config::ResolverConfig;
use crate::matcher::route_patterns;
use crate::storage::ViewStorage;
use crate::types::View;

/// Finds the views that govern a requested path.
#[derive(Clone)]
pub struct ViewResolver {
    views: Arc<dyn ViewStorage>,
    generic_fallback: bool,
}

impl ViewResolver {
    /// Creates a resolver over a view store.
    #[must_use]
    pub fn new(views: Arc<dyn ViewStorage>, config: &ResolverConfig) -> Self {
        Self {
            views,
            generic_fallback: config.generic_fallback,
        }
    }

    /// Resolves `route` to the set of matching active views.
    ///
    /// An exact route match always wins, even over a more specific-looking
    /// wildcard. Otherwise the first pattern (most specific first) with any
    /// match decides the result. Returns an empty set when nothing matches.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn resolve_views(&self, route: &str) -> AuthzResult<Vec<View>> {
        let exact = self.views.find_active_views_by_route(route).await?;
        if !exact.is_empty() {
            tracing::trace!(route, matched = exact.len(), "route resolved by exact match");
            return Ok(exact);
        }

        let candidates = self.views.list_active_views().await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        for pattern in route_patterns(route) {
            if pattern.is_generic() && !self.generic_fallback {
                break;
            }
            let matched: Vec<View> = candidates
                .iter()
                .filter(|view| pattern.matches(&view.route))
                .cloned()
                .collect();
            if !matched.is_empty() {
                tracing::trace!(
                    route,
                    pattern = %pattern,
                    matched = matched.len(),
                    "route resolved by pattern"
                );
                return Ok(matched);
            }
        }

        Ok(Vec::new())
    }
}

impl std::fmt::Debug for ViewResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewResolver")
            .field("generic_fallback", &self.generic_fallback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthzError;
    use async_trait::async_trait;

    struct FixedViews(Vec<View>);

    #[async_trait]
    impl ViewStorage for FixedViews {
        async fn find_active_view(&self, view_id: &str) -> AuthzResult<Option<View>> {
            Ok(self.0.iter().find(|v| v.active && v.id == view_id).cloned())
        }

        async fn find_active_views_by_route(&self, route: &str) -> AuthzResult<Vec<View>> {
            Ok(self
                .0
                .iter()
                .filter(|v| v.active && v.route == route)
                .cloned()
                .collect())
        }

        async fn list_active_views(&self) -> AuthzResult<Vec<View>> {
            Ok(self.0.iter().filter(|v| v.active).cloned().collect())
        }

        async fn create_view(&self, _view: &View) -> AuthzResult<()> {
            Err(AuthzError::internal("read-only"))
        }

        async fn set_view_active(&self, _view_id: &str, _active: bool) -> AuthzResult<()> {
            Err(AuthzError::internal("read-only"))
        }
    }

    fn resolver(views: Vec<View>, generic_fallback: bool) -> ViewResolver {
        ViewResolver::new(
            Arc::new(FixedViews(views)),
            &ResolverConfig { generic_fallback },
        )
    }

    fn ids(views: &[View]) -> Vec<&str> {
        views.iter().map(|v| v.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_exact_match_wins() {
        let r = resolver(
            vec![
                View::new("Editar compania", "/companias/123/editar").with_id("a"),
                View::new("Companias", "/companias").with_id("b"),
            ],
            true,
        );
        let views = r.resolve_views("/companias/123/editar").await.unwrap();
        assert_eq!(ids(&views), ["a"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_parent_prefix() {
        let r = resolver(
            vec![
                View::new("Companias", "/companias").with_id("b"),
                View::new("Leads", "/leads").with_id("c"),
            ],
            true,
        );
        let views = r.resolve_views("/companias/123/editar").await.unwrap();
        assert_eq!(ids(&views), ["b"]);
    }

    #[tokio::test]
    async fn test_more_specific_prefix_is_tried_first() {
        let r = resolver(
            vec![
                View::new("Companias", "/companias").with_id("b"),
                View::new("Compania 123", "/companias/123").with_id("d"),
            ],
            true,
        );
        let views = r.resolve_views("/companias/123/editar").await.unwrap();
        assert_eq!(ids(&views), ["d"]);
    }

    #[tokio::test]
    async fn test_generic_fallback_matches_all_active_views() {
        let r = resolver(
            vec![
                View::new("Leads", "/leads").with_id("c"),
                View::new("Oculta", "/oculta").with_id("x").with_active(false),
            ],
            true,
        );
        let views = r.resolve_views("/no-existe").await.unwrap();
        assert_eq!(ids(&views), ["c"]);
    }

    #[tokio::test]
    async fn test_generic_fallback_disabled() {
        let r = resolver(vec![View::new("Leads", "/leads").with_id("c")], false);
        assert!(r.resolve_views("/no-existe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_views_resolves_to_empty() {
        let r = resolver(Vec::new(), true);
        assert!(r.resolve_views("/leads").await.unwrap().is_empty());
    }
}
