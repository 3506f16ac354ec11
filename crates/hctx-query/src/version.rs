//! Version token resolution.
//!
//! Every read path addresses a version the same way:
//! - empty or `stable` (any case) → the project's stable version
//! - `draft` (any case) → the most recently created draft
//! - anything else → a concrete version id of the project

use tracing::debug;

use hctx_core::error::{HctxError, Result};
use hctx_core::scope::RequestScope;
use hctx_core::store::KnowledgeStore;
use hctx_core::version::Version;

/// A logical version address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionToken {
    Stable,
    Draft,
    Id(String),
}

impl VersionToken {
    /// Interpret a raw token. `None` and blank tokens mean stable.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let token = raw.map(str::trim).unwrap_or_default();
        if token.is_empty() || token.eq_ignore_ascii_case("stable") {
            Self::Stable
        } else if token.eq_ignore_ascii_case("draft") {
            Self::Draft
        } else {
            Self::Id(token.to_string())
        }
    }
}

/// Resolve a version token to the concrete version.
///
/// # Errors
///
/// Returns [`HctxError::NotFound`] ("No stable version", "No draft version",
/// or "Version not found") when nothing matches, and store errors as-is.
pub fn resolve_version<S>(store: &S, scope: &RequestScope, token: Option<&str>) -> Result<Version>
where
    S: KnowledgeStore + ?Sized,
{
    let project_id = scope.project_id.as_str();
    let token = VersionToken::parse(token);
    let resolved = match &token {
        VersionToken::Stable => store
            .stable_version(project_id)?
            .ok_or_else(|| HctxError::NotFound("No stable version".to_string()))?,
        VersionToken::Draft => store
            .latest_draft(project_id)?
            .ok_or_else(|| HctxError::NotFound("No draft version".to_string()))?,
        VersionToken::Id(id) => store
            .find_version(project_id, id)?
            .ok_or_else(|| HctxError::NotFound("Version not found".to_string()))?,
    };
    debug!(project_id, ?token, version_id = %resolved.id, "resolved version");
    Ok(resolved)
}

/// Resolve a version token to a version id.
///
/// # Errors
///
/// See [`resolve_version`].
pub fn resolve_version_id<S>(store: &S, scope: &RequestScope, token: Option<&str>) -> Result<String>
where
    S: KnowledgeStore + ?Sized,
{
    resolve_version(store, scope, token).map(|v| v.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;

    #[test]
    fn token_parsing() {
        assert_eq!(VersionToken::parse(None), VersionToken::Stable);
        assert_eq!(VersionToken::parse(Some(" ")), VersionToken::Stable);
        assert_eq!(VersionToken::parse(Some("STABLE")), VersionToken::Stable);
        assert_eq!(VersionToken::parse(Some("Draft")), VersionToken::Draft);
        assert_eq!(
            VersionToken::parse(Some(" 01ABC ")),
            VersionToken::Id("01ABC".to_string())
        );
    }

    #[test]
    fn stable_spellings_resolve_identically() {
        let fx = Fixture::new();
        for token in [None, Some(""), Some("STABLE"), Some("Stable"), Some("stable")] {
            let id = resolve_version_id(&fx.store, &fx.scope, token).unwrap();
            assert_eq!(id, fx.stable_id, "token {token:?}");
        }
    }

    #[test]
    fn draft_picks_most_recent_draft() {
        let fx = Fixture::new();
        let newer = fx.store.create_version(&fx.scope.project_id, None, None).unwrap();
        let id = resolve_version_id(&fx.store, &fx.scope, Some("draft")).unwrap();
        assert_eq!(id, newer.id);
        assert_ne!(id, fx.draft_id);
    }

    #[test]
    fn concrete_id_must_belong_to_project() {
        let fx = Fixture::new();
        let id = resolve_version_id(&fx.store, &fx.scope, Some(fx.draft_id.as_str())).unwrap();
        assert_eq!(id, fx.draft_id);

        let other = RequestScope::new(fx.store.create_project("Other").unwrap());
        let err = resolve_version_id(&fx.store, &other, Some(fx.draft_id.as_str())).unwrap_err();
        assert_eq!(err.to_string(), "Version not found");
    }

    #[test]
    fn missing_stable_and_draft_are_distinguished() {
        let fx = Fixture::new();
        let empty = RequestScope::new(fx.store.create_project("Empty").unwrap());
        let err = resolve_version_id(&fx.store, &empty, None).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No stable version");
        let err = resolve_version_id(&fx.store, &empty, Some("draft")).unwrap_err();
        assert_eq!(err.to_string(), "No draft version");
    }
}
