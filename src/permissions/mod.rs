//! Tab visibility.
//!
//! Visibility is resolved from the caller's role in the active organization
//! and that organization's [`OverrideTable`]. Navigation and page-load guards
//! both go through [`PermissionResolver`], so they cannot disagree.

mod overrides;
mod resolver;
mod role;

pub use overrides::OverrideTable;
pub(crate) use overrides::normalize_tab;
pub use resolver::{Gate, PermissionResolver};
pub use role::Role;

/// Everything needed to gate tabs for the active organization.
///
/// Replaced wholesale on bootstrap, organization switch and navigation
/// refresh; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSnapshot {
    pub org_id: Option<i64>,
    pub role: Role,
    pub overrides: OverrideTable,
}

impl AccessSnapshot {
    pub fn new(org_id: Option<i64>, role: Role, overrides: OverrideTable) -> Self {
        Self {
            org_id,
            role,
            overrides,
        }
    }

    pub fn can_view(&self, resolver: &PermissionResolver, tab: &str) -> bool {
        resolver.resolve(self.role, &self.overrides, tab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_delegates_to_resolver() {
        let resolver = PermissionResolver::default();
        let snapshot = AccessSnapshot::new(
            Some(1),
            Role::Admin,
            OverrideTable::new().with("team", false),
        );

        assert!(!snapshot.can_view(&resolver, "team"));
        assert!(snapshot.can_view(&resolver, "clients"));
        assert!(!snapshot.can_view(&resolver, "organization"));
    }
}
