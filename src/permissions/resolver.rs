use super::overrides::normalize_tab;
use super::{OverrideTable, Role};

/// A tab whose visibility depends on role before overrides are consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Visible to owners only. Overrides cannot open or close it.
    OwnerOnly(String),
    /// Never visible to members. Admins and owners see it unless the
    /// override table explicitly denies it.
    HiddenFromMembers(String),
}

impl Gate {
    fn tab(&self) -> &str {
        match self {
            Self::OwnerOnly(tab) | Self::HiddenFromMembers(tab) => tab,
        }
    }
}

/// Decides whether a tab is visible, as a pure function of
/// (role, override table, tab name).
///
/// ```
/// use orgsession::{OverrideTable, PermissionResolver, Role};
///
/// let resolver = PermissionResolver::default();
/// let overrides = OverrideTable::new().with("billing", false);
///
/// assert!(!resolver.resolve(Role::Owner, &overrides, "billing"));
/// assert!(resolver.resolve(Role::Owner, &overrides, "organization"));
/// assert!(!resolver.resolve(Role::Admin, &overrides, "organization"));
/// ```
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    gates: Vec<Gate>,
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new("organization", "team")
    }
}

impl PermissionResolver {
    pub fn new(owner_tab: &str, team_tab: &str) -> Self {
        Self {
            gates: vec![
                Gate::OwnerOnly(normalize_tab(owner_tab)),
                Gate::HiddenFromMembers(normalize_tab(team_tab)),
            ],
        }
    }

    /// Adds a gate. A later gate for the same tab replaces the earlier one.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        let gate = match gate {
            Gate::OwnerOnly(tab) => Gate::OwnerOnly(normalize_tab(&tab)),
            Gate::HiddenFromMembers(tab) => Gate::HiddenFromMembers(normalize_tab(&tab)),
        };
        self.gates.retain(|existing| existing.tab() != gate.tab());
        self.gates.push(gate);
        self
    }

    pub fn resolve(&self, role: Role, overrides: &OverrideTable, tab: &str) -> bool {
        let tab = normalize_tab(tab);
        match self.gates.iter().find(|gate| gate.tab() == tab) {
            Some(Gate::OwnerOnly(_)) => role == Role::Owner,
            Some(Gate::HiddenFromMembers(_)) => {
                role.at_least(Role::Admin) && !overrides.is_denied(&tab)
            }
            None => !overrides.is_denied(&tab),
        }
    }

    /// Filters a navigation list down to the tabs `role` may see, keeping
    /// order.
    pub fn visible_tabs<'a>(
        &self,
        role: Role,
        overrides: &OverrideTable,
        tabs: &[&'a str],
    ) -> Vec<&'a str> {
        tabs.iter()
            .copied()
            .filter(|tab| self.resolve(role, overrides, tab))
            .collect()
    }
}
