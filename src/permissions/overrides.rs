use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ClientError;

/// Canonical tab name: trimmed, lowercase.
pub(crate) fn normalize_tab(tab: &str) -> String {
    tab.trim().to_ascii_lowercase()
}

/// Per-organization tab overrides, as served by `GET /users/tabs/access`.
///
/// A missing key means allowed; only an explicit `false` denies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, bool>", into = "HashMap<String, bool>")]
pub struct OverrideTable {
    tabs: HashMap<String, bool>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the backend's map. Non-boolean values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Decode` if the body is not an object.
    pub fn from_json(body: &Value) -> Result<Self, ClientError> {
        match body {
            Value::Object(map) => Ok(map
                .iter()
                .filter_map(|(tab, allowed)| allowed.as_bool().map(|allowed| (tab.as_str(), allowed)))
                .collect()),
            Value::Null => Ok(Self::new()),
            other => Err(ClientError::Decode(format!(
                "tab access must be an object, got {other}"
            ))),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.tabs
                .iter()
                .map(|(tab, allowed)| (tab.clone(), Value::Bool(*allowed)))
                .collect(),
        )
    }

    pub fn set(&mut self, tab: &str, allowed: bool) {
        self.tabs.insert(normalize_tab(tab), allowed);
    }

    #[must_use]
    pub fn with(mut self, tab: &str, allowed: bool) -> Self {
        self.set(tab, allowed);
        self
    }

    /// The explicit value for `tab`, if any.
    pub fn get(&self, tab: &str) -> Option<bool> {
        self.tabs.get(&normalize_tab(tab)).copied()
    }

    pub fn is_denied(&self, tab: &str) -> bool {
        self.get(tab) == Some(false)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, bool)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, bool)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (tab, allowed) in iter {
            table.set(tab, allowed);
        }
        table
    }
}

impl From<HashMap<String, bool>> for OverrideTable {
    fn from(map: HashMap<String, bool>) -> Self {
        map.iter().map(|(tab, allowed)| (tab.as_str(), *allowed)).collect()
    }
}

impl From<OverrideTable> for HashMap<String, bool> {
    fn from(table: OverrideTable) -> Self {
        table.tabs
    }
}
