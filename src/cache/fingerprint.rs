use std::fmt;

use super::pattern::normalize_path;

/// Deterministic cache key for a read.
///
/// Format: `o<org>|<endpoint>[?k=v&...]`, parameters sorted by key then value.
/// A query written into `endpoint` itself is merged with `params`.
/// Reads made without an organization use the scope `o-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new<K, V>(scope: Option<i64>, endpoint: &str, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (path, inline) = endpoint.split_once('?').unwrap_or((endpoint, ""));
        let mut key = Self::endpoint_key(scope, path);

        let mut pairs: Vec<(&str, &str)> = inline
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .chain(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .collect();
        pairs.sort_unstable();

        if !pairs.is_empty() {
            let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            key.push('?');
            key.push_str(&query.join("&"));
        }

        Self(key)
    }

    /// Key of the parameterless read of `endpoint` in `scope`. Every
    /// parameterized variant starts with this followed by `?`.
    pub fn endpoint_key(scope: Option<i64>, endpoint: &str) -> String {
        format!("{}{}", Self::scope_prefix(scope), normalize_path(endpoint))
    }

    pub fn scope_prefix(scope: Option<i64>) -> String {
        match scope {
            Some(org_id) => format!("o{org_id}|"),
            None => "o-|".to_owned(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
