//! Write -> invalidated reads.

use super::{EndpointPattern, Fingerprint, ReadCache};
use crate::transport::Method;

/// What a successful write invalidates.
///
/// Targets are templates; `{name}` placeholders are filled from the write
/// path's captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The endpoint itself and all of its parameter variants.
    Resource(String),
    /// The endpoint, its variants, and everything below it.
    Subtree(String),
}

impl Target {
    fn template(&self) -> &str {
        match self {
            Self::Resource(t) | Self::Subtree(t) => t,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvalidationRule {
    pub methods: Vec<Method>,
    pub write: EndpointPattern,
    pub targets: Vec<Target>,
}

/// The enumerable table pairing writes with the cached reads they
/// invalidate.
#[derive(Debug, Clone, Default)]
pub struct InvalidationTable {
    rules: Vec<InvalidationRule>,
}

impl InvalidationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        use Method::{Delete, Patch, Post, Put};
        use Target::{Resource, Subtree};

        Self::new()
            .rule(&[Post], "/clients", [Resource("/clients".into())])
            .rule(
                &[Put, Patch, Delete],
                "/clients/{client_id}",
                [
                    Resource("/clients".into()),
                    Subtree("/clients/{client_id}".into()),
                ],
            )
            .rule(
                &[Post],
                "/clients/{client_id}/payments",
                [Resource("/clients/{client_id}/payments".into())],
            )
            .rule(&[Post], "/funnels", [Resource("/funnels".into())])
            .rule(
                &[Put, Patch, Delete],
                "/funnels/{funnel_id}",
                [
                    Resource("/funnels".into()),
                    Subtree("/funnels/{funnel_id}".into()),
                ],
            )
            .rule(
                &[Post],
                "/integrations/{provider}/connect",
                [Resource("/integrations/status".into())],
            )
            .rule(
                &[Post],
                "/integrations/{provider}/disconnect",
                [Resource("/integrations/status".into())],
            )
            // a sync imports clients and payments from the provider
            .rule(
                &[Post],
                "/integrations/{provider}/sync",
                [
                    Resource("/integrations/status".into()),
                    Subtree("/clients".into()),
                ],
            )
            .rule(&[Post], "/payments/reconcile", [Subtree("/clients".into())])
    }

    #[must_use]
    pub fn rule(
        mut self,
        methods: &[Method],
        write: &str,
        targets: impl IntoIterator<Item = Target>,
    ) -> Self {
        self.rules.push(InvalidationRule {
            methods: methods.to_vec(),
            write: EndpointPattern::parse(write),
            targets: targets.into_iter().collect(),
        });
        self
    }

    pub fn rules(&self) -> &[InvalidationRule] {
        &self.rules
    }

    /// Concrete targets for a write to `path`, with placeholders filled in.
    pub fn targets_for(&self, method: Method, path: &str) -> Vec<Target> {
        let mut resolved = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.methods.contains(&method)) {
            let Some(captures) = rule.write.matches(path) else {
                continue;
            };
            for target in &rule.targets {
                let Some(concrete) = EndpointPattern::parse(target.template()).render(&captures)
                else {
                    log::warn!(
                        target: "orgsession::cache",
                        "msg=\"invalidation target has unbound placeholder\" write=\"{}\" target=\"{}\"",
                        rule.write,
                        target.template()
                    );
                    continue;
                };
                let target = match target {
                    Target::Resource(_) => Target::Resource(concrete),
                    Target::Subtree(_) => Target::Subtree(concrete),
                };
                if !resolved.contains(&target) {
                    resolved.push(target);
                }
            }
        }
        resolved
    }

    /// Removes the cached reads a successful write invalidates, within the
    /// organization scope the write was made in. Returns how many entries
    /// went.
    pub fn apply(&self, cache: &ReadCache, scope: Option<i64>, method: Method, path: &str) -> usize {
        let mut removed = 0;
        for target in self.targets_for(method, path) {
            let key = Fingerprint::endpoint_key(scope, target.template());
            removed += usize::from(cache.delete(&key));
            removed += cache.delete_by_prefix(&format!("{key}?"));
            if let Target::Subtree(_) = target {
                removed += cache.delete_by_prefix(&format!("{key}/"));
            }
        }

        if removed > 0 {
            log::debug!(
                target: "orgsession::cache",
                "msg=\"invalidated cached reads\" method={method} path=\"{path}\" removed={removed}"
            );
        }
        removed
    }

    /// Cacheable endpoints that no write in this table ever invalidates.
    pub fn uncovered<'a>(&self, endpoints: impl IntoIterator<Item = &'a EndpointPattern>) -> Vec<String> {
        endpoints
            .into_iter()
            .filter(|endpoint| !self.covers(endpoint))
            .map(|endpoint| endpoint.as_str().to_owned())
            .collect()
    }

    fn covers(&self, endpoint: &EndpointPattern) -> bool {
        self.rules
            .iter()
            .flat_map(|rule| &rule.targets)
            .any(|target| {
                let pattern = EndpointPattern::parse(target.template());
                match target {
                    Target::Resource(_) => endpoint.is_same_shape(&pattern),
                    Target::Subtree(_) => endpoint.is_within(&pattern),
                }
            })
    }
}
