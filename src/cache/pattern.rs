//! Endpoint path templates such as `/clients/{client_id}/payments`.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A path template. `{name}` segments match any single non-empty segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Values captured by `{name}` segments.
pub type Captures = HashMap<String, String>;

/// Splits a path into segments, dropping the query string, empty segments
/// and a trailing slash.
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Canonical form of a concrete path: leading slash, no trailing slash, no
/// query.
pub(crate) fn normalize_path(path: &str) -> String {
    let joined: Vec<&str> = path_segments(path).collect();
    format!("/{}", joined.join("/"))
}

impl EndpointPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments: Vec<Segment> = path_segments(pattern)
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => Segment::Param(name.to_owned()),
                    None => Segment::Literal(segment.to_owned()),
                }
            })
            .collect();

        Self {
            raw: normalize_path(pattern),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches a concrete path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let mut captures = Captures::new();
        let mut parts = path_segments(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    captures.insert(name.clone(), part.to_owned());
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }

    /// Substitutes captures into the template. `None` if one is missing.
    pub fn render(&self, captures: &Captures) -> Option<String> {
        let mut rendered = String::new();
        for segment in &self.segments {
            rendered.push('/');
            match segment {
                Segment::Literal(literal) => rendered.push_str(literal),
                Segment::Param(name) => rendered.push_str(captures.get(name)?),
            }
        }
        if rendered.is_empty() {
            rendered.push('/');
        }
        Some(rendered)
    }

    /// Whether every path this pattern matches lies at or under `prefix`.
    ///
    /// Parameters are treated as equivalent regardless of name.
    pub fn is_within(&self, prefix: &Self) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(outer, inner)| match (outer, inner) {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), _) => true,
                    (Segment::Literal(_), Segment::Param(_)) => false,
                })
    }

    /// Same shape as `other`: equal length and [`is_within`](Self::is_within).
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len() && self.is_within(other) && other.is_within(self)
    }
}

impl fmt::Display for EndpointPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
