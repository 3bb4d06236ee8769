//! ACL condition matching.
//!
//! # Responsibilities
//! - Match host (exact match, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Match header value (case-insensitive name, exact value)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Matchers are pure: same attributes, same answer, no side effects
//! - No regex to guarantee O(n) matching
//! - Each matcher can describe itself as a native ACL fetch expression

use crate::config::AclRuleConfig;
use crate::routing::request::RequestAttributes;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestAttributes) -> bool;

    /// Native ACL expression, e.g. `path_beg /api`.
    fn condition(&self) -> String;

    /// One expression per ACL line; a rule matches when all of them do.
    fn conditions(&self) -> Vec<String> {
        vec![self.condition()]
    }
}

/// Matches the Host attribute.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        req.host
            .as_deref()
            .map(|h| h.to_lowercase() == self.expected_host)
            .unwrap_or(false)
    }

    fn condition(&self) -> String {
        format!("hdr(host) -i {}", self.expected_host)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        req.path.starts_with(&self.prefix)
    }

    fn condition(&self) -> String {
        format!("path_beg {}", self.prefix)
    }
}

/// Matches an exact header value.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: String,
    value: String,
}

impl HeaderMatcher {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        req.header(&self.name) == Some(self.value.as_str())
    }

    fn condition(&self) -> String {
        format!("hdr({}) {}", self.name, self.value)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }

    fn condition(&self) -> String {
        self.matchers
            .iter()
            .map(|m| m.condition())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn conditions(&self) -> Vec<String> {
        self.matchers.iter().flat_map(|m| m.conditions()).collect()
    }
}

/// Compile the conditions of a rule into one matcher.
///
/// A single condition compiles to itself; several are joined with AND.
pub fn compile(rule: &AclRuleConfig) -> Box<dyn Matcher> {
    let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
    if let Some(host) = &rule.host {
        matchers.push(Box::new(HostMatcher::new(host)));
    }
    if let Some(prefix) = &rule.path_prefix {
        matchers.push(Box::new(PathPrefixMatcher::new(prefix)));
    }
    if let Some(header) = &rule.header {
        matchers.push(Box::new(HeaderMatcher::new(&header.name, &header.value)));
    }

    if matchers.len() == 1 {
        matchers.remove(0)
    } else {
        Box::new(AndMatcher::new(matchers))
    }
}
