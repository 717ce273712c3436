//! Request descriptors and field matchers.
//!
//! A [`RequestDescriptor`] selects requests both when seeding simulations and
//! when querying the journal. Each field carries a list of [`FieldMatcher`]s,
//! all of which must accept the observed value. The same matching semantics
//! run client-side over journal entries, so verification counts do not depend
//! on the server version's search filtering.

use crate::journal::ObservedRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field matching operation, in control-API wire form
/// (`{"matcher": "glob", "value": "*.example.com"}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "matcher", content = "value", rename_all = "lowercase")]
pub enum FieldMatcher {
    /// Exact string equality.
    Exact(String),
    /// Wildcard match where `*` spans any run of characters.
    Glob(String),
    /// Regular expression match (unanchored).
    Regex(String),
}

/// Exact-match shorthand.
pub fn exact(value: impl Into<String>) -> FieldMatcher {
    FieldMatcher::Exact(value.into())
}

/// Glob-match shorthand.
pub fn glob(pattern: impl Into<String>) -> FieldMatcher {
    FieldMatcher::Glob(pattern.into())
}

/// Regex-match shorthand.
pub fn regex(pattern: impl Into<String>) -> FieldMatcher {
    FieldMatcher::Regex(pattern.into())
}

/// Matches any value.
pub fn any() -> FieldMatcher {
    FieldMatcher::Glob("*".into())
}

impl FieldMatcher {
    /// Evaluate this matcher against an observed value.
    ///
    /// An invalid regex or glob pattern never matches; descriptors are
    /// caller-built and a bad pattern should surface as a verification
    /// mismatch, not a panic inside test teardown.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FieldMatcher::Exact(expected) => expected == value,
            FieldMatcher::Glob(pattern) => match compile_glob(pattern) {
                Ok(re) => re.is_match(value),
                Err(_) => false,
            },
            FieldMatcher::Regex(pattern) => match Regex::new(pattern) {
                Ok(re) => re.is_match(value),
                Err(_) => false,
            },
        }
    }
}

/// Translate a glob pattern into an anchored regex, escaping everything but
/// the `*` wildcard.
fn compile_glob(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 4);
    expr.push('^');
    for (i, part) in pattern.split('*').enumerate() {
        if i > 0 {
            expr.push_str(".*");
        }
        expr.push_str(&regex::escape(part));
    }
    expr.push('$');
    Regex::new(&expr)
}

/// Matcher specification over an HTTP request, used to seed simulations and
/// to query/filter the journal. Immutable once built; construct through
/// [`RequestDescriptor::builder`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub method: Vec<FieldMatcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheme: Vec<FieldMatcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination: Vec<FieldMatcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<FieldMatcher>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, Vec<FieldMatcher>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<FieldMatcher>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<FieldMatcher>,
}

impl RequestDescriptor {
    pub fn builder() -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::default()
    }

    /// Check whether a journal entry's request satisfies every matcher in
    /// this descriptor. Fields without matchers are unconstrained.
    pub fn matches(&self, observed: &ObservedRequest) -> bool {
        if !all_match(&self.method, observed.method.as_deref()) {
            return false;
        }
        if !all_match(&self.scheme, observed.scheme.as_deref()) {
            return false;
        }
        if !all_match(&self.destination, observed.destination.as_deref()) {
            return false;
        }
        if !all_match(&self.path, observed.path.as_deref()) {
            return false;
        }
        if !all_match(&self.body, Some(observed.body.as_deref().unwrap_or(""))) {
            return false;
        }

        let observed_query = parse_query(observed.query.as_deref().unwrap_or(""));
        for (key, matchers) in &self.query {
            let Some(values) = observed_query.get(key) else {
                return false;
            };
            if !multi_value_match(matchers, values) {
                return false;
            }
        }

        for (key, matchers) in &self.headers {
            let Some(values) = observed.header_values(key) else {
                return false;
            };
            if !multi_value_match(matchers, &values) {
                return false;
            }
        }

        true
    }

    /// Render the descriptor for diagnostics in verification failures.
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "<descriptor>".into())
    }
}

/// All matchers must accept the observed value; a constrained field that was
/// never observed does not match.
fn all_match(matchers: &[FieldMatcher], value: Option<&str>) -> bool {
    if matchers.is_empty() {
        return true;
    }
    match value {
        Some(v) => matchers.iter().all(|m| m.matches(v)),
        None => false,
    }
}

/// Multi-valued fields (query params, headers): every matcher must accept at
/// least one of the observed values.
fn multi_value_match(matchers: &[FieldMatcher], values: &[String]) -> bool {
    matchers
        .iter()
        .all(|m| values.iter().any(|v| m.matches(v)))
}

/// Parse a raw query string (`a=1&b=two`) into a percent-decoded multimap.
fn parse_query(raw: &str) -> BTreeMap<String, Vec<String>> {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| key.to_string());
        let value = urlencoding::decode(value)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| value.to_string());
        params.entry(key).or_default().push(value);
    }
    params
}

/// Builder producing an immutable [`RequestDescriptor`].
#[derive(Debug, Default)]
pub struct RequestDescriptorBuilder {
    descriptor: RequestDescriptor,
}

impl RequestDescriptorBuilder {
    pub fn method(mut self, matcher: FieldMatcher) -> Self {
        self.descriptor.method.push(matcher);
        self
    }

    pub fn scheme(mut self, matcher: FieldMatcher) -> Self {
        self.descriptor.scheme.push(matcher);
        self
    }

    pub fn destination(mut self, matcher: FieldMatcher) -> Self {
        self.descriptor.destination.push(matcher);
        self
    }

    pub fn path(mut self, matcher: FieldMatcher) -> Self {
        self.descriptor.path.push(matcher);
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, matcher: FieldMatcher) -> Self {
        self.descriptor.query.entry(key.into()).or_default().push(matcher);
        self
    }

    pub fn header(mut self, key: impl Into<String>, matcher: FieldMatcher) -> Self {
        self.descriptor
            .headers
            .entry(key.into())
            .or_default()
            .push(matcher);
        self
    }

    pub fn body(mut self, matcher: FieldMatcher) -> Self {
        self.descriptor.body.push(matcher);
        self
    }

    pub fn build(self) -> RequestDescriptor {
        self.descriptor
    }
}
