//! Canonical resource paths and resource-type inference.
//!
//! A concrete path such as `/v3/apps/3fa85f64-5717-4562-b3fc-2c963f66afa6/web`
//! is reduced to `/v3/apps/:guid/:type`, which is then used both as a
//! deduplication key for the crawl and as the relation label on graph edges.

use crate::error::{Result, ScanError};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

pub const GUID_PLACEHOLDER: &str = ":guid";
pub const TYPE_PLACEHOLDER: &str = ":type";

const GUID_PATTERN: &str =
    r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$";

/// Default type-discriminator literals, e.g. the `web` process type in
/// `/v3/apps/:guid/processes/web`.
pub const DEFAULT_TYPE_LITERALS: &[&str] = &["web"];

/// A path with identifier and type-discriminator segments replaced by
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_placeholder(segment: &str) -> bool {
    segment == GUID_PLACEHOLDER || segment == TYPE_PLACEHOLDER
}

/// Owns the identifier pattern and the set of type-discriminator literals.
/// Build one per run and share it by reference.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    guid: Regex,
    type_literals: BTreeSet<String>,
}

impl PathNormalizer {
    pub fn new() -> Result<Self> {
        Self::with_type_literals(DEFAULT_TYPE_LITERALS.iter().copied())
    }

    pub fn with_type_literals<I, S>(literals: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            guid: Regex::new(GUID_PATTERN)?,
            type_literals: literals
                .into_iter()
                .map(Into::into)
                .filter(|literal: &String| !literal.is_empty())
                .collect(),
        })
    }

    pub fn type_literals(&self) -> impl Iterator<Item = &str> {
        self.type_literals.iter().map(String::as_str)
    }

    /// Replace identifier segments with `:guid` and type-discriminator
    /// segments with `:type`. Segment boundaries and empty segments are kept
    /// as they are, so `normalize(normalize(p)) == normalize(p)`.
    pub fn normalize(&self, path: &str) -> CanonicalPath {
        let canonical = path
            .split('/')
            .map(|segment| {
                if self.guid.is_match(segment) {
                    GUID_PLACEHOLDER
                } else if self.type_literals.contains(segment) {
                    TYPE_PLACEHOLDER
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/");
        CanonicalPath(canonical)
    }

    /// The resource type is the last segment that is neither a placeholder
    /// nor empty.
    pub fn infer_resource_type(&self, canonical: &CanonicalPath) -> Result<String> {
        canonical
            .segments()
            .filter(|segment| !segment.is_empty() && !is_placeholder(segment))
            .last()
            .map(str::to_string)
            .ok_or_else(|| ScanError::EmptyResourceName(canonical.to_string()))
    }

    /// Normalize and infer in one step.
    pub fn resolve(&self, path: &str) -> Result<(CanonicalPath, String)> {
        let canonical = self.normalize(path);
        let resource = self.infer_resource_type(&canonical)?;
        Ok((canonical, resource))
    }
}
