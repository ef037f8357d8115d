use crate::document::{Document, RawLink};
use crate::error::{Result, ScanError};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_PRIMARY_VERSION: &str = "v3";
pub const DEFAULT_DOWNLOAD_MARKERS: &[&str] = &["download"];

/// A link discovered in an API document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Key the link was published under, e.g. `self` or `droplets`.
    pub rel: String,
    pub href: String,
    /// Path component of `href`.
    pub path: String,
    pub method: Option<String>,
    is_version_marked: bool,
    is_download: bool,
}

impl Link {
    /// GET or no method at all.
    pub fn is_readable(&self) -> bool {
        self.method
            .as_deref()
            .is_none_or(|method| method.eq_ignore_ascii_case("GET"))
    }

    pub fn is_primary_version(&self) -> bool {
        self.is_version_marked
    }

    pub fn is_download(&self) -> bool {
        self.is_download
    }

    /// Only followable links are fetched. Every link still becomes an edge.
    pub fn is_followable(&self) -> bool {
        self.is_readable() && self.is_primary_version() && !self.is_download()
    }
}

/// Extract the path component from an href. Absolute URLs are parsed;
/// anything else is treated as a path with its query and fragment dropped.
pub fn extract_url_path(href: &str) -> String {
    match Url::parse(href) {
        Ok(url) => {
            let path = url.path();
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        }
        Err(_) => href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Turns the link collection of a document into [`Link`]s.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    primary_version: String,
    download_markers: BTreeSet<String>,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self::with_markers(
            DEFAULT_PRIMARY_VERSION,
            DEFAULT_DOWNLOAD_MARKERS.iter().copied(),
        )
    }

    pub fn with_markers<I, S>(primary_version: impl Into<String>, download_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary_version: primary_version.into(),
            download_markers: download_markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn primary_version(&self) -> &str {
        &self.primary_version
    }

    /// Links are read from the document's own `links` object, falling back to
    /// the `links` of the last entry in `resources` for list responses.
    /// Returns [`ScanError::NoLinksFound`] when neither yields anything.
    pub fn extract(&self, document: &Document) -> Result<Vec<Link>> {
        let raw_links = document
            .links()
            .or_else(|| document.last_resource_links())
            .ok_or(ScanError::NoLinksFound)?;

        Ok(self.convert(raw_links))
    }

    fn convert(&self, raw_links: &Map<String, Value>) -> Vec<Link> {
        let mut links = Vec::with_capacity(raw_links.len());
        for (rel, value) in raw_links {
            match serde_json::from_value::<RawLink>(value.clone()) {
                Ok(raw) => links.push(self.link(rel, raw)),
                Err(e) => warn!("Skipping link '{}': {}", rel, e),
            }
        }
        debug!("Extracted {} links", links.len());
        links
    }

    fn link(&self, rel: &str, raw: RawLink) -> Link {
        let path = extract_url_path(&raw.href);
        let mut is_version_marked = false;
        let mut is_download = false;
        for segment in path.split('/') {
            is_version_marked |= segment == self.primary_version;
            is_download |= self.download_markers.contains(segment);
        }

        Link {
            rel: rel.to_string(),
            href: raw.href,
            path,
            method: raw.method,
            is_version_marked,
            is_download,
        }
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}
