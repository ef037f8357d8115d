use crate::config::ApiConfig;
use crate::map::{MapError, ResourceGraph};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use relmap_scanner::error::ScanError;
use relmap_scanner::path::CanonicalPath;
use relmap_scanner::{ApiClient, HttpApiClient, LinkExtractor, PathNormalizer};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Entry point of the primary API version.
pub const DEFAULT_ROOT_PATH: &str = "/v3";

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Cannot crawl root {path}: {source}")]
    RootUnreachable {
        path: String,
        #[source]
        source: ScanError,
    },

    #[error("Invalid root path {path}: {source}")]
    InvalidRoot {
        path: String,
        #[source]
        source: ScanError,
    },

    #[error("Resource graph invariant violated: {0}")]
    Map(#[from] MapError),

    #[error("Failed to set up crawl: {0}")]
    Setup(#[from] ScanError),
}

/// Callback receiving one line of the traversal trace per expanded path and
/// per discovered link.
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLink {
    pub source: String,
    pub href: String,
    pub reason: String,
}

/// What happened during a run, besides the graph itself.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub root: String,
    /// Canonical paths in the order they were expanded.
    pub visited: Vec<String>,
    /// Paths whose documents carried no links.
    pub leaves: Vec<String>,
    pub failures: Vec<CrawlFailure>,
    pub skipped: Vec<SkippedLink>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlSummary {
    pub fn new(root: &str) -> Self {
        let now = Utc::now();
        Self {
            root: root.to_string(),
            visited: Vec::new(),
            leaves: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub graph: ResourceGraph,
    pub summary: CrawlSummary,
}

/// A link scheduled for expansion.
struct Target {
    path: String,
    canonical: CanonicalPath,
    resource: String,
}

/// Followable links of one expanded path that have not been looked at yet.
struct Frame {
    pending: std::vec::IntoIter<Target>,
}

/// State owned by a single run and dropped when it ends.
struct CrawlRun {
    graph: ResourceGraph,
    visited: HashSet<CanonicalPath>,
    summary: CrawlSummary,
}

/// Depth-first crawler over the hypermedia links of an API.
///
/// Fetches are awaited one at a time, so the trace and the insertion order of
/// nodes and edges follow the link order of the API responses.
pub struct Crawler<C: ApiClient> {
    client: C,
    normalizer: PathNormalizer,
    extractor: LinkExtractor,
    progress_callback: Option<CrawlProgressCallback>,
}

impl<C: ApiClient> Crawler<C> {
    pub fn new(client: C, normalizer: PathNormalizer) -> Self {
        Self {
            client,
            normalizer,
            extractor: LinkExtractor::new(),
            progress_callback: None,
        }
    }

    pub fn with_extractor(mut self, extractor: LinkExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Crawl everything reachable from `root`.
    ///
    /// Only a failure at the root aborts the run; failures further down end
    /// their own branch and are listed in the summary.
    pub async fn crawl(&self, root: &str) -> Result<CrawlOutcome, CrawlError> {
        info!("Starting crawl of {}", root);

        let (canonical, resource) =
            self.normalizer
                .resolve(root)
                .map_err(|source| CrawlError::InvalidRoot {
                    path: root.to_string(),
                    source,
                })?;

        let mut run = CrawlRun {
            graph: ResourceGraph::new(),
            visited: HashSet::new(),
            summary: CrawlSummary::new(root),
        };

        let root_target = Target {
            path: root.to_string(),
            canonical,
            resource,
        };

        let mut stack = Vec::new();
        if let Some(frame) = self.expand(&mut run, root_target, true).await? {
            stack.push(frame);
        }

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let Some(target) = frame.pending.next() else {
                stack.pop();
                continue;
            };
            if run.visited.contains(&target.canonical) {
                continue;
            }
            if let Some(frame) = self.expand(&mut run, target, false).await? {
                stack.push(frame);
            }
        }

        run.summary.finished_at = Utc::now();
        info!(
            "Crawl complete. Expanded {} paths, found {} resources and {} relations",
            run.summary.visited.len(),
            run.graph.node_count(),
            run.graph.edge_count()
        );

        Ok(CrawlOutcome {
            graph: run.graph,
            summary: run.summary,
        })
    }

    /// Expand one path: record it, fetch it, add a node and edge for every
    /// link, and return the followable links as a new frame.
    async fn expand(
        &self,
        run: &mut CrawlRun,
        target: Target,
        is_root: bool,
    ) -> Result<Option<Frame>, CrawlError> {
        let Target {
            path,
            canonical,
            resource,
        } = target;

        self.report(format!("{} -- {}", canonical, resource));
        run.graph.add_node(&resource);
        run.summary.visited.push(canonical.to_string());
        run.visited.insert(canonical);

        let document = match self.client.fetch(&path).await {
            Ok(document) => document,
            Err(source) if is_root => return Err(CrawlError::RootUnreachable { path, source }),
            Err(e) => {
                warn!("Failed to fetch {}: {}", path, e);
                run.summary.failures.push(CrawlFailure {
                    path,
                    reason: e.to_string(),
                });
                return Ok(None);
            }
        };

        let links = match self.extractor.extract(&document) {
            Ok(links) => links,
            Err(e) => {
                info!("{} has no links", path);
                debug!("Leaf {}: {}", path, e);
                run.summary.leaves.push(path);
                return Ok(None);
            }
        };

        let mut pending = Vec::new();
        for link in links {
            let (link_canonical, link_resource) = match self.normalizer.resolve(&link.path) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Skipping link {} from {}: {}", link.href, path, e);
                    run.summary.skipped.push(SkippedLink {
                        source: path.clone(),
                        href: link.href,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            self.report(format!("    {} -- {}", link_canonical, link_resource));
            run.graph
                .add_tagged_node(&link_resource, link.is_primary_version());
            run.graph
                .add_edge(&resource, &link_resource, link_canonical.as_str())?;

            if link.is_followable() {
                pending.push(Target {
                    path: link.path,
                    canonical: link_canonical,
                    resource: link_resource,
                });
            } else {
                debug!(
                    "Not following {} ({} {})",
                    link.rel,
                    link.method.as_deref().unwrap_or("GET"),
                    link.href
                );
            }
        }

        Ok(Some(Frame {
            pending: pending.into_iter(),
        }))
    }

    fn report(&self, line: String) {
        debug!("{}", line);
        if let Some(ref callback) = self.progress_callback {
            callback(line);
        }
    }
}

/// Options for a crawl run against a live API.
pub struct CrawlOptions {
    pub config: ApiConfig,
    pub root: String,
    pub primary_version: String,
    pub type_literals: Vec<String>,
    pub download_markers: Vec<String>,
    pub timeout_secs: u64,
    pub show_progress_bars: bool,
}

/// Build the HTTP client and crawler from `options` and run a crawl.
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlOutcome, CrawlError> {
    let CrawlOptions {
        config,
        root,
        primary_version,
        type_literals,
        download_markers,
        timeout_secs,
        show_progress_bars,
    } = options;

    let client = HttpApiClient::with_timeout(config.base_url, &config.token, timeout_secs)?;
    let normalizer = PathNormalizer::with_type_literals(type_literals)?;
    let extractor = LinkExtractor::with_markers(primary_version, download_markers);

    // Set up a spinner for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let expanded = Arc::new(AtomicUsize::new(0));
    let pb_clone = progress_bar.clone();
    let expanded_clone = expanded.clone();
    let internal_callback: CrawlProgressCallback = Arc::new(move |line: String| {
        if let Some(ref pb) = pb_clone {
            if !line.starts_with(' ') {
                let count = expanded_clone.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_message(format!("Crawling... {} paths expanded", count));
            }
            pb.tick();
        }
        if let Some(ref callback) = progress_callback {
            match pb_clone {
                Some(ref pb) => pb.suspend(|| callback(line)),
                None => callback(line),
            }
        }
    });

    let crawler = Crawler::new(client, normalizer)
        .with_extractor(extractor)
        .with_progress_callback(internal_callback);

    let result = crawler.crawl(&root).await;

    if let Some(ref pb) = progress_bar {
        match result {
            Ok(ref outcome) => pb.finish_with_message(format!(
                "Crawl complete! {} paths expanded",
                outcome.summary.visited.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    result
}
