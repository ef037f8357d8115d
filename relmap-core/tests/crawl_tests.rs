// Tests for the crawl engine

use async_trait::async_trait;
use relmap_core::config::ApiConfig;
use relmap_core::crawl::{CrawlError, CrawlOptions, Crawler, DEFAULT_ROOT_PATH, execute_crawl};
use relmap_scanner::error::ScanError;
use relmap_scanner::{ApiClient, Document, LinkExtractor, PathNormalizer};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

const APP_GUID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const OTHER_APP_GUID: &str = "9b2d1c4e-0f3a-4d5b-8c7e-6a1f2e3d4c5b";
const DROPLET_GUID: &str = "c0ffee00-1234-4abc-9def-0123456789ab";

/// In-memory API: serves canned documents and records every fetch.
struct FakeApi {
    documents: HashMap<String, Value>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FakeApi {
    fn new(documents: Vec<(&str, Value)>) -> Self {
        Self {
            documents: documents
                .into_iter()
                .map(|(path, doc)| (path.to_string(), doc))
                .collect(),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn fetch(&self, path: &str) -> Result<Document, ScanError> {
        self.fetched.lock().unwrap().push(path.to_string());
        match self.documents.get(path) {
            Some(value) => Ok(Document::from_value(value.clone()).unwrap()),
            None => Err(ScanError::UnexpectedStatus {
                path: path.to_string(),
                status: 404,
            }),
        }
    }
}

fn crawler(api: FakeApi) -> (Crawler<FakeApi>, Arc<Mutex<Vec<String>>>) {
    let fetched = api.fetched.clone();
    let crawler = Crawler::new(api, PathNormalizer::new().unwrap());
    (crawler, fetched)
}

fn links(entries: &[(&str, &str)]) -> Value {
    let map: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(rel, href)| (rel.to_string(), json!({ "href": href })))
        .collect();
    json!({ "links": map })
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[tokio::test]
async fn test_apps_and_droplets_scenario() {
    let app = format!("/v3/apps/{}", APP_GUID);
    let droplet = format!("/v3/apps/{}/droplets/{}", APP_GUID, DROPLET_GUID);

    let api = FakeApi::new(vec![
        (
            "/v3",
            json!({"links": {"apps": {"href": "/v3/apps", "method": "GET"}}}),
        ),
        (
            "/v3/apps",
            json!({"resources": [{"links": {
                "self": {"href": app},
                "droplet": {"href": droplet, "method": "GET"}
            }}]}),
        ),
        (app.as_str(), json!({"links": {"self": {"href": app}}})),
        (droplet.as_str(), json!({"guid": DROPLET_GUID})),
    ]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();
    let graph = &outcome.graph;

    let names: Vec<_> = graph.nodes().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["v3", "apps", "droplets"]);

    assert_eq!(graph.edge_count(), 3);
    assert!(graph.has_edge("v3", "apps", "/v3/apps"));
    assert!(graph.has_edge("apps", "apps", "/v3/apps/:guid"));
    assert!(graph.has_edge("apps", "droplets", "/v3/apps/:guid/droplets/:guid"));

    // The self link is expanded once and never again.
    assert_eq!(
        *fetched.lock().unwrap(),
        vec!["/v3".to_string(), "/v3/apps".to_string(), app.clone(), droplet.clone()]
    );
    assert_eq!(
        outcome.summary.visited,
        vec![
            "/v3",
            "/v3/apps",
            "/v3/apps/:guid",
            "/v3/apps/:guid/droplets/:guid"
        ]
    );
    assert_eq!(outcome.summary.leaves, vec![droplet]);
    assert!(outcome.summary.failures.is_empty());
}

// ============================================================================
// Termination
// ============================================================================

#[tokio::test]
async fn test_cycle_terminates() {
    let api = FakeApi::new(vec![
        ("/v3", links(&[("a", "/v3/a")])),
        ("/v3/a", links(&[("b", "/v3/b")])),
        ("/v3/b", links(&[("a", "/v3/a")])),
    ]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3", "/v3/a", "/v3/b"]);
    assert!(outcome.graph.has_edge("a", "b", "/v3/b"));
    assert!(outcome.graph.has_edge("b", "a", "/v3/a"));
    assert_eq!(outcome.graph.edge_count(), 3);
}

#[tokio::test]
async fn test_instances_of_same_canonical_path_expand_once() {
    let first = format!("/v3/apps/{}", APP_GUID);
    let second = format!("/v3/apps/{}", OTHER_APP_GUID);
    let api = FakeApi::new(vec![
        ("/v3", links(&[("first", first.as_str()), ("second", second.as_str())])),
        (first.as_str(), json!({})),
        (second.as_str(), json!({})),
    ]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3".to_string(), first]);
    assert_eq!(outcome.graph.edge_count(), 1);
    assert!(outcome.graph.has_edge("v3", "apps", "/v3/apps/:guid"));
}

#[tokio::test]
async fn test_traversal_is_depth_first() {
    let api = FakeApi::new(vec![
        ("/v3", links(&[("x", "/v3/x"), ("y", "/v3/y")])),
        ("/v3/x", links(&[("z", "/v3/z")])),
        ("/v3/y", json!({})),
        ("/v3/z", json!({})),
    ]);
    let (crawler, fetched) = crawler(api);

    crawler.crawl("/v3").await.unwrap();

    assert_eq!(
        *fetched.lock().unwrap(),
        vec!["/v3", "/v3/x", "/v3/z", "/v3/y"]
    );
}

#[tokio::test]
async fn test_sibling_reached_through_earlier_branch_is_not_refetched() {
    let api = FakeApi::new(vec![
        ("/v3", links(&[("a", "/v3/a"), ("b", "/v3/b")])),
        ("/v3/a", links(&[("b", "/v3/b")])),
        ("/v3/b", json!({})),
    ]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3", "/v3/a", "/v3/b"]);
    assert!(outcome.graph.has_edge("v3", "b", "/v3/b"));
    assert!(outcome.graph.has_edge("a", "b", "/v3/b"));
}

// ============================================================================
// Followability
// ============================================================================

#[tokio::test]
async fn test_write_links_produce_edges_without_fetching() {
    let start = format!("/v3/apps/{}/actions/start", APP_GUID);
    let api = FakeApi::new(vec![(
        "/v3",
        json!({"links": {"start": {"href": start, "method": "POST"}}}),
    )]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3"]);
    assert!(outcome.graph.has_edge("v3", "start", "/v3/apps/:guid/actions/start"));
}

#[tokio::test]
async fn test_download_links_produce_edges_without_fetching() {
    let download = format!("/v3/packages/{}/download", APP_GUID);
    let api = FakeApi::new(vec![(
        "/v3",
        json!({"links": {"download": {"href": download, "method": "GET"}}}),
    )]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3"]);
    assert!(
        outcome
            .graph
            .has_edge("v3", "download", "/v3/packages/:guid/download")
    );
}

#[tokio::test]
async fn test_other_version_links_are_tagged_and_not_fetched() {
    let api = FakeApi::new(vec![(
        "/v3",
        links(&[("legacy", "https://api.example.com/v2/apps")]),
    )]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3"]);
    let node = outcome.graph.node("apps").unwrap();
    assert!(!node.primary_version);
    assert!(outcome.graph.node("v3").unwrap().primary_version);
    assert!(outcome.graph.has_edge("v3", "apps", "/v2/apps"));
}

#[tokio::test]
async fn test_absolute_hrefs_are_fetched_by_path() {
    let api = FakeApi::new(vec![
        ("/v3", links(&[("apps", "https://api.example.com/v3/apps?per_page=50")])),
        ("/v3/apps", json!({})),
    ]);
    let (crawler, fetched) = crawler(api);

    crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3", "/v3/apps"]);
}

#[tokio::test]
async fn test_custom_type_literals_and_markers() {
    let worker = format!("/v3/apps/{}/processes/worker", APP_GUID);
    let api = FakeApi::new(vec![
        ("/v3", links(&[("worker", worker.as_str()), ("bits", "/v3/packages/x/bits")])),
        (worker.as_str(), json!({})),
    ]);
    let fetched = api.fetched.clone();
    let crawler = Crawler::new(
        api,
        PathNormalizer::with_type_literals(["web", "worker"]).unwrap(),
    )
    .with_extractor(LinkExtractor::with_markers("v3", ["download", "bits"]));

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert!(
        outcome
            .graph
            .has_edge("v3", "processes", "/v3/apps/:guid/processes/:type")
    );
    assert!(outcome.graph.has_edge("v3", "bits", "/v3/packages/x/bits"));
    assert_eq!(*fetched.lock().unwrap(), vec!["/v3".to_string(), worker]);
}

// ============================================================================
// Error handling
// ============================================================================

#[tokio::test]
async fn test_root_failure_is_fatal() {
    let (crawler, _) = crawler(FakeApi::new(vec![]));

    let result = crawler.crawl("/v3").await;

    assert!(matches!(result, Err(CrawlError::RootUnreachable { .. })));
}

#[tokio::test]
async fn test_root_without_resource_name_is_fatal() {
    let (crawler, fetched) = crawler(FakeApi::new(vec![]));

    let result = crawler.crawl("/").await;

    assert!(matches!(result, Err(CrawlError::InvalidRoot { .. })));
    assert!(fetched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_branch_failure_is_not_fatal() {
    let api = FakeApi::new(vec![
        ("/v3", links(&[("broken", "/v3/broken"), ("ok", "/v3/ok")])),
        ("/v3/ok", json!({})),
    ]);
    let (crawler, fetched) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(*fetched.lock().unwrap(), vec!["/v3", "/v3/broken", "/v3/ok"]);
    assert_eq!(outcome.summary.failures.len(), 1);
    assert_eq!(outcome.summary.failures[0].path, "/v3/broken");
    assert!(outcome.summary.failures[0].reason.contains("404"));
    assert!(outcome.graph.has_node("broken"));
    assert!(outcome.graph.has_edge("v3", "ok", "/v3/ok"));
}

#[tokio::test]
async fn test_root_without_links_is_a_leaf() {
    let (crawler, _) = crawler(FakeApi::new(vec![("/v3", json!({"name": "root"}))]));

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(outcome.graph.node_count(), 1);
    assert_eq!(outcome.graph.edge_count(), 0);
    assert_eq!(outcome.summary.leaves, vec!["/v3"]);
}

#[tokio::test]
async fn test_links_without_resource_name_are_skipped() {
    let api = FakeApi::new(vec![(
        "/v3",
        links(&[("home", "https://api.example.com/"), ("apps", "/v3/apps")]),
    )]);
    let (crawler, _) = crawler(api);

    let outcome = crawler.crawl("/v3").await.unwrap();

    assert_eq!(outcome.summary.skipped.len(), 1);
    assert_eq!(outcome.summary.skipped[0].href, "https://api.example.com/");
    assert_eq!(outcome.graph.edge_count(), 1);
}

// ============================================================================
// Progress trace
// ============================================================================

#[tokio::test]
async fn test_progress_trace() {
    let api = FakeApi::new(vec![
        ("/v3", links(&[("a", "/v3/a")])),
        ("/v3/a", links(&[("b", "/v3/b")])),
        ("/v3/b", links(&[("a", "/v3/a")])),
    ]);
    let lines = Arc::new(Mutex::new(Vec::new()));
    let lines_clone = lines.clone();
    let crawler = Crawler::new(api, PathNormalizer::new().unwrap()).with_progress_callback(
        Arc::new(move |line: String| lines_clone.lock().unwrap().push(line)),
    );

    crawler.crawl("/v3").await.unwrap();

    assert_eq!(
        *lines.lock().unwrap(),
        vec![
            "/v3 -- v3",
            "    /v3/a -- a",
            "/v3/a -- a",
            "    /v3/b -- b",
            "/v3/b -- b",
            "    /v3/a -- a",
        ]
    );
}

// ============================================================================
// Live HTTP crawl
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let apps_href = format!("{}/v3/apps", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/v3"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "links": {
                "self": {"href": format!("{}/v3", mock_server.uri())},
                "apps": {"href": apps_href}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagination": {"total_results": 0},
            "resources": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = CrawlOptions {
        config: ApiConfig {
            base_url: Url::parse(&mock_server.uri()).unwrap(),
            token: "token-123".to_string(),
        },
        root: DEFAULT_ROOT_PATH.to_string(),
        primary_version: "v3".to_string(),
        type_literals: vec!["web".to_string()],
        download_markers: vec!["download".to_string()],
        timeout_secs: 5,
        show_progress_bars: false,
    };

    let outcome = execute_crawl(options, None).await.unwrap();

    assert!(outcome.graph.has_edge("v3", "v3", "/v3"));
    assert!(outcome.graph.has_edge("v3", "apps", "/v3/apps"));
    assert_eq!(outcome.summary.leaves, vec!["/v3/apps"]);
}

#[tokio::test]
async fn test_execute_crawl_root_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let options = CrawlOptions {
        config: ApiConfig {
            base_url: Url::parse(&mock_server.uri()).unwrap(),
            token: "expired".to_string(),
        },
        root: DEFAULT_ROOT_PATH.to_string(),
        primary_version: "v3".to_string(),
        type_literals: vec![],
        download_markers: vec![],
        timeout_secs: 5,
        show_progress_bars: false,
    };

    let err = execute_crawl(options, None).await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::RootUnreachable {
            source: ScanError::UnexpectedStatus { status: 401, .. },
            ..
        }
    ));
}
