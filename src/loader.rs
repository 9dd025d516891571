//! Configuration document loader
//!
//! Lists and fetches YAML integration documents from a `DocumentSource`
//! (a directory tree or the flowviz-web HTTP endpoints), parses them into
//! `Integration` snapshots, and drives the polling loop.
//!
//! Failures are contained per document: a document that fails to list,
//! fetch or parse is skipped with a warning, and the poller keeps serving
//! its last good snapshot until a reload succeeds.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlowVizError;
use crate::model::{Integration, Segment};

/// Delay between the end of one poll cycle and the start of the next
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// One listable configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub stand: String,
    pub flow: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Where configuration documents come from
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Enumerate available documents for one stand
    async fn list(&self) -> Result<Vec<DocumentRef>, FlowVizError>;
    /// Fetch one document's raw YAML content
    async fn fetch(&self, doc: &DocumentRef) -> Result<String, FlowVizError>;
}

// =============================================================================
// SOURCES
// =============================================================================

/// Documents on disk at `<root>/<stand>/<flow>/integration.yaml`
pub struct DirSource {
    root: PathBuf,
    stand: String,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>, stand: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            stand: stand.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for DirSource {
    async fn list(&self) -> Result<Vec<DocumentRef>, FlowVizError> {
        let stand_dir = self.root.join(&self.stand);
        let mut refs = Vec::new();
        let mut entries = tokio::fs::read_dir(&stand_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let flow = entry.file_name().to_string_lossy().to_string();
            let doc_path = entry.path().join("integration.yaml");
            let Ok(meta) = tokio::fs::metadata(&doc_path).await else {
                tracing::warn!(flow = %flow, "no integration.yaml in flow directory");
                continue;
            };
            let modified = meta.modified().ok().map(DateTime::<Utc>::from);
            refs.push(DocumentRef {
                stand: self.stand.clone(),
                flow,
                path: doc_path.to_string_lossy().to_string(),
                modified,
            });
        }
        refs.sort_by(|a, b| a.flow.cmp(&b.flow));
        Ok(refs)
    }

    async fn fetch(&self, doc: &DocumentRef) -> Result<String, FlowVizError> {
        Ok(tokio::fs::read_to_string(&doc.path).await?)
    }
}

/// Documents served by a flowviz-web instance
pub struct HttpSource {
    base_url: String,
    stand: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, stand: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stand: stand.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn list(&self) -> Result<Vec<DocumentRef>, FlowVizError> {
        let url = format!(
            "{}/api/integrations/list?stand={}",
            self.base_url, self.stand
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FlowVizError::Load(format!(
                "list request failed: HTTP {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn fetch(&self, doc: &DocumentRef) -> Result<String, FlowVizError> {
        let url = format!("{}/integration/{}/{}", self.base_url, doc.stand, doc.flow);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FlowVizError::Load(format!(
                "fetch of {}/{} failed: HTTP {}",
                doc.stand,
                doc.flow,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawDocument {
    integration: RawIntegration,
}

#[derive(Debug, Deserialize)]
struct RawIntegration {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    segments: Vec<Segment>,
}

/// Display name derived from a flow directory name
pub fn humanize_flow_name(flow: &str) -> String {
    flow.replace('-', " ")
}

/// Canonical capitalization for the well-known segment names
pub fn normalize_segment_name(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "source" => "Source".to_string(),
        "processing" => "Processing".to_string(),
        "destination" => "Destination".to_string(),
        _ => name.to_string(),
    }
}

/// Parse one document body into an `Integration` snapshot
pub fn parse_integration(
    yaml: &str,
    stand: &str,
    flow: &str,
) -> Result<Integration, FlowVizError> {
    let raw: RawDocument = serde_yaml::from_str(yaml)?;

    let mut segments = raw.integration.segments;
    for segment in &mut segments {
        segment.segment = normalize_segment_name(&segment.segment);
    }

    let name = raw
        .integration
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| humanize_flow_name(flow));

    Ok(Integration {
        name,
        description: raw.integration.description,
        stand: stand.to_string(),
        flow_name: flow.to_string(),
        segments,
    })
}

/// List and load every available document, skipping failures
pub async fn load_all(source: &dyn DocumentSource) -> Vec<Integration> {
    let refs = match source.list().await {
        Ok(refs) => refs,
        Err(err) => {
            tracing::warn!(error = %err, "document listing failed");
            return Vec::new();
        }
    };

    let mut integrations = Vec::with_capacity(refs.len());
    for doc in &refs {
        match load_one(source, doc).await {
            Ok(integration) => integrations.push(integration),
            Err(err) => {
                tracing::warn!(flow = %doc.flow, error = %err, "skipping document");
            }
        }
    }

    if integrations.is_empty() {
        tracing::warn!("no integration documents loaded");
    }
    integrations
}

async fn load_one(
    source: &dyn DocumentSource,
    doc: &DocumentRef,
) -> Result<Integration, FlowVizError> {
    let body = source.fetch(doc).await?;
    parse_integration(&body, &doc.stand, &doc.flow)
}

// =============================================================================
// POLLING
// =============================================================================

/// Last good snapshot per document, keyed by path
#[derive(Default)]
struct SnapshotCache {
    docs: HashMap<String, Integration>,
    order: Vec<String>,
}

impl SnapshotCache {
    fn snapshot(&self) -> Vec<Integration> {
        self.order
            .iter()
            .filter_map(|path| self.docs.get(path))
            .cloned()
            .collect()
    }
}

/// One poll cycle: refresh the cache from the source, preserving the
/// previous snapshot of any document that fails to reload
async fn poll_once(source: &dyn DocumentSource, cache: &mut SnapshotCache) -> Vec<Integration> {
    let refs = match source.list().await {
        Ok(refs) => refs,
        Err(err) => {
            tracing::warn!(error = %err, "poll listing failed, keeping previous snapshot");
            return cache.snapshot();
        }
    };

    cache.order = refs.iter().map(|r| r.path.clone()).collect();
    for doc in &refs {
        match load_one(source, doc).await {
            Ok(integration) => {
                cache.docs.insert(doc.path.clone(), integration);
            }
            Err(err) => {
                if cache.docs.contains_key(&doc.path) {
                    tracing::warn!(flow = %doc.flow, error = %err, "reload failed, keeping previous snapshot");
                } else {
                    tracing::warn!(flow = %doc.flow, error = %err, "skipping document");
                }
            }
        }
    }

    // Drop cache entries for documents no longer listed
    let listed: std::collections::HashSet<&String> = cache.order.iter().collect();
    cache.docs.retain(|path, _| listed.contains(path));

    cache.snapshot()
}

/// Handle to a running polling task
pub struct PollHandle {
    task: tokio::task::JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling; no further updates are delivered
    pub fn stop(&self) {
        self.task.abort();
    }
}

/// Cooperative polling loop over a document source
///
/// The next cycle is scheduled a fixed delay after the previous one
/// completes, so in-flight requests never overlap. The newest result
/// always wins; rebuilds downstream are idempotent.
pub struct DocumentPoller {
    source: Arc<dyn DocumentSource>,
    interval: Duration,
}

impl DocumentPoller {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the polling task, delivering each cycle's snapshot to
    /// `on_update` (including the first, immediate cycle)
    pub fn spawn<F>(self, on_update: F) -> PollHandle
    where
        F: Fn(Vec<Integration>) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut cache = SnapshotCache::default();
            loop {
                let snapshot = poll_once(self.source.as_ref(), &mut cache).await;
                on_update(snapshot);
                tokio::time::sleep(self.interval).await;
            }
        });
        PollHandle { task }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    const SAMPLE: &str = r#"
integration:
  name: test
  description: demo flow
  segments:
  - segment: source
    elements:
    - type: kafka
      name: DELTA.TOPIC.EVENT.V1
      id: 0
      next: 1
    - type: nginx
      id: 1
"#;

    #[test]
    fn test_parse_sample_document() {
        let integration = parse_integration(SAMPLE, "IFT", "payment-flow").unwrap();
        assert_eq!(integration.name, "test");
        assert_eq!(integration.stand, "IFT");
        assert_eq!(integration.flow_name, "payment-flow");
        assert_eq!(integration.segments.len(), 1);
        // Well-known segment names are normalized
        assert_eq!(integration.segments[0].segment, "Source");
        assert_eq!(integration.segments[0].elements.len(), 2);
    }

    #[test]
    fn test_missing_name_derives_from_flow() {
        let yaml = "integration:\n  segments: []\n";
        let integration = parse_integration(yaml, "IFT", "payment-flow").unwrap();
        assert_eq!(integration.name, "payment flow");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_integration(": not yaml", "IFT", "x").is_err());
        assert!(parse_integration("unrelated: doc", "IFT", "x").is_err());
    }

    #[tokio::test]
    async fn test_dir_source_lists_and_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let flow_dir = dir.path().join("IFT").join("demo-flow");
        std::fs::create_dir_all(&flow_dir).unwrap();
        std::fs::write(flow_dir.join("integration.yaml"), SAMPLE).unwrap();
        // A flow directory without a document is skipped
        std::fs::create_dir_all(dir.path().join("IFT").join("empty")).unwrap();

        let source = DirSource::new(dir.path(), "IFT");
        let refs = source.list().await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].flow, "demo-flow");

        let body = source.fetch(&refs[0]).await.unwrap();
        assert_eq!(body, SAMPLE);

        let loaded = load_all(&source).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].flow_name, "demo-flow");
    }

    /// Source whose fetch fails whenever the flag is set
    struct FlakySource {
        failing: AtomicBool,
    }

    #[async_trait]
    impl DocumentSource for FlakySource {
        async fn list(&self) -> Result<Vec<DocumentRef>, FlowVizError> {
            Ok(vec![DocumentRef {
                stand: "IFT".to_string(),
                flow: "demo".to_string(),
                path: "IFT/demo".to_string(),
                modified: None,
            }])
        }

        async fn fetch(&self, _doc: &DocumentRef) -> Result<String, FlowVizError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(FlowVizError::Load("fetch refused".to_string()))
            } else {
                Ok(SAMPLE.to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_poll_preserves_previous_snapshot_on_failure() {
        let source = FlakySource {
            failing: AtomicBool::new(false),
        };
        let mut cache = SnapshotCache::default();

        let first = poll_once(&source, &mut cache).await;
        assert_eq!(first.len(), 1);

        source.failing.store(true, Ordering::SeqCst);
        let second = poll_once(&source, &mut cache).await;
        assert_eq!(second.len(), 1, "stale snapshot preserved");
        assert_eq!(second[0].name, first[0].name);

        source.failing.store(false, Ordering::SeqCst);
        let third = poll_once(&source, &mut cache).await;
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn test_poller_delivers_snapshots() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let source = Arc::new(FlakySource {
            failing: AtomicBool::new(false),
        });
        let handle = DocumentPoller::new(source)
            .with_interval(Duration::from_millis(10))
            .spawn(move |snapshot| {
                let _ = tx.send(snapshot);
            });

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        handle.stop();
    }
}
