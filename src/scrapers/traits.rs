use crate::error::PageError;
use async_trait::async_trait;
use serde_json::Value;

/// Opaque handle to an element of the currently rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node(pub u32);

/// Capability interface over a rendered, scriptable page.
/// Extraction code is written once against this trait; the backend (headless Chrome,
/// HTML snapshots) is picked where the pipeline is composed.
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// Navigate and block until the driver reports the load finished
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// First element matching `selector` under `scope` (whole document when `None`).
    /// Absence is `Ok(None)`; only driver failures are errors.
    async fn find(&self, scope: Option<Node>, selector: &str) -> Result<Option<Node>, PageError>;

    /// Every element matching `selector` under `scope`, in document order
    async fn find_all(&self, scope: Option<Node>, selector: &str) -> Result<Vec<Node>, PageError>;

    /// Rendered text of the element, block boundaries as line breaks
    async fn text(&self, node: Node) -> Result<String, PageError>;

    async fn attribute(&self, node: Node, name: &str) -> Result<Option<String>, PageError>;

    async fn click(&self, node: Node) -> Result<(), PageError>;

    /// Evaluate a JavaScript expression in the page
    async fn evaluate(&self, expression: &str) -> Result<Value, PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    /// Name of the backend, for logs
    fn backend_name(&self) -> &'static str;
}
