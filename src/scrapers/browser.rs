use crate::config::BrowserConfig;
use crate::error::PageError;
use crate::scrapers::traits::{Node, RenderedPage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One headless Chrome process with a single tab, reused for every listing.
/// The tab is closed and the process killed when the session is dropped.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
    /// Held by the blocking thread for the whole driver call
    gate: Arc<Mutex<()>>,
}

impl ChromeSession {
    /// Launch Chrome. Failure here is fatal for the run.
    pub fn launch(config: &BrowserConfig, navigation_timeout: Duration) -> Result<Self> {
        info!(headless = config.headless, "Launching Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .path(config.chrome_bin.clone())
            .window_size(Some(config.window_size))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;
        tab.set_default_timeout(navigation_timeout);

        Ok(Self {
            _browser: browser,
            tab,
            gate: Arc::new(Mutex::new(())),
        })
    }

    /// Run a blocking driver call off the async executor.
    /// The gate is released only when the blocking call returns, so a caller that stops
    /// waiting cannot start a second call on the tab while the first is still running.
    async fn with_tab<T, F>(&self, op: F) -> Result<T, PageError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, PageError> + Send + 'static,
    {
        let gate = Arc::clone(&self.gate).lock_owned().await;
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || {
            let _gate = gate;
            op(tab.as_ref())
        })
        .await
        .map_err(PageError::driver)?
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            warn!("Failed to close browser tab: {e:#}");
        } else {
            debug!("Browser tab closed");
        }
    }
}

fn is_absent(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NoElementFound>().is_some()
}

/// Resolve a handle again. A node id that can no longer be described was detached by a
/// re-render, so any failure here is reported as an unknown node.
fn element(tab: &Tab, node: Node) -> Result<Element<'_>, PageError> {
    Element::new(tab, node.0).map_err(|e| {
        debug!(node = node.0, "Node no longer resolves: {e:#}");
        PageError::UnknownNode(node.0)
    })
}

#[async_trait]
impl RenderedPage for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| PageError::Navigation {
                    url,
                    reason: format!("{e:#}"),
                })
        })
        .await
    }

    async fn find(&self, scope: Option<Node>, selector: &str) -> Result<Option<Node>, PageError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let found = match scope {
                None => tab.find_element(&selector).map(|el| el.node_id),
                Some(node) => element(tab, node)?
                    .find_element(&selector)
                    .map(|el| el.node_id),
            };
            match found {
                Ok(node_id) => Ok(Some(Node(node_id))),
                Err(e) if is_absent(&e) => Ok(None),
                Err(e) => Err(PageError::driver(format!("{e:#}"))),
            }
        })
        .await
    }

    async fn find_all(&self, scope: Option<Node>, selector: &str) -> Result<Vec<Node>, PageError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let found = match scope {
                None => tab
                    .find_elements(&selector)
                    .map(|els| els.iter().map(|el| Node(el.node_id)).collect()),
                Some(node) => element(tab, node)?
                    .find_elements(&selector)
                    .map(|els| els.iter().map(|el| Node(el.node_id)).collect()),
            };
            match found {
                Ok(nodes) => Ok(nodes),
                Err(e) if is_absent(&e) => Ok(Vec::new()),
                Err(e) => Err(PageError::driver(format!("{e:#}"))),
            }
        })
        .await
    }

    async fn text(&self, node: Node) -> Result<String, PageError> {
        self.with_tab(move |tab| {
            element(tab, node)?
                .get_inner_text()
                .map_err(|e| PageError::driver(format!("{e:#}")))
        })
        .await
    }

    async fn attribute(&self, node: Node, name: &str) -> Result<Option<String>, PageError> {
        let name = name.to_string();
        self.with_tab(move |tab| {
            element(tab, node)?
                .get_attribute_value(&name)
                .map_err(|e| PageError::driver(format!("{e:#}")))
        })
        .await
    }

    async fn click(&self, node: Node) -> Result<(), PageError> {
        self.with_tab(move |tab| {
            element(tab, node)?
                .click()
                .map(|_| ())
                .map_err(|e| PageError::driver(format!("{e:#}")))
        })
        .await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, PageError> {
        let expression = expression.to_string();
        self.with_tab(move |tab| {
            let result = tab
                .evaluate(&expression, false)
                .map_err(|e| PageError::driver(format!("{e:#}")))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.with_tab(|tab| Ok(tab.get_url())).await
    }

    fn backend_name(&self) -> &'static str {
        "chrome"
    }
}
