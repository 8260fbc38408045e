//! Rendered-page backend over recorded HTML.
//!
//! Each URL maps to a sequence of document states. Navigation loads state 0; clicking an
//! element carrying `data-click-state="N"` switches the current URL to state N, which is
//! how a fixture models a gallery "next" button or a "read more" expander. Such a click
//! re-renders the page: handles issued before it stop resolving and report
//! [`PageError::UnknownNode`], like detached nodes in a live DOM.

use crate::error::PageError;
use crate::scrapers::readiness::{SCROLL_HEIGHT_SCRIPT, SCROLL_TO_PREFIX};
use crate::scrapers::traits::{Node, RenderedPage};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub const CLICK_STATE_ATTR: &str = "data-click-state";

#[derive(Debug, Default)]
struct Cursor {
    url: Option<String>,
    state: usize,
    /// Bumped on every navigation and re-render
    generation: u64,
    /// (generation, element index in document order) per issued handle
    handles: Vec<(u64, usize)>,
    navigations: Vec<String>,
    scroll_positions: Vec<u64>,
    clicks: usize,
}

#[derive(Debug, Default)]
pub struct SnapshotPage {
    routes: HashMap<String, Vec<String>>,
    scroll_height: Option<u64>,
    cursor: Mutex<Cursor>,
}

impl SnapshotPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the document states served for `url`
    pub fn route(mut self, url: impl Into<String>, states: Vec<String>) -> Self {
        self.routes.insert(url.into(), states);
        self
    }

    /// Height reported to the readiness sweep; unset means the script yields `null`
    pub fn scroll_height(mut self, height: u64) -> Self {
        self.scroll_height = Some(height);
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.cursor().map(|c| c.navigations.clone()).unwrap_or_default()
    }

    pub fn scroll_positions(&self) -> Vec<u64> {
        self.cursor()
            .map(|c| c.scroll_positions.clone())
            .unwrap_or_default()
    }

    pub fn clicks(&self) -> usize {
        self.cursor().map(|c| c.clicks).unwrap_or_default()
    }

    fn cursor(&self) -> Result<MutexGuard<'_, Cursor>, PageError> {
        self.cursor
            .lock()
            .map_err(|_| PageError::driver("snapshot cursor poisoned"))
    }

    fn document(&self, url: &str, state: usize) -> Result<Html, PageError> {
        self.routes
            .get(url)
            .and_then(|states| states.get(state))
            .map(|html| Html::parse_document(html))
            .ok_or_else(|| PageError::driver(format!("no snapshot state {state} for {url}")))
    }

    fn current(&self, cursor: &Cursor) -> Result<Html, PageError> {
        let url = cursor
            .url
            .as_deref()
            .ok_or_else(|| PageError::driver("no page loaded"))?;
        self.document(url, cursor.state)
    }

    fn query(
        &self,
        scope: Option<Node>,
        selector: &str,
        first_only: bool,
    ) -> Result<Vec<Node>, PageError> {
        let parsed =
            Selector::parse(selector).map_err(|_| PageError::Selector(selector.to_string()))?;
        let mut cursor = self.cursor()?;
        let doc = self.current(&cursor)?;
        let elements = all_elements(&doc);

        let matches: Vec<usize> = match scope {
            Some(node) => {
                let index = resolve(&cursor, node)?;
                let root = elements
                    .get(index)
                    .ok_or(PageError::UnknownNode(node.0))?;
                root.select(&parsed)
                    .filter_map(|el| position(&elements, el))
                    .collect()
            }
            None => doc
                .select(&parsed)
                .filter_map(|el| position(&elements, el))
                .collect(),
        };

        let take = if first_only { 1 } else { matches.len() };
        let generation = cursor.generation;
        Ok(matches
            .into_iter()
            .take(take)
            .map(|index| {
                cursor.handles.push((generation, index));
                Node((cursor.handles.len() - 1) as u32)
            })
            .collect())
    }

    fn with_element<T>(
        &self,
        node: Node,
        read: impl FnOnce(ElementRef<'_>) -> T,
    ) -> Result<T, PageError> {
        let cursor = self.cursor()?;
        let index = resolve(&cursor, node)?;
        let doc = self.current(&cursor)?;
        let elements = all_elements(&doc);
        let el = elements
            .get(index)
            .copied()
            .ok_or(PageError::UnknownNode(node.0))?;
        Ok(read(el))
    }
}

/// Element index behind a handle, if the handle predates no re-render
fn resolve(cursor: &Cursor, node: Node) -> Result<usize, PageError> {
    match cursor.handles.get(node.0 as usize) {
        Some(&(generation, index)) if generation == cursor.generation => Ok(index),
        _ => Err(PageError::UnknownNode(node.0)),
    }
}

fn all_elements(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn position(elements: &[ElementRef<'_>], el: ElementRef<'_>) -> Option<usize> {
    elements.iter().position(|candidate| candidate.id() == el.id())
}

/// Text nodes joined by line breaks, approximating `innerText` for block children
fn inner_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl RenderedPage for SnapshotPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut cursor = self.cursor()?;
        cursor.navigations.push(url.to_string());
        if !self.routes.contains_key(url) {
            return Err(PageError::Navigation {
                url: url.to_string(),
                reason: "no snapshot recorded".to_string(),
            });
        }
        cursor.url = Some(url.to_string());
        cursor.state = 0;
        cursor.generation += 1;
        Ok(())
    }

    async fn find(&self, scope: Option<Node>, selector: &str) -> Result<Option<Node>, PageError> {
        Ok(self.query(scope, selector, true)?.into_iter().next())
    }

    async fn find_all(&self, scope: Option<Node>, selector: &str) -> Result<Vec<Node>, PageError> {
        self.query(scope, selector, false)
    }

    async fn text(&self, node: Node) -> Result<String, PageError> {
        self.with_element(node, inner_text)
    }

    async fn attribute(&self, node: Node, name: &str) -> Result<Option<String>, PageError> {
        self.with_element(node, |el| el.value().attr(name).map(str::to_string))
    }

    async fn click(&self, node: Node) -> Result<(), PageError> {
        let target = self.with_element(node, |el| {
            el.value()
                .attr(CLICK_STATE_ATTR)
                .and_then(|raw| raw.parse::<usize>().ok())
        })?;
        let mut cursor = self.cursor()?;
        cursor.clicks += 1;
        if let Some(state) = target {
            cursor.state = state;
            cursor.generation += 1;
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, PageError> {
        if expression == SCROLL_HEIGHT_SCRIPT {
            return Ok(self.scroll_height.map(Value::from).unwrap_or(Value::Null));
        }
        if let Some(rest) = expression.strip_prefix(SCROLL_TO_PREFIX) {
            let y = rest
                .trim_end_matches(')')
                .trim()
                .parse::<u64>()
                .map_err(PageError::driver)?;
            self.cursor()?.scroll_positions.push(y);
        }
        Ok(Value::Null)
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.cursor()?
            .url
            .clone()
            .ok_or_else(|| PageError::driver("no page loaded"))
    }

    fn backend_name(&self) -> &'static str {
        "snapshot"
    }
}
