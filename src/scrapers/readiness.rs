use crate::config::Timings;
use crate::error::{HarvestError, Result};
use crate::scrapers::traits::RenderedPage;
use serde_json::Value;
use tracing::{debug, warn};

pub const SCROLL_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
pub const SCROLL_TO_PREFIX: &str = "window.scrollTo(0, ";

/// Waits for a navigated page to become interactively stable
#[derive(Debug, Clone)]
pub struct PageReadiness {
    timings: Timings,
}

impl PageReadiness {
    pub fn new(timings: Timings) -> Self {
        Self { timings }
    }

    /// Navigate with a bounded retry, then give client-side rendering its settle delay.
    ///
    /// Each attempt is awaited to completion before the next one starts, so at most one
    /// navigation is in flight on the page. The per-attempt bound is the backend's own
    /// navigation timeout (`render_timeout` for Chrome), reported as a navigation error.
    pub async fn open<P: RenderedPage + ?Sized>(&self, page: &P, url: &str) -> Result<()> {
        let attempts = self.timings.render_retries + 1;

        for attempt in 1..=attempts {
            match page.navigate(url).await {
                Ok(()) => {
                    debug!(url, attempt, "Navigated");
                    tokio::time::sleep(self.timings.settle).await;
                    return Ok(());
                }
                Err(e) => warn!(url, attempt, "Navigation failed: {e}"),
            }
        }

        Err(HarvestError::RenderTimeout {
            url: url.to_string(),
            attempts,
        })
    }

    /// Scroll to the bottom in equal steps so lazily loaded sections get requested.
    /// An unreadable page height skips the sweep; extraction then works with whatever
    /// the settle delay loaded.
    pub async fn sweep<P: RenderedPage + ?Sized>(&self, page: &P) {
        let height = match page.evaluate(SCROLL_HEIGHT_SCRIPT).await {
            Ok(value) => scroll_height(&value),
            Err(e) => {
                warn!("Could not read page height, skipping scroll sweep: {e}");
                return;
            }
        };

        let Some(positions) = height.and_then(|h| sweep_positions(h, self.timings.scroll_steps))
        else {
            warn!(?height, "Page height unusable, skipping scroll sweep");
            return;
        };

        for y in positions {
            if let Err(e) = page.evaluate(&format!("{SCROLL_TO_PREFIX}{y})")).await {
                warn!(y, "Scroll step failed, ending sweep early: {e}");
                return;
            }
            tokio::time::sleep(self.timings.scroll_step).await;
        }
    }
}

fn scroll_height(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|h| *h >= 0.0).map(|h| h as u64))
}

/// Boundaries of `steps` equal slices of `height`, the last one at the bottom
fn sweep_positions(height: u64, steps: u32) -> Option<Vec<u64>> {
    let steps = u64::from(steps);
    if steps == 0 {
        return None;
    }
    let step = height / steps;
    if step == 0 {
        return None;
    }
    Some((1..=steps).map(|i| i * step).collect())
}
