use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{HarvestError, Result};
use crate::scrapers::Selectors;

/// Delays and bounds around every browser interaction
#[derive(Debug, Clone)]
pub struct Timings {
    /// Sleep after each navigation so client-side rendering can finish
    pub settle: Duration,
    /// Sleep between two listings
    pub pacing: Duration,
    /// Pause between two scroll steps of the readiness sweep
    pub scroll_step: Duration,
    /// Equal slices the readiness sweep divides the page height into
    pub scroll_steps: u32,
    /// Upper bound for a single navigation attempt, enforced by the browser driver
    pub render_timeout: Duration,
    /// Extra navigation attempts after the first one
    pub render_retries: u32,
    /// Photo viewer pages read before giving up on a "next" control that never goes away
    pub max_gallery_pages: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(5),
            pacing: Duration::from_secs(2),
            scroll_step: Duration::from_secs(1),
            scroll_steps: 6,
            render_timeout: Duration::from_secs(30),
            render_retries: 1,
            max_gallery_pages: 500,
        }
    }
}

impl Timings {
    /// No sleeping at all; for fixture-backed runs
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            pacing: Duration::ZERO,
            scroll_step: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub chrome_bin: Option<PathBuf>,
    pub headless: bool,
    pub window_size: (u32, u32),
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_bin: None,
            headless: true,
            window_size: (1920, 1080),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub input_path: PathBuf,
    pub store_path: PathBuf,
    pub base_url: String,
    pub browser: BrowserConfig,
    pub timings: Timings,
    pub selectors: Selectors,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/listings.csv"),
            store_path: PathBuf::from("data/rooms.json"),
            base_url: "https://www.airbnb.co.in".to_string(),
            browser: BrowserConfig::default(),
            timings: Timings::default(),
            selectors: Selectors::default(),
        }
    }
}

impl HarvestConfig {
    /// Load from the environment (and a `.env` file if present), falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; keys the lookup does not know keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("HARVEST_INPUT") {
            config.input_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HARVEST_STORE") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("HARVEST_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("HARVEST_SELECTORS") {
            config.selectors = load_selectors(&path)?;
        }
        config.browser.chrome_bin = lookup("CHROME_BIN").map(PathBuf::from);
        config.browser.headless = parsed(&lookup, "HARVEST_HEADLESS", config.browser.headless)?;

        let t = &mut config.timings;
        t.settle = Duration::from_secs(parsed(&lookup, "HARVEST_SETTLE_SECS", t.settle.as_secs())?);
        t.pacing = Duration::from_secs(parsed(&lookup, "HARVEST_PACING_SECS", t.pacing.as_secs())?);
        t.scroll_step = Duration::from_millis(parsed(
            &lookup,
            "HARVEST_SCROLL_STEP_MS",
            t.scroll_step.as_millis() as u64,
        )?);
        t.scroll_steps = parsed(&lookup, "HARVEST_SCROLL_STEPS", t.scroll_steps)?;
        t.render_timeout = Duration::from_secs(parsed(
            &lookup,
            "HARVEST_RENDER_TIMEOUT_SECS",
            t.render_timeout.as_secs(),
        )?);
        t.render_retries = parsed(&lookup, "HARVEST_RENDER_RETRIES", t.render_retries)?;
        t.max_gallery_pages = parsed(&lookup, "HARVEST_MAX_GALLERY_PAGES", t.max_gallery_pages)?;

        Ok(config)
    }
}

/// Selector overrides from a JSON file; keys left out keep their defaults
fn load_selectors(path: &str) -> Result<Selectors> {
    let raw = fs::read_to_string(path).map_err(|e| HarvestError::Config {
        key: "HARVEST_SELECTORS",
        reason: format!("{path}: {e}"),
    })?;
    serde_json::from_str(&raw).map_err(|e| HarvestError::Config {
        key: "HARVEST_SELECTORS",
        reason: format!("{path}: {e}"),
    })
}

fn parsed<T>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| HarvestError::Config {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}
