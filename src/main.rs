use anyhow::Context;
use listing_harvest::scrapers::{ChromeSession, RenderedPage, RoomAssembler};
use listing_harvest::{input, HarvestConfig, JsonStore, ResumableRunner};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("listing_harvest=info".parse()?),
        )
        .init();

    info!("Listing Harvest");

    let config = HarvestConfig::from_env().context("Invalid configuration")?;

    let table = input::load_identifiers(&config.input_path)
        .with_context(|| format!("Failed to load {}", config.input_path.display()))?;
    let mut store = JsonStore::open(&config.store_path)
        .with_context(|| format!("Failed to open {}", config.store_path.display()))?;

    let session: Arc<dyn RenderedPage> = Arc::new(ChromeSession::launch(
        &config.browser,
        config.timings.render_timeout,
    )?);
    info!(backend = session.backend_name(), "Browser ready");

    let pacing = config.timings.pacing;
    let assembler = RoomAssembler::new(
        session,
        config.base_url.clone(),
        config.selectors.clone(),
        config.timings.clone(),
    );
    let runner = ResumableRunner::new(assembler, pacing);

    let report = runner.run(&table, &mut store).await?;

    info!(
        stored = store.len(),
        processed = report.processed.len(),
        skipped = report.skipped,
        "💾 Store {} up to date",
        store.path().display()
    );
    if !report.abandoned.is_empty() {
        let abandoned: Vec<&str> = report.abandoned.iter().map(|id| id.as_str()).collect();
        info!("Retry on next run: {}", abandoned.join(", "));
    }

    Ok(())
}
