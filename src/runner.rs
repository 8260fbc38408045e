use crate::error::Result;
use crate::models::ListingId;
use crate::scrapers::ListingSource;
use crate::store::JsonStore;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one pass over the identifier table
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Assembled and stored during this run
    pub processed: Vec<ListingId>,
    /// Already in the store
    pub skipped: usize,
    /// Failed to render; left uncached for the next run
    pub abandoned: Vec<ListingId>,
}

/// Walks the identifier table, assembling and storing every listing not yet cached.
/// Each stored record is durable on its own, so an interrupted run resumes where it
/// stopped.
pub struct ResumableRunner<S> {
    source: S,
    pacing: Duration,
}

impl<S: ListingSource> ResumableRunner<S> {
    pub fn new(source: S, pacing: Duration) -> Self {
        Self { source, pacing }
    }

    pub async fn run(&self, table: &[ListingId], store: &mut JsonStore) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut cached = store.identifiers();
        info!(cached = cached.len(), total = table.len(), "Cached rooms loaded");

        let mut processed = Vec::new();
        let mut abandoned = Vec::new();
        let mut skipped = 0;

        for target in table {
            if cached.contains(target) {
                debug!(listing = %target, "Cached, skipping");
                skipped += 1;
                continue;
            }

            info!(listing = %target, "Processing");
            match self.source.assemble(target).await {
                Ok(record) => {
                    store.insert(&record)?;
                    cached.insert(target.clone());
                    processed.push(target.clone());
                    info!(
                        listing = %target,
                        images = record.images.len(),
                        reviews = record.reviews.len(),
                        "Stored"
                    );
                }
                Err(e) if e.is_listing_scoped() => {
                    warn!(listing = %target, "Abandoning listing for this run: {e}");
                    abandoned.push(target.clone());
                }
                Err(e) => return Err(e),
            }

            debug!(delay_secs = self.pacing.as_secs_f32(), "Waiting...");
            tokio::time::sleep(self.pacing).await;
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            processed,
            skipped,
            abandoned,
        };
        info!(
            processed = report.processed.len(),
            skipped = report.skipped,
            abandoned = report.abandoned.len(),
            elapsed_secs = (report.finished_at - report.started_at).num_seconds(),
            "Run finished"
        );
        Ok(report)
    }
}
