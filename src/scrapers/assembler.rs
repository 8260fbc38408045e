use crate::config::Timings;
use crate::error::Result;
use crate::models::{ListingDraft, ListingId, ListingRecord};
use crate::scrapers::extractors::{
    EchoExtractor, FieldExtractor, GalleryExtractor, HostExtractor, LocationExtractor,
    RatingExtractor, ReviewExtractor,
};
use crate::scrapers::readiness::PageReadiness;
use crate::scrapers::traits::RenderedPage;
use crate::scrapers::types::Selectors;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub const ROOM_PATH_SEGMENT: &str = "rooms";

/// Produces a complete record for one listing identifier
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn assemble(&self, target: &ListingId) -> Result<ListingRecord>;
}

/// Sub-pages of one listing, visited in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubPage {
    Detail,
    Photos,
    Reviews,
}

impl SubPage {
    pub fn url(self, base_url: &str, target: &ListingId) -> String {
        let room = format!("{base_url}/{ROOM_PATH_SEGMENT}/{target}");
        match self {
            SubPage::Detail => room,
            SubPage::Photos => format!("{room}/photos/"),
            SubPage::Reviews => format!("{room}/reviews/"),
        }
    }
}

/// Visits detail, photos and reviews pages of a listing and merges every extractor's
/// fragment into one record. Nothing is kept if any step fails part way.
pub struct RoomAssembler {
    page: Arc<dyn RenderedPage>,
    base_url: String,
    selectors: Selectors,
    readiness: PageReadiness,
    detail: Vec<Box<dyn FieldExtractor>>,
    photos: Box<dyn FieldExtractor>,
    reviews: Box<dyn FieldExtractor>,
}

impl RoomAssembler {
    pub fn new(
        page: Arc<dyn RenderedPage>,
        base_url: impl Into<String>,
        selectors: Selectors,
        timings: Timings,
    ) -> Self {
        let max_gallery_pages = timings.max_gallery_pages;
        Self {
            page,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            selectors,
            readiness: PageReadiness::new(timings),
            detail: vec![
                Box::new(EchoExtractor),
                Box::new(LocationExtractor),
                Box::new(RatingExtractor),
                Box::new(HostExtractor),
            ],
            photos: Box::new(GalleryExtractor::new(max_gallery_pages)),
            reviews: Box::new(ReviewExtractor),
        }
    }

    async fn visit(&self, sub_page: SubPage, target: &ListingId) -> Result<()> {
        let url = sub_page.url(&self.base_url, target);
        self.readiness.open(self.page.as_ref(), &url).await
    }

    async fn run_extractor(
        &self,
        extractor: &dyn FieldExtractor,
        draft: &mut ListingDraft,
    ) -> Result<()> {
        let fragment = extractor
            .extract(self.page.as_ref(), &self.selectors)
            .await?;
        draft.merge(fragment);
        info!(listing = %draft.target(), stage = extractor.name(), "Done");
        Ok(())
    }
}

#[async_trait]
impl ListingSource for RoomAssembler {
    async fn assemble(&self, target: &ListingId) -> Result<ListingRecord> {
        let mut draft = ListingDraft::new(target.clone());

        // Detail page: rating and host sections load lazily and need the scroll sweep
        self.visit(SubPage::Detail, target).await?;
        self.readiness.sweep(self.page.as_ref()).await;
        for extractor in &self.detail {
            self.run_extractor(extractor.as_ref(), &mut draft).await?;
        }
        if let Some(echoed) = draft.echoed() {
            if echoed != target {
                warn!(listing = %target, %echoed, "Detail page redirected to another listing");
            }
        }

        self.visit(SubPage::Photos, target).await?;
        self.run_extractor(self.photos.as_ref(), &mut draft).await?;

        self.visit(SubPage::Reviews, target).await?;
        self.run_extractor(self.reviews.as_ref(), &mut draft).await?;

        Ok(draft.finish())
    }
}
