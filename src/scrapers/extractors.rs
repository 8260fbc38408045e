use crate::error::PageError;
use crate::models::{Fragment, ListingId, ReviewEntry, NA};
use crate::scrapers::assembler::ROOM_PATH_SEGMENT;
use crate::scrapers::traits::RenderedPage;
use crate::scrapers::types::Selectors;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static COORDINATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("valid regex"));

/// Reads one fragment from the currently rendered page.
///
/// Structural absence and malformed text never surface as errors: the extractor returns
/// its sentinel fragment instead. Errors are reserved for driver failures.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        selectors: &Selectors,
    ) -> Result<Fragment, PageError>;

    fn name(&self) -> &'static str;
}

/// Latitude and longitude from the embedded map's outbound link
pub struct LocationExtractor;

#[async_trait]
impl FieldExtractor for LocationExtractor {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        selectors: &Selectors,
    ) -> Result<Fragment, PageError> {
        let Some(section) = page.find(None, &selectors.map_section).await? else {
            debug!("No map section");
            return Ok(Fragment::location_na());
        };
        let Some(link) = page.find(Some(section), &selectors.map_link).await? else {
            debug!("No map link");
            return Ok(Fragment::location_na());
        };
        let Some(href) = page.attribute(link, "href").await? else {
            return Ok(Fragment::location_na());
        };

        Ok(match parse_coordinates(&href) {
            Some((lat, lng)) => Fragment::Location { lat, lng },
            None => {
                debug!(href, "Map link carries no coordinate pair");
                Fragment::location_na()
            }
        })
    }

    fn name(&self) -> &'static str {
        "location"
    }
}

/// Per-criterion scores from the reviews section of the detail page
pub struct RatingExtractor;

#[async_trait]
impl FieldExtractor for RatingExtractor {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        selectors: &Selectors,
    ) -> Result<Fragment, PageError> {
        let mut ratings = BTreeMap::new();
        for metric in page.find_all(None, &selectors.rating_metric).await? {
            let text = page.text(metric).await?;
            match split_pair(&text) {
                Some((criterion, score)) => {
                    ratings.insert(criterion, score);
                }
                None => warn!(text, "Skipping rating element that is not criterion/score"),
            }
        }

        if ratings.is_empty() {
            debug!("No rating metrics found");
            return Ok(Fragment::ratings_na());
        }
        Ok(Fragment::Ratings(ratings))
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

/// Host name, join date and free-text details
pub struct HostExtractor;

#[async_trait]
impl FieldExtractor for HostExtractor {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        selectors: &Selectors,
    ) -> Result<Fragment, PageError> {
        let Some(profile) = page.find(None, &selectors.host_section).await? else {
            debug!("No host profile section");
            return Ok(Fragment::host_na());
        };
        let Some(name_block) = page.find(Some(profile), &selectors.host_name_block).await? else {
            return Ok(Fragment::host_na());
        };
        let Some(details_block) = page
            .find(Some(profile), &selectors.host_details_block)
            .await?
        else {
            return Ok(Fragment::host_na());
        };

        let name_text = page.text(name_block).await?;
        let Some((host, joining_date)) = split_pair(&name_text) else {
            warn!(text = name_text, "Host block is not name/join date");
            return Ok(Fragment::host_na());
        };
        let details = page.text(details_block).await?;

        Ok(Fragment::Host {
            host,
            joining_date,
            host_details: or_na(details.trim()),
        })
    }

    fn name(&self) -> &'static str {
        "host profile"
    }
}

/// Walks the photo viewer with its "next" control, collecting image URLs in display order
pub struct GalleryExtractor {
    max_pages: usize,
}

impl GalleryExtractor {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }
}

#[async_trait]
impl FieldExtractor for GalleryExtractor {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        selectors: &Selectors,
    ) -> Result<Fragment, PageError> {
        let mut images = Vec::new();

        for _ in 0..self.max_pages {
            let Some(image) = page.find(None, &selectors.gallery_image).await? else {
                return Ok(Fragment::Images(images));
            };
            match page.attribute(image, &selectors.gallery_image_attr).await? {
                Some(url) => images.push(url),
                None => warn!(position = images.len(), "Gallery image without a URL"),
            }

            let Some(next) = page.find(None, &selectors.gallery_next).await? else {
                return Ok(Fragment::Images(images));
            };
            page.click(next).await?;
        }

        warn!(
            max_pages = self.max_pages,
            "Gallery still had a next control at the page cap"
        );
        Ok(Fragment::Images(images))
    }

    fn name(&self) -> &'static str {
        "images"
    }
}

/// Guest reviews from the reviews modal, read after every expander was clicked
pub struct ReviewExtractor;

#[async_trait]
impl FieldExtractor for ReviewExtractor {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        selectors: &Selectors,
    ) -> Result<Fragment, PageError> {
        let Some(modal) = page.find(None, &selectors.review_modal).await? else {
            debug!("No reviews modal");
            return Ok(Fragment::Reviews(Vec::new()));
        };

        let pending = page
            .find_all(Some(modal), &selectors.review_expander)
            .await?
            .len();
        let expanded = expand_reviews(page, selectors, pending).await?;

        let Some(modal) = page.find(None, &selectors.review_modal).await? else {
            return Ok(Fragment::Reviews(Vec::new()));
        };

        let mut reviews = Vec::new();
        for row in page.find_all(Some(modal), &selectors.review_row).await? {
            let (user, date) = match page.find(Some(row), &selectors.review_author).await? {
                Some(author) => {
                    let text = page.text(author).await?;
                    split_pair(&text).unwrap_or_else(|| {
                        warn!(text, "Review author block is not user/date");
                        (NA.to_string(), NA.to_string())
                    })
                }
                None => (NA.to_string(), NA.to_string()),
            };
            let review = match page.find(Some(row), &selectors.review_body).await? {
                Some(body) => or_na(page.text(body).await?.trim()),
                None => NA.to_string(),
            };
            reviews.push(ReviewEntry { user, date, review });
        }

        debug!(expanded, rows = reviews.len(), "Reviews read");
        Ok(Fragment::Reviews(reviews))
    }

    fn name(&self) -> &'static str {
        "reviews"
    }
}

/// Click `pending` "read more" controls, one per render.
///
/// Every click may re-render the modal and detach the handles found before it, so the
/// modal and its controls are looked up again each round. Controls are clicked in
/// document order: whether a clicked control disappears or stays, the unclicked ones
/// are the last `pending - clicked` matches.
async fn expand_reviews(
    page: &dyn RenderedPage,
    selectors: &Selectors,
    pending: usize,
) -> Result<usize, PageError> {
    let mut clicked = 0;
    while clicked < pending {
        let Some(modal) = page.find(None, &selectors.review_modal).await? else {
            break;
        };
        let controls = page
            .find_all(Some(modal), &selectors.review_expander)
            .await?;
        let next = controls.len().saturating_sub(pending - clicked);
        let Some(&control) = controls.get(next) else {
            break;
        };
        match page.click(control).await {
            Ok(()) => {}
            Err(PageError::UnknownNode(_)) => debug!("Expander detached before its click"),
            Err(e) => return Err(e),
        }
        clicked += 1;
    }
    Ok(clicked)
}

/// Listing identifier read back from the current page URL
pub struct EchoExtractor;

#[async_trait]
impl FieldExtractor for EchoExtractor {
    async fn extract(
        &self,
        page: &dyn RenderedPage,
        _selectors: &Selectors,
    ) -> Result<Fragment, PageError> {
        let url = page.current_url().await?;
        Ok(Fragment::Echo(listing_id_from_url(&url)))
    }

    fn name(&self) -> &'static str {
        "identifier"
    }
}

/// First two decimal tokens of a map URL, as (lat, lng)
pub fn parse_coordinates(url: &str) -> Option<(String, String)> {
    let mut tokens = COORDINATE.find_iter(url).map(|m| m.as_str().to_string());
    let lat = tokens.next()?;
    let lng = tokens.next()?;
    Some((lat, lng))
}

/// Split element text into exactly two non-empty lines
pub fn split_pair(text: &str) -> Option<(String, String)> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next()?;
    let second = lines.next()?;
    if lines.next().is_some() {
        return None;
    }
    Some((first.to_string(), second.to_string()))
}

/// Path segment following `/rooms/`, ignoring query and fragment
pub fn listing_id_from_url(url: &str) -> Option<ListingId> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == ROOM_PATH_SEGMENT)?;
    segments.next().and_then(ListingId::new)
}

fn or_na(text: &str) -> String {
    if text.is_empty() {
        NA.to_string()
    } else {
        text.to_string()
    }
}
