//! HTML fixtures shaped like the listing site's detail, photos and reviews pages.

#![allow(dead_code)]

use listing_harvest::config::Timings;
use listing_harvest::models::ListingId;
use listing_harvest::scrapers::{RenderedPage, RoomAssembler, Selectors, SnapshotPage, SubPage};
use std::sync::Arc;

pub const BASE_URL: &str = "https://listings.test";

pub fn id(raw: &str) -> ListingId {
    ListingId::new(raw).expect("non-empty id")
}

pub fn page(body: &str) -> String {
    format!("<html><body>{body}</body></html>")
}

pub fn detail_page(lat: &str, lng: &str) -> String {
    page(&format!(
        r#"
        <div data-veloute="map/GoogleMap">
          <a href="https://maps.google.com/maps?q={lat},{lng}&z=14">Open map</a>
        </div>
        <div data-section-id="REVIEWS_DEFAULT">
          <div class="_1s11ltsf"><span>Cleanliness</span><span>5.0</span></div>
          <div class="_1s11ltsf"><span>Communication</span><span>4.27</span></div>
          <div class="_1s11ltsf"><span>Check-in</span><span>2.5</span></div>
          <div class="_1s11ltsf"><span>Accuracy</span><span>4.5</span></div>
          <div class="_1s11ltsf"><span>Location</span><span>2.5</span></div>
          <div class="_1s11ltsf"><span>Value</span><span>4.8</span></div>
        </div>
        <div data-section-id="HOST_PROFILE_DEFAULT">
          <div class="_svr7sj"><h2>Jane Doe</h2><span>Joined in November 2018</span></div>
          <div class="_1byskwn">Superhost. Responds within an hour.</div>
        </div>
        "#
    ))
}

/// One document state per image; every state but the last has a "Next" control
pub fn gallery_states(urls: &[&str]) -> Vec<String> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| {
            let next = if i + 1 < urls.len() {
                format!(r#"<button aria-label="Next" data-click-state="{}">›</button>"#, i + 1)
            } else {
                String::new()
            };
            page(&format!(
                r#"<div role="dialog"><img class="_6tbg2q" data-original-uri="{url}">{next}</div>"#
            ))
        })
        .collect()
}

pub struct ReviewRow<'a> {
    pub user: &'a str,
    pub date: &'a str,
    pub body: &'a str,
}

pub fn reviews_page(rows: &[ReviewRow<'_>], expander_state: Option<usize>) -> String {
    let rows: String = rows
        .iter()
        .map(|r| {
            let expander = match expander_state {
                Some(state) => format!(
                    r#"<button class="_ejra3kg" data-click-state="{state}">read more</button>"#
                ),
                None => String::new(),
            };
            format!(
                r#"<div class="_1gjypya">
                     <div class="_1oy2hpi"><h3>{}</h3><span>{}</span></div>
                     <div class="_1y6fhhr"><span>{}</span></div>
                     {expander}
                   </div>"#,
                r.user, r.date, r.body
            )
        })
        .collect();
    page(&format!(
        r#"<div data-testid="modal-container"><div class="_8rtpcxs">{rows}</div></div>"#
    ))
}

/// Snapshot routes for a complete listing with two photos and one review
pub fn listing_routes(page: SnapshotPage, target: &str) -> SnapshotPage {
    let target = id(target);
    page.route(
        SubPage::Detail.url(BASE_URL, &target),
        vec![detail_page("15.072", "17.243")],
    )
    .route(
        SubPage::Photos.url(BASE_URL, &target),
        gallery_states(&["https://img.test/a.jpg", "https://img.test/b.jpg"]),
    )
    .route(
        SubPage::Reviews.url(BASE_URL, &target),
        vec![reviews_page(
            &[ReviewRow {
                user: "John",
                date: "September 2020",
                body: "Lovely stay",
            }],
            None,
        )],
    )
}

pub fn assembler(page: Arc<SnapshotPage>) -> RoomAssembler {
    let page: Arc<dyn RenderedPage> = page;
    RoomAssembler::new(page, BASE_URL, Selectors::default(), Timings::immediate())
}
