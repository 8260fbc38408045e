mod harness;

use harness::{detail_page, gallery_states, page, reviews_page, ReviewRow};
use listing_harvest::error::PageError;
use listing_harvest::models::{Fragment, ReviewEntry, NA, RATING_CRITERIA};
use listing_harvest::scrapers::extractors::{
    EchoExtractor, FieldExtractor, GalleryExtractor, HostExtractor, LocationExtractor,
    RatingExtractor, ReviewExtractor,
};
use listing_harvest::scrapers::{RenderedPage, Selectors, SnapshotPage};
use std::collections::BTreeMap;

const URL: &str = "https://listings.test/rooms/12345";

async fn loaded(states: Vec<String>) -> SnapshotPage {
    let page = SnapshotPage::new().route(URL, states);
    page.navigate(URL).await.unwrap();
    page
}

async fn extract(extractor: &dyn FieldExtractor, page: &SnapshotPage) -> Fragment {
    extractor
        .extract(page, &Selectors::default())
        .await
        .expect("extraction never fails on a healthy page")
}

#[tokio::test]
async fn location_reads_coordinates_from_map_link() {
    let page = loaded(vec![detail_page("15.072", "17.243")]).await;

    assert_eq!(
        extract(&LocationExtractor, &page).await,
        Fragment::Location {
            lat: "15.072".to_string(),
            lng: "17.243".to_string(),
        }
    );
}

#[tokio::test]
async fn location_without_decimal_tokens_is_na() {
    let page = loaded(vec![page(
        r#"<div data-veloute="map/GoogleMap">
             <a href="https://maps.google.com/maps?q=goa">Open map</a>
           </div>"#,
    )])
    .await;

    assert_eq!(extract(&LocationExtractor, &page).await, Fragment::location_na());
}

#[tokio::test]
async fn location_without_map_is_na() {
    let page = loaded(vec![page("<p>No map here</p>")]).await;
    assert_eq!(extract(&LocationExtractor, &page).await, Fragment::location_na());
}

#[tokio::test]
async fn ratings_are_criterion_score_pairs() {
    let page = loaded(vec![detail_page("1.0", "2.0")]).await;

    let Fragment::Ratings(ratings) = extract(&RatingExtractor, &page).await else {
        panic!("expected ratings");
    };
    assert_eq!(ratings.len(), 6);
    assert_eq!(ratings["Communication"], "4.27");
    assert_eq!(ratings["Value"], "4.8");
}

#[tokio::test]
async fn ratings_fall_back_to_six_na_criteria() {
    let page = loaded(vec![page(r#"<div data-section-id="REVIEWS_DEFAULT"></div>"#)]).await;

    let expected: BTreeMap<String, String> = RATING_CRITERIA
        .iter()
        .map(|c| (c.to_string(), NA.to_string()))
        .collect();
    assert_eq!(
        extract(&RatingExtractor, &page).await,
        Fragment::Ratings(expected)
    );
}

#[tokio::test]
async fn host_profile_splits_name_and_join_date() {
    let page = loaded(vec![detail_page("1.0", "2.0")]).await;

    assert_eq!(
        extract(&HostExtractor, &page).await,
        Fragment::Host {
            host: "Jane Doe".to_string(),
            joining_date: "Joined in November 2018".to_string(),
            host_details: "Superhost. Responds within an hour.".to_string(),
        }
    );
}

#[tokio::test]
async fn host_profile_is_all_or_nothing() {
    // Name block present, details block missing: no partial fragment
    let page = loaded(vec![page(
        r#"<div data-section-id="HOST_PROFILE_DEFAULT">
             <div class="_svr7sj"><h2>Jane</h2><span>Joined in 2018</span></div>
           </div>"#,
    )])
    .await;

    assert_eq!(extract(&HostExtractor, &page).await, Fragment::host_na());
}

#[tokio::test]
async fn gallery_follows_next_until_it_disappears() {
    let urls = [
        "https://img.test/1.jpg",
        "https://img.test/2.jpg",
        "https://img.test/3.jpg",
        "https://img.test/4.jpg",
    ];
    let page = loaded(gallery_states(&urls)).await;

    assert_eq!(
        extract(&GalleryExtractor::new(500), &page).await,
        Fragment::Images(urls.iter().map(|u| u.to_string()).collect())
    );
    assert_eq!(page.clicks(), 3);
}

#[tokio::test]
async fn gallery_stops_at_the_page_cap() {
    // Every state points back at itself, so "Next" never goes away
    let looping = page(
        r#"<img class="_6tbg2q" data-original-uri="https://img.test/same.jpg">
           <button aria-label="Next" data-click-state="0">›</button>"#,
    );
    let page = loaded(vec![looping]).await;

    let Fragment::Images(images) = extract(&GalleryExtractor::new(3), &page).await else {
        panic!("expected images");
    };
    assert_eq!(images.len(), 3);
}

#[tokio::test]
async fn reviews_are_read_after_expansion() {
    let truncated = reviews_page(
        &[ReviewRow {
            user: "John",
            date: "September 2020",
            body: "Great place...",
        }],
        Some(1),
    );
    let expanded = reviews_page(
        &[ReviewRow {
            user: "John",
            date: "September 2020",
            body: "Great place and amazing host, would stay again",
        }],
        None,
    );
    let page = loaded(vec![truncated, expanded]).await;

    assert_eq!(
        extract(&ReviewExtractor, &page).await,
        Fragment::Reviews(vec![ReviewEntry {
            user: "John".to_string(),
            date: "September 2020".to_string(),
            review: "Great place and amazing host, would stay again".to_string(),
        }])
    );
    assert_eq!(page.clicks(), 1);
}

/// Reviews modal where each row is either expanded or carries a "read more" control
/// leading to `expands_to`
fn rerendering_modal(rows: &[(&str, Option<usize>)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(body, expands_to)| {
            let expander = expands_to
                .map(|state| {
                    format!(r#"<button class="_ejra3kg" data-click-state="{state}">read more</button>"#)
                })
                .unwrap_or_default();
            format!(
                r#"<div class="_1gjypya">
                     <div class="_1oy2hpi"><h3>Guest</h3><span>May 2022</span></div>
                     <div class="_1y6fhhr"><span>{body}</span></div>
                     {expander}
                   </div>"#
            )
        })
        .collect();
    page(&format!(
        r#"<div data-testid="modal-container"><div class="_8rtpcxs">{rows}</div></div>"#
    ))
}

#[tokio::test]
async fn reviews_expand_when_every_click_rerenders_the_modal() {
    // Each click re-renders the modal, detaching the controls found before it
    let states = vec![
        rerendering_modal(&[("First...", Some(1)), ("Second...", Some(1))]),
        rerendering_modal(&[("First in full", None), ("Second...", Some(2))]),
        rerendering_modal(&[("First in full", None), ("Second in full", None)]),
    ];
    let page = loaded(states).await;

    let Fragment::Reviews(reviews) = extract(&ReviewExtractor, &page).await else {
        panic!("expected reviews");
    };
    let bodies: Vec<&str> = reviews.iter().map(|r| r.review.as_str()).collect();
    assert_eq!(bodies, ["First in full", "Second in full"]);
    assert_eq!(page.clicks(), 2);
}

#[tokio::test]
async fn handles_go_stale_after_a_rerendering_click() {
    let page = loaded(vec![
        rerendering_modal(&[("Short...", Some(1))]),
        rerendering_modal(&[("Short in full", None)]),
    ])
    .await;
    let selectors = Selectors::default();

    let body = page.find(None, &selectors.review_body).await.unwrap().unwrap();
    let expander = page
        .find(None, &selectors.review_expander)
        .await
        .unwrap()
        .unwrap();
    page.click(expander).await.unwrap();

    assert!(matches!(page.text(body).await, Err(PageError::UnknownNode(_))));
}

#[tokio::test]
async fn reviews_keep_dom_order_and_mark_malformed_authors() {
    let rows = reviews_page(
        &[
            ReviewRow {
                user: "Asha",
                date: "March 2021",
                body: "Clean and quiet",
            },
            ReviewRow {
                user: "Ravi",
                date: "",
                body: "Good value",
            },
        ],
        None,
    );
    let page = loaded(vec![rows]).await;

    let Fragment::Reviews(reviews) = extract(&ReviewExtractor, &page).await else {
        panic!("expected reviews");
    };
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].user, "Asha");
    assert_eq!(reviews[0].review, "Clean and quiet");
    assert_eq!((reviews[1].user.as_str(), reviews[1].date.as_str()), (NA, NA));
    assert_eq!(reviews[1].review, "Good value");
}

#[tokio::test]
async fn missing_reviews_modal_means_no_reviews() {
    let page = loaded(vec![page("<p>No reviews yet</p>")]).await;
    assert_eq!(
        extract(&ReviewExtractor, &page).await,
        Fragment::Reviews(Vec::new())
    );
}

#[tokio::test]
async fn echo_reads_identifier_from_url() {
    let page = loaded(vec![page("")]).await;
    let Fragment::Echo(Some(echoed)) = extract(&EchoExtractor, &page).await else {
        panic!("expected an echoed identifier");
    };
    assert_eq!(echoed.as_str(), "12345");
}
