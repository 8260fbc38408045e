use serde::{Deserialize, Serialize};

/// CSS selectors for every structure the extractors read.
/// The site ships hashed class names that churn, so they live here rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Embedded map block on the detail page
    pub map_section: String,
    /// Outbound map link inside the map block
    pub map_link: String,
    /// One per-criterion score element
    pub rating_metric: String,
    pub host_section: String,
    /// Name and join date, two lines
    pub host_name_block: String,
    pub host_details_block: String,
    /// Image currently shown in the photo viewer
    pub gallery_image: String,
    /// Attribute of the gallery image carrying the full-size URL
    pub gallery_image_attr: String,
    pub gallery_next: String,
    pub review_modal: String,
    /// "Read more" expander inside the modal
    pub review_expander: String,
    pub review_row: String,
    /// User and date, two lines
    pub review_author: String,
    pub review_body: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            map_section: r#"div[data-veloute="map/GoogleMap"]"#.to_string(),
            map_link: r#"a[href^="https://maps.google.com/maps"]"#.to_string(),
            rating_metric: r#"div[data-section-id="REVIEWS_DEFAULT"] ._1s11ltsf"#.to_string(),
            host_section: r#"div[data-section-id="HOST_PROFILE_DEFAULT"]"#.to_string(),
            host_name_block: "._svr7sj".to_string(),
            host_details_block: "._1byskwn".to_string(),
            gallery_image: "img._6tbg2q".to_string(),
            gallery_image_attr: "data-original-uri".to_string(),
            gallery_next: r#"button[aria-label="Next"]"#.to_string(),
            review_modal: r#"div[data-testid="modal-container"]"#.to_string(),
            review_expander: "button._ejra3kg".to_string(),
            review_row: "div._8rtpcxs div._1gjypya".to_string(),
            review_author: "._1oy2hpi".to_string(),
            review_body: "._1y6fhhr".to_string(),
        }
    }
}
