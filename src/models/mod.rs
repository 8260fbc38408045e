use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Marker for a field whose source element was absent or malformed
pub const NA: &str = "NA";

/// Rating criteria every persisted record carries
pub const RATING_CRITERIA: [&str; 6] = [
    "Cleanliness",
    "Communication",
    "Check-in",
    "Accuracy",
    "Location",
    "Value",
];

/// Opaque key naming one property on the listing site.
///
/// Identifier tables and older stores carry plain integers, newer ones strings; both
/// deserialize into the same canonical string form so cache lookups match either way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ListingId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ListingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = ListingId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a listing identifier as integer or string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ListingId, E> {
                Ok(ListingId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ListingId, E> {
                Ok(ListingId(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ListingId, E> {
                ListingId::new(v).ok_or_else(|| E::custom("empty listing identifier"))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One guest review, read after its "read more" control was expanded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEntry {
    pub user: String,
    pub date: String,
    pub review: String,
}

/// Partial record produced by exactly one extractor
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Location { lat: String, lng: String },
    Ratings(BTreeMap<String, String>),
    Host {
        host: String,
        joining_date: String,
        host_details: String,
    },
    Images(Vec<String>),
    Reviews(Vec<ReviewEntry>),
    Echo(Option<ListingId>),
}

impl Fragment {
    pub fn location_na() -> Self {
        Fragment::Location {
            lat: NA.to_string(),
            lng: NA.to_string(),
        }
    }

    pub fn ratings_na() -> Self {
        Fragment::Ratings(
            RATING_CRITERIA
                .iter()
                .map(|c| (c.to_string(), NA.to_string()))
                .collect(),
        )
    }

    pub fn host_na() -> Self {
        Fragment::Host {
            host: NA.to_string(),
            joining_date: NA.to_string(),
            host_details: NA.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Fragment::Location { .. } => "location",
            Fragment::Ratings(_) => "ratings",
            Fragment::Host { .. } => "host",
            Fragment::Images(_) => "images",
            Fragment::Reviews(_) => "reviews",
            Fragment::Echo(_) => "echo",
        }
    }
}

/// Accumulates fragments for one listing; every slot is written at most once
#[derive(Debug)]
pub struct ListingDraft {
    target: ListingId,
    location: Option<(String, String)>,
    ratings: BTreeMap<String, String>,
    host: Option<(String, String, String)>,
    images: Option<Vec<String>>,
    reviews: Option<Vec<ReviewEntry>>,
    echo: Option<ListingId>,
}

impl ListingDraft {
    pub fn new(target: ListingId) -> Self {
        Self {
            target,
            location: None,
            ratings: BTreeMap::new(),
            host: None,
            images: None,
            reviews: None,
            echo: None,
        }
    }

    pub fn target(&self) -> &ListingId {
        &self.target
    }

    /// Merge a fragment. Keys that are already set keep their first value.
    pub fn merge(&mut self, fragment: Fragment) {
        let kind = fragment.kind();
        let fresh = match fragment {
            Fragment::Location { lat, lng } => set_once(&mut self.location, (lat, lng)),
            Fragment::Ratings(pairs) => {
                let mut fresh = true;
                for (criterion, score) in pairs {
                    if self.ratings.contains_key(&criterion) {
                        fresh = false;
                    } else {
                        self.ratings.insert(criterion, score);
                    }
                }
                fresh
            }
            Fragment::Host {
                host,
                joining_date,
                host_details,
            } => set_once(&mut self.host, (host, joining_date, host_details)),
            Fragment::Images(urls) => set_once(&mut self.images, urls),
            Fragment::Reviews(entries) => set_once(&mut self.reviews, entries),
            Fragment::Echo(id) => {
                if let Some(id) = id {
                    set_once(&mut self.echo, id)
                } else {
                    true
                }
            }
        };
        if !fresh {
            warn!(listing = %self.target, fragment = kind, "Fragment merged twice; kept first value");
        }
    }

    /// Identifier read back from the page URL, if the echo extractor found one
    pub fn echoed(&self) -> Option<&ListingId> {
        self.echo.as_ref()
    }

    /// Close the draft, filling every declared key that no fragment supplied
    pub fn finish(self) -> ListingRecord {
        let (lat, lng) = self
            .location
            .unwrap_or_else(|| (NA.to_string(), NA.to_string()));
        let (host, joining_date, host_details) = self
            .host
            .unwrap_or_else(|| (NA.to_string(), NA.to_string(), NA.to_string()));
        let mut ratings = self.ratings;
        for criterion in RATING_CRITERIA {
            ratings
                .entry(criterion.to_string())
                .or_insert_with(|| NA.to_string());
        }

        ListingRecord {
            target: self.target,
            lat,
            lng,
            ratings,
            host,
            joining_date,
            host_details,
            images: self.images.unwrap_or_default(),
            reviews: self.reviews.unwrap_or_default(),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

/// Complete listing as persisted in the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub target: ListingId,
    pub lat: String,
    pub lng: String,
    /// Rating criteria sit at the top level of the stored document, next to `lat`/`lng`
    #[serde(flatten)]
    pub ratings: BTreeMap<String, String>,
    pub host: String,
    pub joining_date: String,
    pub host_details: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
}

impl ListingRecord {
    /// Score for a criterion, `None` only for criteria outside the fixed six that the
    /// page never showed
    pub fn rating(&self, criterion: &str) -> Option<&str> {
        self.ratings.get(criterion).map(String::as_str)
    }
}
