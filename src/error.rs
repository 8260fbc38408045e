use std::path::PathBuf;
use thiserror::Error;

use crate::models::ListingId;

pub type Result<T> = core::result::Result<T, HarvestError>;

/// Failures of a rendered-page backend. Absence of an element is not one of them.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Handle never issued, or its element was detached by a re-render
    #[error("Node handle {0} no longer resolves on this page")]
    UnknownNode(u32),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Browser driver error: {0}")]
    Driver(String),
}

impl PageError {
    pub(crate) fn driver(err: impl std::fmt::Display) -> Self {
        PageError::Driver(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Io Error on store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store {path} is not a valid document file: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode record for {0}: {1}")]
    Encode(ListingId, #[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Could not read identifier table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Identifier table {0} has no `target` column")]
    MissingTargetColumn(PathBuf),
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Page at {url} did not render after {attempts} attempt(s)")]
    RenderTimeout { url: String, attempts: u32 },

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}

impl HarvestError {
    /// Whether the runner may abandon the current listing and carry on with the next one
    pub fn is_listing_scoped(&self) -> bool {
        matches!(self, HarvestError::RenderTimeout { .. })
    }
}
