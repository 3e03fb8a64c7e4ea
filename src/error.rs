//! Error taxonomy for the worksheet engine.
//!
//! Only failures that affect the ability to render or exchange data become
//! errors. Per-gesture conditions (a micro-drag below the minimum zone size,
//! a pointer coordinate outside the buffer) are absorbed at the site where
//! they occur and never surface here.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlateError {
    /// The worksheet background image could not be opened or decoded.
    /// The surface keeps the previous page's content when this is returned.
    #[error("failed to load worksheet image '{}': {source}", .path.display())]
    ResourceLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The zone-definition payload is not valid JSON.
    #[error("zone payload is not valid JSON: {0}")]
    PayloadParse(#[from] serde_json::Error),

    /// The zone-definition payload parsed but violates the schema
    /// (unsupported version, non-positive zone dimensions, ...).
    #[error("zone payload rejected: {0}")]
    PayloadInvalid(String),

    /// Encoding the flattened composite failed.
    #[error("failed to encode composite image: {0}")]
    Encode(image::ImageError),

    /// Plain filesystem failure while reading or writing an exchange file.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A jump target outside the worksheet sequence.
    #[error("page index {index} out of range (worksheet has {len} pages)")]
    PageOutOfRange { index: usize, len: usize },
}
