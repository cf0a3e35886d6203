// src/error.rs
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while loading scenes and computing strip statistics.
///
/// `MissingFile`, `ShapeMismatch` and `RowClip` are fatal for a run.
/// `EmptySelection` and `DegenerateTimeDelta` are reported per scene or per
/// pair so the caller can drop that data point and carry on.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{} missing", path.display())]
    MissingFile { path: PathBuf },

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("{kind} raster has {actual} bands, expected {expected}")]
    BandCount {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("row clip of {clip} leaves no rows in a raster with {rows} rows")]
    RowClip { clip: isize, rows: usize },

    #[error("{scene}: mask leaves no pixels to compute statistics over")]
    EmptySelection { scene: String },

    #[error("acquisition times {from} -> {to} (pair {index}) are not strictly increasing")]
    DegenerateTimeDelta {
        index: usize,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("percentile {0} outside of [0, 100]")]
    InvalidPercentile(f64),

    #[error("{timestamps} timestamps but {values} values")]
    LengthMismatch { timestamps: usize, values: usize },

    #[error("metadata error in {}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    #[error("raster error in {}: {reason}", path.display())]
    Raster { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
