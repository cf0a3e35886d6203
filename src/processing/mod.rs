// src/processing/mod.rs
pub mod align;
pub mod indices;
pub mod mask;
pub mod stats;

// Re-export main components
pub use align::{AlignmentPolicy, SeriesAligner};
pub use mask::{reliability_mask, scene_mask, Mask};
pub use stats::{rate_of_change, series_statistics, NdviStatistic};
