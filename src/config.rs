// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::processing::{AlignmentPolicy, SeriesAligner};

/// Settings of one analysis run, read from JSON. Every field is optional.
///
/// ```json
/// { "data_dir": "data", "water_mask_percentile": 50, "alignment": "clip", "row_clip": 15 }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_water_mask_percentile")]
    pub water_mask_percentile: u8,
    #[serde(default)]
    pub alignment: AlignmentPolicy,
    #[serde(default)]
    pub anomalous_index: usize,
    #[serde(default = "default_row_clip")]
    pub row_clip: isize,
    #[serde(default = "default_true")]
    pub render_images: bool,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    #[serde(default = "default_histogram_range")]
    pub histogram_range: (f64, f64),
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("figures")
}

fn default_water_mask_percentile() -> u8 {
    50
}

// The first scene of the reference strip is short by 15 rows at the top edge.
fn default_row_clip() -> isize {
    15
}

fn default_true() -> bool {
    true
}

fn default_histogram_bins() -> usize {
    100
}

fn default_histogram_range() -> (f64, f64) {
    (0.01, 1.0)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            water_mask_percentile: default_water_mask_percentile(),
            alignment: AlignmentPolicy::default(),
            anomalous_index: 0,
            row_clip: default_row_clip(),
            render_images: default_true(),
            histogram_bins: default_histogram_bins(),
            histogram_range: default_histogram_range(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn aligner(&self) -> SeriesAligner {
        SeriesAligner::new(self.alignment, self.anomalous_index, self.row_clip)
    }

    pub fn water_percentile(&self) -> f64 {
        f64::from(self.water_mask_percentile)
    }
}
