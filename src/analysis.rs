// src/analysis.rs
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::processing::mask::{reliability_mask, scene_mask};
use crate::processing::stats::{kept_pixels, series_statistics, trend, NdviStatistic};
use crate::processing::AlignmentPolicy;
use crate::scene::Scene;

/// Percentile that disables the water mask (nothing lies above the maximum).
pub const NO_WATER_MASK: f64 = 100.0;

/// Density-normalised histogram over equal-width bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub density: Vec<f64>,
}

impl Histogram {
    /// Values outside `range` are ignored; the last bin includes its upper edge.
    pub fn new(values: &[f64], bins: usize, range: (f64, f64)) -> Self {
        let (lo, hi) = range;
        let bins = bins.max(1);
        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0usize; bins];
        for &v in values {
            if !(lo..=hi).contains(&v) {
                continue;
            }
            let bin = (((v - lo) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        let total: usize = counts.iter().sum();
        let density = counts
            .iter()
            .map(|&c| {
                if total == 0 || width <= 0.0 {
                    0.0
                } else {
                    c as f64 / (total as f64 * width)
                }
            })
            .collect();

        Self { edges, density }
    }
}

/// NDVI pixels of every scene, either the masked sample or the full scene.
pub fn ndvi_pixels(series: &[Scene], apply_mask: bool, water_percentile: f64) -> Result<Vec<Vec<f64>>> {
    let reliability = reliability_mask(series)?;

    series
        .iter()
        .map(|scene| {
            let ndvi = scene.ndvi(true);
            if apply_mask {
                let mask = scene_mask(scene, &reliability, water_percentile)?;
                Ok(kept_pixels(&ndvi, &mask))
            } else {
                Ok(ndvi.iter().copied().collect())
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneReport {
    pub key: String,
    pub acquired: DateTime<Utc>,
    pub label: String,
    pub shape: (usize, usize),
    pub statistic: Option<NdviStatistic>,
    pub error: Option<String>,
    pub kept_pixels: usize,
    pub histogram_masked: Histogram,
    pub histogram_unmasked: Histogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub per_day: Option<f64>,
    pub error: Option<String>,
}

/// Same scene with and without the water mask, both under the reliability mask.
#[derive(Debug, Clone, Serialize)]
pub struct WaterMaskComparison {
    pub key: String,
    pub without_water_mask: Option<NdviStatistic>,
    pub with_water_mask: Option<NdviStatistic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub water_mask_percentile: f64,
    pub alignment: AlignmentPolicy,
    pub scenes: Vec<SceneReport>,
    pub rate_of_change: Vec<RateReport>,
    pub water_mask_comparison: Vec<WaterMaskComparison>,
}

/// Runs the full measurement over an aligned strip.
///
/// Scenes whose mask keeps no pixel are reported with their error and left
/// out of the rate-of-change series.
pub fn analyze(series: &[Scene], config: &AnalysisConfig) -> Result<AnalysisReport> {
    let water_percentile = config.water_percentile();
    info!(
        "analyzing {} scenes with a {} percentile water mask",
        series.len(),
        water_percentile
    );

    let stats = series_statistics(series, water_percentile)?;
    let unmasked_stats = series_statistics(series, NO_WATER_MASK)?;
    let masked = ndvi_pixels(series, true, water_percentile)?;
    let unmasked = ndvi_pixels(series, false, water_percentile)?;

    let mut scenes = Vec::with_capacity(series.len());
    let mut kept = Vec::with_capacity(series.len());
    for (((scene, stat), masked), unmasked) in series.iter().zip(&stats).zip(&masked).zip(&unmasked) {
        let (statistic, error) = match stat {
            Ok(s) => {
                kept.push(*s);
                (Some(*s), None)
            }
            Err(e) => {
                warn!("{}: excluded from trend: {e}", scene.key());
                (None, Some(e.to_string()))
            }
        };
        scenes.push(SceneReport {
            key: scene.key().to_string(),
            acquired: scene.acquired(),
            label: scene.acquired_label(),
            shape: scene.shape(),
            statistic,
            error,
            kept_pixels: masked.len(),
            histogram_masked: Histogram::new(masked, config.histogram_bins, config.histogram_range),
            histogram_unmasked: Histogram::new(unmasked, config.histogram_bins, config.histogram_range),
        });
    }

    let rate_of_change = kept
        .windows(2)
        .zip(trend(&kept))
        .map(|(pair, rate)| {
            let (per_day, error) = match rate {
                Ok(r) => (Some(r), None),
                Err(e) => {
                    warn!("{e}");
                    (None, Some(e.to_string()))
                }
            };
            RateReport {
                from: pair[0].acquired,
                to: pair[1].acquired,
                per_day,
                error,
            }
        })
        .collect();

    let water_mask_comparison = series
        .iter()
        .zip(stats.iter().zip(&unmasked_stats))
        .map(|(scene, (with, without))| WaterMaskComparison {
            key: scene.key().to_string(),
            without_water_mask: without.as_ref().ok().copied(),
            with_water_mask: with.as_ref().ok().copied(),
        })
        .collect();

    Ok(AnalysisReport {
        water_mask_percentile: water_percentile,
        alignment: config.alignment,
        scenes,
        rate_of_change,
        water_mask_comparison,
    })
}

/// Report file name, following the figure naming of the plots it feeds.
pub fn report_file_name(config: &AnalysisConfig) -> String {
    let mut name = String::from("ndvi_report");
    if config.alignment == AlignmentPolicy::Drop {
        name.push_str("_dropped");
    }
    name.push_str(&format!("_blue{}.json", config.water_mask_percentile));
    name
}
