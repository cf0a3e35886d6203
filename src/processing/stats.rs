// src/processing/stats.rs
use chrono::{DateTime, Utc};
use itertools::Itertools;
use ndarray::{Array2, Zip};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::processing::mask::{reliability_mask, scene_mask, Mask};
use crate::scene::Scene;
use crate::utils::numeric::{median, std_dev};

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Summary of one scene's masked NDVI sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NdviStatistic {
    pub acquired: DateTime<Utc>,
    pub median: f64,
    pub std_dev: f64,
}

/// Values of the pixels the mask keeps, in row-major order.
pub fn kept_pixels(values: &Array2<f64>, mask: &Mask) -> Vec<f64> {
    let mut kept = Vec::new();
    Zip::from(values).and(mask).for_each(|&v, &excluded| {
        if !excluded {
            kept.push(v);
        }
    });
    kept
}

/// Median and standard deviation of a sample; an empty sample is an error
/// tagged with the scene it came from.
pub fn summarize(scene: &Scene, sample: &[f64]) -> Result<NdviStatistic> {
    match (median(sample), std_dev(sample)) {
        (Some(median), Some(std_dev)) => Ok(NdviStatistic {
            acquired: scene.acquired(),
            median,
            std_dev,
        }),
        _ => Err(Error::EmptySelection {
            scene: scene.key().to_string(),
        }),
    }
}

/// NDVI statistics of every scene, in strip order.
///
/// The outer error is fatal (misaligned strip, bad percentile). Each inner
/// item is either the scene's statistic or an `EmptySelection` for a scene
/// whose mask kept nothing.
pub fn series_statistics(series: &[Scene], water_percentile: f64) -> Result<Vec<Result<NdviStatistic>>> {
    let reliability = reliability_mask(series)?;

    let mut stats = Vec::with_capacity(series.len());
    for scene in series {
        let mask = scene_mask(scene, &reliability, water_percentile)?;
        let ndvi = scene.ndvi(true);
        stats.push(summarize(scene, &kept_pixels(&ndvi, &mask)));
    }
    Ok(stats)
}

/// Exact elapsed time in (fractional) days.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    (delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) * 1e-9) / SECONDS_PER_DAY
}

fn pair_rate(index: usize, (t0, v0): (DateTime<Utc>, f64), (t1, v1): (DateTime<Utc>, f64)) -> Result<f64> {
    if t1 <= t0 {
        return Err(Error::DegenerateTimeDelta {
            index,
            from: t0,
            to: t1,
        });
    }
    Ok((v1 - v0) / days_between(t0, t1))
}

/// Per-day change between consecutive observations: `N` values give `N - 1` rates.
///
/// A pair whose timestamps do not strictly increase yields a
/// `DegenerateTimeDelta` in its slot; the other pairs are unaffected.
pub fn rate_of_change(acquired: &[DateTime<Utc>], values: &[f64]) -> Result<Vec<Result<f64>>> {
    if acquired.len() != values.len() {
        return Err(Error::LengthMismatch {
            timestamps: acquired.len(),
            values: values.len(),
        });
    }

    Ok(acquired
        .iter()
        .copied()
        .zip(values.iter().copied())
        .tuple_windows()
        .enumerate()
        .map(|(i, (a, b))| pair_rate(i, a, b))
        .collect())
}

/// Rate of change of the medians of a run of statistics.
pub fn trend(stats: &[NdviStatistic]) -> Vec<Result<f64>> {
    stats
        .iter()
        .map(|s| (s.acquired, s.median))
        .tuple_windows()
        .enumerate()
        .map(|(i, (a, b))| pair_rate(i, a, b))
        .collect()
}
