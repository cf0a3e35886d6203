// src/processing/align.rs
use std::path::PathBuf;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::{MetadataSource, RasterSource};
use crate::scene::Scene;

/// What to do with the scene whose extent differs from the rest of the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Keep every scene and clip the others down to the anomalous one.
    #[default]
    Clip,
    /// Remove the anomalous scene from the strip.
    Drop,
}

/// Brings every scene of a strip to one shape using a fixed clipping
/// convention. Nothing is inferred from the data: which scene is anomalous
/// and how many rows to clip (and from which edge) are configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesAligner {
    policy: AlignmentPolicy,
    anomalous_index: usize,
    row_clip: isize,
}

impl SeriesAligner {
    /// `row_clip` follows [`Scene::clipped`]: positive trims the top, negative the bottom.
    pub fn new(policy: AlignmentPolicy, anomalous_index: usize, row_clip: isize) -> Self {
        Self {
            policy,
            anomalous_index,
            row_clip,
        }
    }

    /// Pairs each kept item with the row clip it needs.
    pub fn plan<T>(&self, items: Vec<T>) -> Vec<(T, Option<isize>)> {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match self.policy {
                AlignmentPolicy::Drop if i == self.anomalous_index => None,
                AlignmentPolicy::Drop => Some((item, None)),
                AlignmentPolicy::Clip if i == self.anomalous_index => Some((item, None)),
                AlignmentPolicy::Clip => Some((item, Some(self.row_clip))),
            })
            .collect()
    }

    /// Aligns scenes that are already in memory.
    pub fn align(&self, scenes: Vec<Scene>) -> Result<Vec<Scene>> {
        let aligned = self
            .plan(scenes)
            .into_iter()
            .map(|(scene, clip)| match clip {
                Some(clip) => scene.clipped(clip),
                None => Ok(scene),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::verify(&aligned)?;
        Ok(aligned)
    }

    /// Loads a strip from image paths (sorted by acquisition), aligning each
    /// scene as it is read. Scenes are independent, so they load in parallel.
    pub fn load<R, M>(&self, paths: Vec<PathBuf>, raster: &R, metadata: &M) -> Result<Vec<Scene>>
    where
        R: RasterSource + ?Sized,
        M: MetadataSource + ?Sized,
    {
        if self.policy == AlignmentPolicy::Drop {
            if let Some(path) = paths.get(self.anomalous_index) {
                info!("dropping {} from the strip", path.display());
            }
        }

        let scenes = self
            .plan(paths)
            .into_par_iter()
            .map(|(path, clip)| Scene::open(&path, clip, raster, metadata))
            .collect::<Result<Vec<_>>>()?;
        Self::verify(&scenes)?;
        Ok(scenes)
    }

    /// Fails if any scene's shape differs from the first one's.
    pub fn verify(scenes: &[Scene]) -> Result<()> {
        let Some(first) = scenes.first() else {
            return Ok(());
        };
        let expected = first.shape();
        for scene in &scenes[1..] {
            if scene.shape() != expected {
                return Err(Error::ShapeMismatch {
                    context: format!("strip alignment ({} vs {})", first.key(), scene.key()),
                    expected,
                    actual: scene.shape(),
                });
            }
        }
        Ok(())
    }
}
