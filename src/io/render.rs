// src/io/render.rs
use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use log::info;
use ndarray::{concatenate, Array2, Axis, Zip};

use crate::error::{Error, Result};
use crate::scene::{Band, QualityFlag, Scene};

/// Linear min/max stretch of the finite values to 0..=255.
fn stretch(array: &Array2<f64>) -> GrayImage {
    let (min, max) = array
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    let (rows, cols) = array.dim();

    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = array[[y as usize, x as usize]];
        let level = if v.is_finite() && span > 0.0 {
            ((v - min) / span * 255.0).round() as u8
        } else {
            0
        };
        Luma([level])
    })
}

fn scene_stem(scene: &Scene) -> String {
    Path::new(scene.key())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| scene.key().to_string())
}

fn save(image: &GrayImage, path: PathBuf) -> Result<PathBuf> {
    image.save(&path)?;
    info!("{} saved", path.display());
    Ok(path)
}

/// One PNG per image band and per quality layer of a scene.
pub fn render_scene(scene: &Scene, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let stem = scene_stem(scene);

    let bands = Band::ALL.iter().map(|&b| {
        let path = output_dir.join(format!("{stem}_scenes_{}.png", b.name()));
        save(&stretch(scene.band(b)), path)
    });
    let flags = QualityFlag::ALL.iter().map(|&f| {
        let path = output_dir.join(format!("{stem}_udm2_{}.png", f.name()));
        save(&stretch(scene.quality(f)), path)
    });

    bands.chain(flags).collect()
}

/// Blue band split by the water mask: kept pixels on the left, excluded on the right.
pub fn render_water_mask(scene: &Scene, water_percentile: f64, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let blue = scene.band(Band::Blue);
    let mask = scene.percentile_mask(Band::Blue, water_percentile, true)?;

    let kept = Zip::from(blue)
        .and(&mask)
        .map_collect(|&v, &excluded| if excluded { 0.0 } else { v });
    let excluded = Zip::from(blue)
        .and(&mask)
        .map_collect(|&v, &excluded| if excluded { v } else { 0.0 });
    let joined = concatenate(Axis(1), &[kept.view(), excluded.view()])
        .map_err(|e| Error::Raster {
            path: PathBuf::from(scene.key()),
            reason: e.to_string(),
        })?;

    save(&stretch(&joined), output_dir.join("water_mask.png"))
}
