// src/processing/mask.rs
use ndarray::{Array2, Zip};

use crate::error::{Error, Result};
use crate::scene::{Band, QualityFlag, Scene};

/// Pixel mask; `true` excludes the pixel from the sample.
pub type Mask = Array2<bool>;

fn check_mask_shape(context: String, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(Error::ShapeMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Excludes every pixel that is not flagged clear in all scenes of the strip.
pub fn reliability_mask(series: &[Scene]) -> Result<Mask> {
    let Some(first) = series.first() else {
        return Ok(Mask::default((0, 0)));
    };
    let shape = first.shape();
    let mut reliable = Array2::from_elem(shape, true);

    for scene in series {
        check_mask_shape(format!("reliability mask ({})", scene.key()), shape, scene.shape())?;
        Zip::from(&mut reliable)
            .and(scene.quality(QualityFlag::Clear))
            .for_each(|keep, &clear| *keep &= clear != 0.0);
    }

    Ok(reliable.mapv(|keep| !keep))
}

/// Final mask of one scene: the strip's reliability mask plus the scene's
/// own blue-percentile water mask. A pixel is kept only if both keep it.
pub fn scene_mask(scene: &Scene, reliability: &Mask, water_percentile: f64) -> Result<Mask> {
    check_mask_shape(format!("scene mask ({})", scene.key()), scene.shape(), reliability.dim())?;
    let water = scene.percentile_mask(Band::Blue, water_percentile, true)?;

    Ok(Zip::from(reliability)
        .and(&water)
        .map_collect(|&unreliable, &wet| unreliable || wet))
}
