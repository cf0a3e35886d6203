// src/scene.rs
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use ndarray::{s, Array2};

use crate::error::{Error, Result};
use crate::io::{MetadataSource, RasterSource, SceneFiles};
use crate::processing::indices;
use crate::processing::mask::Mask;
use crate::utils::numeric::percentile;

/// Bands of the analytic image, in file order (band `n` is `index() + 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Blue, Band::Green, Band::Red, Band::Nir];

    /// 0-based position, as used for the per-band metadata nodes.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::Blue => "blue",
            Band::Green => "green",
            Band::Red => "red",
            Band::Nir => "nir",
        }
    }
}

/// Layers of the usable-data mask raster, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityFlag {
    Clear,
    Snow,
    Shadow,
    LightHaze,
    HeavyHaze,
    Cloud,
    Confidence,
    Unusable,
}

impl QualityFlag {
    pub const ALL: [QualityFlag; 8] = [
        QualityFlag::Clear,
        QualityFlag::Snow,
        QualityFlag::Shadow,
        QualityFlag::LightHaze,
        QualityFlag::HeavyHaze,
        QualityFlag::Cloud,
        QualityFlag::Confidence,
        QualityFlag::Unusable,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            QualityFlag::Clear => "clear",
            QualityFlag::Snow => "snow",
            QualityFlag::Shadow => "shadow",
            QualityFlag::LightHaze => "light_haze",
            QualityFlag::HeavyHaze => "heavy_haze",
            QualityFlag::Cloud => "cloud",
            QualityFlag::Confidence => "confidence",
            QualityFlag::Unusable => "unusable",
        }
    }
}

/// One acquisition of the strip: image bands, quality layers and the
/// calibration needed to turn counts into reflectance.
///
/// A `Scene` never changes once built. Every derived product (reflectance,
/// indices, masks) is recomputed from the stored arrays on request.
#[derive(Debug, Clone)]
pub struct Scene {
    key: String,
    acquired: DateTime<Utc>,
    bands: [Array2<f64>; 4],
    quality: [Array2<f64>; 8],
    reflectance_coeffs: [f64; 4],
}

fn check_shape(context: String, expected: (usize, usize), array: &Array2<f64>) -> Result<()> {
    if array.dim() != expected {
        return Err(Error::ShapeMismatch {
            context,
            expected,
            actual: array.dim(),
        });
    }
    Ok(())
}

/// Drops `clip` rows from the top (positive) or `|clip|` rows from the bottom (negative).
fn clip_rows(array: &Array2<f64>, clip: isize) -> Array2<f64> {
    let rows = array.nrows();
    let n = clip.unsigned_abs();
    if clip >= 0 {
        array.slice(s![n.., ..]).to_owned()
    } else {
        array.slice(s![..rows - n, ..]).to_owned()
    }
}

impl Scene {
    /// Loads a scene from its image path (or stripped key).
    ///
    /// All four sibling files must exist before anything is read.
    pub fn open<P, R, M>(path: P, row_clip: Option<isize>, raster: &R, metadata: &M) -> Result<Self>
    where
        P: AsRef<Path>,
        R: RasterSource + ?Sized,
        M: MetadataSource + ?Sized,
    {
        let files = SceneFiles::from_path(path);
        files.check()?;

        info!("{}: loading scenes", files.key);
        let bands: Vec<Array2<f64>> = Band::ALL
            .iter()
            .map(|b| raster.read_band(&files.image, b.index() + 1))
            .collect::<Result<_>>()?;

        info!("{}: loading udm2", files.key);
        let quality: Vec<Array2<f64>> = QualityFlag::ALL
            .iter()
            .map(|f| raster.read_band(&files.quality, f.index() + 1))
            .collect::<Result<_>>()?;

        let acquired = metadata.acquisition_timestamp(&files.metadata_json)?;
        let mut reflectance_coeffs = [0.0; 4];
        for band in Band::ALL {
            reflectance_coeffs[band.index()] =
                metadata.reflectance_coefficient(&files.metadata_xml, band.index())?;
        }

        let bands: [Array2<f64>; 4] = bands.try_into().map_err(|v: Vec<_>| Error::BandCount {
            kind: "image",
            expected: 4,
            actual: v.len(),
        })?;
        let quality: [Array2<f64>; 8] =
            quality.try_into().map_err(|v: Vec<_>| Error::BandCount {
                kind: "udm2",
                expected: 8,
                actual: v.len(),
            })?;

        let scene = Self::from_parts(files.key, acquired, bands, quality, reflectance_coeffs)?;
        match row_clip {
            Some(clip) if clip != 0 => {
                info!("{}: row_clip {clip}", scene.key);
                scene.clipped(clip)
            }
            _ => Ok(scene),
        }
    }

    /// Builds a scene from arrays already in memory.
    pub fn from_parts(
        key: impl Into<String>,
        acquired: DateTime<Utc>,
        bands: [Array2<f64>; 4],
        quality: [Array2<f64>; 8],
        reflectance_coeffs: [f64; 4],
    ) -> Result<Self> {
        let key = key.into();
        let shape = bands[0].dim();
        for band in Band::ALL {
            check_shape(format!("{key} band {}", band.name()), shape, &bands[band.index()])?;
        }
        for flag in QualityFlag::ALL {
            check_shape(format!("{key} udm2 {}", flag.name()), shape, &quality[flag.index()])?;
        }

        Ok(Self {
            key,
            acquired,
            bands,
            quality,
            reflectance_coeffs,
        })
    }

    /// Returns a copy with rows removed; see [`Scene::open`] for the sign convention.
    pub fn clipped(self, clip: isize) -> Result<Self> {
        if clip == 0 {
            return Ok(self);
        }
        let rows = self.shape().0;
        if clip.unsigned_abs() >= rows {
            return Err(Error::RowClip { clip, rows });
        }

        Ok(Self {
            bands: self.bands.each_ref().map(|a| clip_rows(a, clip)),
            quality: self.quality.each_ref().map(|a| clip_rows(a, clip)),
            ..self
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn acquired(&self) -> DateTime<Utc> {
        self.acquired
    }

    pub fn acquired_label(&self) -> String {
        self.acquired.format("%Y-%m-%d").to_string()
    }

    /// `(rows, cols)` shared by every band and quality layer.
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].dim()
    }

    pub fn band(&self, band: Band) -> &Array2<f64> {
        &self.bands[band.index()]
    }

    pub fn quality(&self, flag: QualityFlag) -> &Array2<f64> {
        &self.quality[flag.index()]
    }

    /// Quality layer cast to bool (any non-zero value is set).
    pub fn quality_flag(&self, flag: QualityFlag) -> Array2<bool> {
        self.quality(flag).mapv(|v| v != 0.0)
    }

    pub fn reflectance_coefficient(&self, band: Band) -> f64 {
        self.reflectance_coeffs[band.index()]
    }

    /// Top-of-atmosphere reflectance of a band.
    pub fn reflectance(&self, band: Band) -> Array2<f64> {
        self.band(band) * self.reflectance_coefficient(band)
    }

    fn band_values(&self, band: Band, use_toa: bool) -> Array2<f64> {
        if use_toa {
            self.reflectance(band)
        } else {
            self.band(band).clone()
        }
    }

    pub fn ndvi(&self, use_toa: bool) -> Array2<f64> {
        let nir = self.band_values(Band::Nir, use_toa);
        let red = self.band_values(Band::Red, use_toa);
        indices::ndvi(&nir, &red)
    }

    pub fn ndwi(&self, use_toa: bool) -> Array2<f64> {
        let green = self.band_values(Band::Green, use_toa);
        let nir = self.band_values(Band::Nir, use_toa);
        indices::ndwi(&green, &nir)
    }

    /// EVI always works on reflectance; its constants assume it.
    pub fn evi(&self) -> Array2<f64> {
        indices::evi(
            &self.reflectance(Band::Nir),
            &self.reflectance(Band::Red),
            &self.reflectance(Band::Blue),
        )
    }

    /// Excludes (`true`) every pixel at or above the band's `percentile`-th value.
    ///
    /// The percentile is taken over all pixels of the scene. At 100 nothing is
    /// excluded.
    pub fn percentile_mask(&self, band: Band, percentile_value: f64, use_toa: bool) -> Result<Mask> {
        if !(0.0..=100.0).contains(&percentile_value) {
            return Err(Error::InvalidPercentile(percentile_value));
        }
        let values = self.band_values(band, use_toa);
        if percentile_value >= 100.0 {
            return Ok(Mask::from_elem(values.dim(), false));
        }

        Ok(match percentile(values.iter().copied(), percentile_value) {
            Some(threshold) => values.mapv(|v| !v.is_finite() || v >= threshold),
            None => Mask::from_elem(values.dim(), true),
        })
    }
}
