// src/io/reader.rs
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult, Limits};

use crate::error::{Error, Result};

/// Decodes a single band of a raster file into a rows-first array.
///
/// `band_index` is 1-based, matching the band numbering of the products.
pub trait RasterSource: Sync {
    fn read_band(&self, path: &Path, band_index: usize) -> Result<Array2<f64>>;
}

/// Pure-Rust GeoTIFF reader for pixel-interleaved multi-band products.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffRasterSource;

impl TiffRasterSource {
    pub fn new() -> Self {
        Self
    }
}

fn raster_error(path: &Path, reason: impl ToString) -> Error {
    Error::Raster {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn take_band<T: Copy>(buf: &[T], samples: usize, band: usize, cast: impl Fn(T) -> f64) -> Vec<f64> {
    buf.iter().skip(band).step_by(samples).map(|&v| cast(v)).collect()
}

impl RasterSource for TiffRasterSource {
    fn read_band(&self, path: &Path, band_index: usize) -> Result<Array2<f64>> {
        let file = BufReader::new(File::open(path)?);
        let mut decoder = Decoder::new(file)
            .map_err(|e| raster_error(path, e))?
            .with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions().map_err(|e| raster_error(path, e))?;
        let (width, height) = (width as usize, height as usize);
        let pixels = width * height;

        let image = decoder.read_image().map_err(|e| raster_error(path, e))?;
        let len = match &image {
            DecodingResult::U8(b) => b.len(),
            DecodingResult::U16(b) => b.len(),
            DecodingResult::U32(b) => b.len(),
            DecodingResult::U64(b) => b.len(),
            DecodingResult::I8(b) => b.len(),
            DecodingResult::I16(b) => b.len(),
            DecodingResult::I32(b) => b.len(),
            DecodingResult::I64(b) => b.len(),
            DecodingResult::F32(b) => b.len(),
            DecodingResult::F64(b) => b.len(),
        };
        if pixels == 0 || len % pixels != 0 {
            return Err(raster_error(
                path,
                format!("{len} samples do not tile a {width}x{height} raster"),
            ));
        }
        let samples = len / pixels;
        if band_index == 0 || band_index > samples {
            return Err(raster_error(
                path,
                format!("band {band_index} requested from a {samples}-band raster"),
            ));
        }
        let band = band_index - 1;

        let data = match image {
            DecodingResult::U8(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::U16(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::U32(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::U64(b) => take_band(&b, samples, band, |v| v as f64),
            DecodingResult::I8(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::I16(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::I32(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::I64(b) => take_band(&b, samples, band, |v| v as f64),
            DecodingResult::F32(b) => take_band(&b, samples, band, f64::from),
            DecodingResult::F64(b) => take_band(&b, samples, band, |v| v),
        };

        Array2::from_shape_vec((height, width), data).map_err(|e| raster_error(path, e))
    }
}

/// GDAL-backed reader, for band-sequential or compressed layouts the TIFF
/// decoder does not cover.
#[cfg(feature = "gdal")]
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalRasterSource;

#[cfg(feature = "gdal")]
impl RasterSource for GdalRasterSource {
    fn read_band(&self, path: &Path, band_index: usize) -> Result<Array2<f64>> {
        let dataset = gdal::Dataset::open(path)?;
        let (width, height) = dataset.raster_size();
        let band = dataset.rasterband(band_index)?;
        let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)?;

        Array2::from_shape_vec((height, width), buffer.data().to_vec())
            .map_err(|e| raster_error(path, e))
    }
}
