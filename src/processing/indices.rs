// src/processing/indices.rs
use ndarray::{Array2, Zip};

// EVI coefficients from MODIS documentation
const EVI_G: f64 = 2.5; // Gain factor
const EVI_L: f64 = 1.0; // Canopy background adjustment
const EVI_C1: f64 = 6.0; // Aerosol resistance (red)
const EVI_C2: f64 = 7.5; // Aerosol resistance (blue)

/// Replaces an undefined ratio (zero denominator, NaN, inf) with 0.
#[inline]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() <= f64::EPSILON {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// `(a - b) / (a + b)`, pixel-wise, with 0 wherever the ratio is undefined.
///
/// Both inputs must share a shape; ndarray panics otherwise, which only a
/// scene built around mismatched bands could trigger.
pub fn normalized_difference(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    Zip::from(a)
        .and(b)
        .par_map_collect(|&a, &b| safe_ratio(a - b, a + b))
}

/// NDVI: `(NIR - RED) / (NIR + RED)`
pub fn ndvi(nir: &Array2<f64>, red: &Array2<f64>) -> Array2<f64> {
    normalized_difference(nir, red)
}

/// NDWI (McFeeters): `(GREEN - NIR) / (GREEN + NIR)`
pub fn ndwi(green: &Array2<f64>, nir: &Array2<f64>) -> Array2<f64> {
    normalized_difference(green, nir)
}

/// EVI: `G * (NIR - RED) / (NIR + C1*RED - C2*BLUE + L)`, on reflectance.
pub fn evi(nir: &Array2<f64>, red: &Array2<f64>, blue: &Array2<f64>) -> Array2<f64> {
    Zip::from(nir)
        .and(red)
        .and(blue)
        .par_map_collect(|&nir, &red, &blue| {
            let denominator = nir + EVI_C1 * red - EVI_C2 * blue + EVI_L;
            safe_ratio(EVI_G * (nir - red), denominator)
        })
}
