// tests/pipeline_tests.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::Array2;
use ndvi_trend::analysis::{analyze, ndvi_pixels, report_file_name};
use ndvi_trend::config::AnalysisConfig;
use ndvi_trend::io::discovery::{IMAGE_SUFFIX, METADATA_JSON_SUFFIX, METADATA_XML_SUFFIX, QUALITY_SUFFIX};
use ndvi_trend::io::{discover_scenes, write_report, PlanetMetadata, RasterSource, SceneFiles};
use ndvi_trend::processing::stats::trend;
use ndvi_trend::processing::{
    rate_of_change, reliability_mask, scene_mask, series_statistics, AlignmentPolicy, SeriesAligner,
};
use ndvi_trend::{Band, Error, QualityFlag, Scene};

/// In-memory raster source keyed by file path
#[derive(Default)]
struct MemoryRasters {
    files: HashMap<PathBuf, Vec<Array2<f64>>>,
}

impl MemoryRasters {
    fn insert(&mut self, path: &Path, bands: Vec<Array2<f64>>) {
        self.files.insert(path.to_path_buf(), bands);
    }
}

impl RasterSource for MemoryRasters {
    fn read_band(&self, path: &Path, band_index: usize) -> ndvi_trend::Result<Array2<f64>> {
        self.files
            .get(path)
            .and_then(|bands| bands.get(band_index - 1))
            .cloned()
            .ok_or_else(|| Error::Raster {
                path: path.to_path_buf(),
                reason: format!("no band {band_index}"),
            })
    }
}

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 6, 1, 12, 0, 0).unwrap() + Duration::days(n)
}

/// Helper function to build a scene of a given shape with constant bands
fn uniform_scene(key: &str, acquired: DateTime<Utc>, rows: usize, cols: usize) -> Scene {
    let bands = [
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f64 + 100.0),
        Array2::from_elem((rows, cols), 900.0),
        Array2::from_elem((rows, cols), 600.0),
        Array2::from_elem((rows, cols), 3000.0),
    ];
    let quality = std::array::from_fn(|i| {
        Array2::from_elem((rows, cols), if i == QualityFlag::Clear.index() { 1.0 } else { 0.0 })
    });
    Scene::from_parts(key, acquired, bands, quality, [2e-5; 4]).unwrap()
}

fn scene_with_clear(key: &str, acquired: DateTime<Utc>, clear: Array2<f64>) -> Scene {
    let (rows, cols) = clear.dim();
    let base = uniform_scene(key, acquired, rows, cols);
    let bands = Band::ALL.map(|b| base.band(b).clone());
    let mut quality = QualityFlag::ALL.map(|f| base.quality(f).clone());
    quality[QualityFlag::Clear.index()] = clear;
    Scene::from_parts(key, acquired, bands, quality, [2e-5; 4]).unwrap()
}

fn write_sidecars(key: &str, acquired: &str) {
    fs::write(
        format!("{key}{METADATA_JSON_SUFFIX}"),
        format!(r#"{{"properties": {{"acquired": "{acquired}"}}}}"#),
    )
    .unwrap();
    let nodes: String = [2.0e-5, 2.1e-5, 2.4e-5, 3.5e-5]
        .iter()
        .map(|c| {
            format!(
                "<ps:bandSpecificMetadata><ps:reflectanceCoefficient>{c}</ps:reflectanceCoefficient></ps:bandSpecificMetadata>"
            )
        })
        .collect();
    fs::write(
        format!("{key}{METADATA_XML_SUFFIX}"),
        format!("<ps:EarthObservation>{nodes}</ps:EarthObservation>"),
    )
    .unwrap();
}

/// Writes the four sibling files of a scene and registers its rasters
fn stage_scene(dir: &Path, name: &str, acquired: &str, rows: usize, rasters: &mut MemoryRasters) -> PathBuf {
    let key = dir.join(name).to_string_lossy().into_owned();
    let files = SceneFiles::from_path(&key);
    fs::write(&files.image, b"").unwrap();
    fs::write(&files.quality, b"").unwrap();
    write_sidecars(&key, acquired);

    let cols = 4;
    let image = vec![
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f64 + 500.0),
        Array2::from_elem((rows, cols), 800.0),
        Array2::from_shape_fn((rows, cols), |(r, _)| 400.0 + r as f64),
        Array2::from_elem((rows, cols), 2500.0),
    ];
    let mut udm2 = vec![Array2::zeros((rows, cols)); 8];
    udm2[0] = Array2::ones((rows, cols));
    rasters.insert(&files.image, image);
    rasters.insert(&files.quality, udm2);
    files.image
}

#[test]
fn test_scene_files_follow_naming_convention() {
    let files = SceneFiles::from_path("data/20170610_173306_0e26_3B_AnalyticMS_clip.tif");
    assert_eq!(files.key, "data/20170610_173306_0e26");
    assert_eq!(files.image, PathBuf::from(format!("data/20170610_173306_0e26{IMAGE_SUFFIX}")));
    assert_eq!(files.quality, PathBuf::from(format!("data/20170610_173306_0e26{QUALITY_SUFFIX}")));
    assert_eq!(QUALITY_SUFFIX, "_3B_udm2_clip.tif");
    assert_eq!(
        files.metadata_xml,
        PathBuf::from("data/20170610_173306_0e26_3B_AnalyticMS_metadata_clip.xml")
    );
    assert_eq!(files.metadata_json, PathBuf::from("data/20170610_173306_0e26_metadata.json"));

    // A bare key resolves to the same siblings
    assert_eq!(SceneFiles::from_path("data/20170610_173306_0e26"), files);
}

#[test]
fn test_open_scene_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut rasters = MemoryRasters::default();
    let image = stage_scene(dir.path(), "20170610_a", "2017-06-10T17:33:06.539473Z", 6, &mut rasters);

    let scene = Scene::open(&image, None, &rasters, &PlanetMetadata).unwrap();
    assert_eq!(scene.shape(), (6, 4));
    assert_eq!(scene.acquired_label(), "2017-06-10");
    assert_eq!(scene.reflectance_coefficient(Band::Nir), 3.5e-5);
    assert_eq!(scene.band(Band::Green)[[0, 0]], 800.0);
    assert!(scene.quality_flag(QualityFlag::Clear).iter().all(|&c| c));
    assert!(!scene.quality_flag(QualityFlag::Cloud).iter().any(|&c| c));

    let toa = scene.reflectance(Band::Nir);
    assert!((toa[[0, 0]] - 2500.0 * 3.5e-5).abs() < 1e-12);
}

#[test]
fn test_missing_quality_raster_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let mut rasters = MemoryRasters::default();
    let image = stage_scene(dir.path(), "20170610_a", "2017-06-10T17:33:06.5Z", 4, &mut rasters);
    let quality = SceneFiles::from_path(&image).quality;
    fs::remove_file(&quality).unwrap();

    match Scene::open(&image, None, &rasters, &PlanetMetadata) {
        Err(Error::MissingFile { path }) => assert_eq!(path, quality),
        other => panic!("expected MissingFile, got {other:?}"),
    }
}

#[test]
fn test_scene_rejects_mismatched_band_shapes() {
    let mut bands = std::array::from_fn(|_| Array2::<f64>::ones((4, 4)));
    bands[Band::Red.index()] = Array2::ones((3, 4));
    let quality = std::array::from_fn(|_| Array2::<f64>::ones((4, 4)));

    let result = Scene::from_parts("bad", day(0), bands, quality, [1.0; 4]);
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_ndvi_is_zero_where_nir_equals_red() {
    let bands = [
        Array2::ones((3, 3)),
        Array2::ones((3, 3)),
        Array2::from_shape_fn((3, 3), |(r, c)| (r * 3 + c) as f64),
        Array2::from_shape_fn((3, 3), |(r, c)| (r * 3 + c) as f64),
    ];
    let quality = std::array::from_fn(|_| Array2::ones((3, 3)));
    let scene = Scene::from_parts("flat", day(0), bands, quality, [3e-5; 4]).unwrap();

    for use_toa in [false, true] {
        let ndvi = scene.ndvi(use_toa);
        assert!(ndvi.iter().all(|&v| v == 0.0), "use_toa={use_toa}: {ndvi:?}");
    }
}

#[test]
fn test_optional_indices_follow_zero_substitution() {
    let bands = std::array::from_fn(|_| Array2::zeros((2, 3)));
    let quality = std::array::from_fn(|_| Array2::ones((2, 3)));
    let scene = Scene::from_parts("dark", day(0), bands, quality, [2e-5; 4]).unwrap();

    assert!(scene.ndwi(true).iter().all(|&v| v == 0.0));
    assert!(scene.ndwi(false).iter().all(|&v| v == 0.0));
    // Zero reflectance leaves EVI's denominator at L = 1 and its numerator at 0
    assert!(scene.evi().iter().all(|&v| v == 0.0));

    let vegetated = uniform_scene("veg", day(0), 2, 2);
    let green = 900.0 * 2e-5;
    let nir = 3000.0 * 2e-5;
    let expected = (green - nir) / (green + nir);
    assert!(vegetated.ndwi(true).iter().all(|&v| (v - expected).abs() < 1e-12));
    assert!(vegetated.evi().iter().all(|&v| v.is_finite() && v > 0.0));
}

#[test]
fn test_percentile_mask_at_100_excludes_nothing() {
    let scene = uniform_scene("a", day(0), 5, 5);
    let mask = scene.percentile_mask(Band::Blue, 100.0, true).unwrap();
    assert!(mask.iter().all(|&m| !m));
}

#[test]
fn test_percentile_mask_excludes_upper_share() {
    // Blue band holds 100 distinct values
    let scene = uniform_scene("a", day(0), 10, 10);
    for p in [10.0, 30.0, 50.0, 75.0, 99.0] {
        let mask = scene.percentile_mask(Band::Blue, p, true).unwrap();
        let excluded = mask.iter().filter(|&&m| m).count() as f64;
        let expected = (1.0 - p / 100.0) * 100.0;
        assert!(
            (excluded - expected).abs() <= 1.0,
            "p={p}: excluded {excluded}, expected about {expected}"
        );
    }
}

#[test]
fn test_percentile_mask_keeps_values_strictly_below_threshold() {
    let scene = uniform_scene("a", day(0), 2, 2); // blue = 100, 101, 102, 103
    let mask = scene.percentile_mask(Band::Blue, 50.0, false).unwrap();
    assert_eq!(mask, ndarray::array![[false, false], [true, true]]);

    assert!(matches!(
        scene.percentile_mask(Band::Blue, 101.0, false),
        Err(Error::InvalidPercentile(_))
    ));
}

#[test]
fn test_reliability_mask_all_clear_excludes_nothing() {
    let series = vec![uniform_scene("a", day(0), 4, 4), uniform_scene("b", day(1), 4, 4)];
    let mask = reliability_mask(&series).unwrap();
    assert_eq!(mask.dim(), (4, 4));
    assert!(mask.iter().all(|&m| !m));
}

#[test]
fn test_reliability_mask_single_unclear_pixel() {
    let mut clear = Array2::ones((4, 4));
    clear[[2, 1]] = 0.0;
    let series = vec![
        uniform_scene("a", day(0), 4, 4),
        scene_with_clear("b", day(1), clear),
        uniform_scene("c", day(2), 4, 4),
    ];

    let mask = reliability_mask(&series).unwrap();
    for ((r, c), &excluded) in mask.indexed_iter() {
        assert_eq!(excluded, (r, c) == (2, 1), "pixel ({r}, {c})");
    }
}

#[test]
fn test_reliability_mask_rejects_unaligned_series() {
    let series = vec![uniform_scene("a", day(0), 4, 4), uniform_scene("b", day(1), 5, 4)];
    assert!(matches!(reliability_mask(&series), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_scene_mask_combines_reliability_and_water() {
    let mut clear = Array2::ones((2, 2));
    clear[[0, 0]] = 0.0;
    let scene = scene_with_clear("a", day(0), clear);
    let reliability = reliability_mask(std::slice::from_ref(&scene)).unwrap();

    // Blue = 100..103; the 50th percentile excludes the bottom row
    let mask = scene_mask(&scene, &reliability, 50.0).unwrap();
    assert_eq!(mask, ndarray::array![[true, false], [true, true]]);

    let wrong = Array2::from_elem((3, 2), false);
    assert!(matches!(scene_mask(&scene, &wrong, 50.0), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_rate_of_change_per_day() {
    let times = [day(0), day(1), day(2)];
    let rates: Vec<f64> = rate_of_change(&times, &[0.5, 0.6, 0.55])
        .unwrap()
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(rates.len(), 2);
    assert!((rates[0] - 0.1).abs() < 1e-9);
    assert!((rates[1] + 0.05).abs() < 1e-9);
}

#[test]
fn test_rate_of_change_uses_fractional_days() {
    let times = [day(0), day(0) + Duration::hours(12)];
    let rates = rate_of_change(&times, &[0.2, 0.3]).unwrap();
    assert!((rates[0].as_ref().unwrap() - 0.2).abs() < 1e-9);
}

#[test]
fn test_rate_of_change_reports_degenerate_pairs() {
    let times = [day(0), day(2), day(2), day(1)];
    let rates = rate_of_change(&times, &[0.1, 0.2, 0.3, 0.4]).unwrap();

    assert_eq!(rates.len(), 3);
    assert!((rates[0].as_ref().unwrap() - 0.05).abs() < 1e-9);
    assert!(matches!(rates[1], Err(Error::DegenerateTimeDelta { index: 1, .. })));
    assert!(matches!(rates[2], Err(Error::DegenerateTimeDelta { index: 2, .. })));

    assert!(matches!(
        rate_of_change(&times, &[0.1]),
        Err(Error::LengthMismatch { timestamps: 4, values: 1 })
    ));
}

#[test]
fn test_two_scene_statistics_end_to_end() {
    let series = vec![uniform_scene("a", day(0), 4, 4), uniform_scene("b", day(3), 4, 4)];
    let stats = series_statistics(&series, 50.0).unwrap();

    assert_eq!(stats.len(), 2);
    let stats: Vec<_> = stats.into_iter().map(|s| s.unwrap()).collect();
    for s in &stats {
        assert!((-1.0..=1.0).contains(&s.median));
        // nir 3000, red 600 with equal coefficients
        assert!((s.median - 2400.0 / 3600.0).abs() < 1e-9);
        assert!(s.std_dev.abs() < 1e-12);
    }
    assert_eq!(stats[0].acquired, day(0));

    let rates = trend(&stats);
    assert_eq!(rates.len(), 1);
    assert!(rates[0].as_ref().unwrap().abs() < 1e-12);
}

#[test]
fn test_empty_selection_is_reported_per_scene() {
    let series = vec![
        uniform_scene("a", day(0), 3, 3),
        scene_with_clear("b", day(1), Array2::ones((3, 3))),
    ];
    // Water percentile 0 excludes every pixel
    let stats = series_statistics(&series, 0.0).unwrap();
    assert_eq!(stats.len(), 2);
    for (stat, key) in stats.iter().zip(["a", "b"]) {
        match stat {
            Err(Error::EmptySelection { scene }) => assert_eq!(scene, key),
            other => panic!("expected EmptySelection, got {other:?}"),
        }
    }
}

#[test]
fn test_clip_alignment_brings_scenes_to_short_shape() {
    let series = vec![
        uniform_scene("a", day(0), 10, 4),
        uniform_scene("b", day(1), 25, 4),
        uniform_scene("c", day(2), 25, 4),
    ];
    let aligner = SeriesAligner::new(AlignmentPolicy::Clip, 0, 15);
    let aligned = aligner.align(series).unwrap();

    assert_eq!(aligned.len(), 3);
    assert!(aligned.iter().all(|s| s.shape() == (10, 4)));
    // Positive clip trims the top: first remaining row was row 15
    assert_eq!(aligned[1].band(Band::Blue)[[0, 0]], (15 * 4) as f64 + 100.0);
}

#[test]
fn test_negative_clip_trims_bottom_rows() {
    let scene = uniform_scene("a", day(0), 6, 4).clipped(-2).unwrap();
    assert_eq!(scene.shape(), (4, 4));
    assert_eq!(scene.band(Band::Blue)[[0, 0]], 100.0);
    assert_eq!(scene.quality(QualityFlag::Clear).dim(), (4, 4));

    assert!(matches!(
        uniform_scene("b", day(0), 6, 4).clipped(6),
        Err(Error::RowClip { clip: 6, rows: 6 })
    ));
}

#[test]
fn test_drop_alignment_removes_anomalous_scene() {
    let series = vec![
        uniform_scene("a", day(0), 10, 4),
        uniform_scene("b", day(1), 25, 4),
        uniform_scene("c", day(2), 25, 4),
    ];
    let aligned = SeriesAligner::new(AlignmentPolicy::Drop, 0, 15).align(series).unwrap();
    let keys: Vec<_> = aligned.iter().map(|s| s.key()).collect();
    assert_eq!(keys, ["b", "c"]);
    assert!(aligned.iter().all(|s| s.shape() == (25, 4)));
}

#[test]
fn test_wrong_clip_convention_is_a_shape_mismatch() {
    let series = vec![uniform_scene("a", day(0), 10, 4), uniform_scene("b", day(1), 25, 4)];
    let result = SeriesAligner::new(AlignmentPolicy::Clip, 0, 10).align(series);
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_load_series_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut rasters = MemoryRasters::default();
    stage_scene(dir.path(), "20170901_b", "2017-09-01T17:00:00.000000Z", 8, &mut rasters);
    stage_scene(dir.path(), "20170610_a", "2017-06-10T17:00:00.000000Z", 5, &mut rasters);
    stage_scene(dir.path(), "20171015_c", "2017-10-15T17:00:00.000000Z", 8, &mut rasters);

    let paths = discover_scenes(dir.path()).unwrap();
    assert_eq!(paths.len(), 3);
    assert!(paths[0].to_string_lossy().contains("20170610_a"));

    let series = SeriesAligner::new(AlignmentPolicy::Clip, 0, 3)
        .load(paths.clone(), &rasters, &PlanetMetadata)
        .unwrap();
    assert_eq!(series.len(), 3);
    assert!(series.iter().all(|s| s.shape() == (5, 4)));
    assert!(series.windows(2).all(|w| w[0].acquired() < w[1].acquired()));

    let dropped = SeriesAligner::new(AlignmentPolicy::Drop, 0, 3)
        .load(paths, &rasters, &PlanetMetadata)
        .unwrap();
    assert_eq!(dropped.len(), 2);
    assert!(dropped.iter().all(|s| s.shape() == (8, 4)));
}

#[test]
fn test_ndvi_pixels_masked_and_unmasked() {
    let series = vec![uniform_scene("a", day(0), 4, 4), uniform_scene("b", day(1), 4, 4)];
    let masked = ndvi_pixels(&series, true, 50.0).unwrap();
    let unmasked = ndvi_pixels(&series, false, 50.0).unwrap();

    assert_eq!(masked.len(), 2);
    assert_eq!(unmasked[0].len(), 16);
    assert_eq!(masked[0].len(), 8);
}

#[test]
fn test_analysis_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig {
        output_dir: dir.path().to_path_buf(),
        histogram_bins: 10,
        ..AnalysisConfig::default()
    };
    let series = vec![
        uniform_scene("a", day(0), 4, 4),
        scene_with_clear("b", day(1), Array2::ones((4, 4))),
        uniform_scene("c", day(4), 4, 4),
    ];

    let report = analyze(&series, &config).unwrap();
    assert_eq!(report.scenes.len(), 3);
    assert_eq!(report.rate_of_change.len(), 2);
    assert_eq!(report.water_mask_comparison.len(), 3);
    assert_eq!(report.scenes[0].kept_pixels, 8);
    assert_eq!(report.scenes[0].histogram_masked.density.len(), 10);
    assert!(report.scenes.iter().all(|s| s.statistic.is_some() && s.error.is_none()));
    assert!(report.rate_of_change.iter().all(|r| r.per_day.is_some()));

    let output = dir.path().join(report_file_name(&config));
    write_report(&report, &output).unwrap();
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["scenes"].as_array().unwrap().len(), 3);
    assert_eq!(written["alignment"], "clip");
}

#[test]
fn test_analysis_skips_empty_scenes_in_trend() {
    let mut none_clear = Array2::ones((3, 3));
    none_clear.fill(0.0);
    let series = vec![uniform_scene("a", day(0), 3, 3), scene_with_clear("b", day(1), none_clear)];

    let report = analyze(&series, &AnalysisConfig::default()).unwrap();
    assert!(report.scenes.iter().all(|s| s.statistic.is_none()));
    assert!(report.scenes.iter().all(|s| s.error.is_some()));
    assert!(report.rate_of_change.is_empty());
}

#[test]
fn test_config_defaults_and_overrides() {
    let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, AnalysisConfig::default());
    assert_eq!(config.water_mask_percentile, 50);
    assert_eq!(config.row_clip, 15);
    assert_eq!(config.alignment, AlignmentPolicy::Clip);
    assert_eq!(report_file_name(&config), "ndvi_report_blue50.json");

    let config: AnalysisConfig =
        serde_json::from_str(r#"{"alignment": "drop", "water_mask_percentile": 75, "histogram_range": [0.0, 0.5]}"#)
            .unwrap();
    assert_eq!(config.alignment, AlignmentPolicy::Drop);
    assert_eq!(config.histogram_range, (0.0, 0.5));
    assert_eq!(report_file_name(&config), "ndvi_report_dropped_blue75.json");
}
