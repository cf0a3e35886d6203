// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;

mod cli;

use crate::cli::Cli;
use ndvi_trend::analysis::{analyze, report_file_name};
use ndvi_trend::io::{discover_scenes, render_scene, render_water_mask, write_report, PlanetMetadata};

#[cfg(feature = "gdal")]
fn raster_source() -> ndvi_trend::io::GdalRasterSource {
    ndvi_trend::io::GdalRasterSource
}

#[cfg(not(feature = "gdal"))]
fn raster_source() -> ndvi_trend::io::TiffRasterSource {
    ndvi_trend::io::TiffRasterSource::new()
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.resolve().context("reading configuration")?;

    info!("Loading scenes...");
    let paths = discover_scenes(&config.data_dir)
        .with_context(|| format!("listing scenes in {}", config.data_dir.display()))?;
    let series = config
        .aligner()
        .load(paths, &raster_source(), &PlanetMetadata)
        .context("loading scenes")?;

    if config.render_images {
        info!("Plotting images and masks...");
        for scene in &series {
            render_scene(scene, &config.output_dir)
                .with_context(|| format!("rendering {}", scene.key()))?;
        }
    }
    if let Some(first) = series.first() {
        render_water_mask(first, config.water_percentile(), &config.output_dir)
            .context("rendering water mask")?;
    }

    info!("Computing analysis figures");
    let report = analyze(&series, &config).context("analyzing scenes")?;
    let output = config.output_dir.join(report_file_name(&config));
    write_report(&report, &output).context("writing report")?;

    info!("Processing complete: {}", output.display());
    Ok(())
}
