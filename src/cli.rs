// src/cli.rs
use clap::Parser;
use std::path::PathBuf;

use ndvi_trend::config::AnalysisConfig;
use ndvi_trend::processing::AlignmentPolicy;

#[derive(Parser)]
#[command(name = "ndvi-trend")]
#[command(about = "Analyze scenes for vegetation trends")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the *_AnalyticMS_clip.tif scenes and their sidecars
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for the report and rendered images
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Keep only pixels whose blue value is below this percentile
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub water_mask_percentile: Option<u8>,

    /// Remove the short first scene instead of clipping the others to it
    #[arg(long)]
    pub remove_first_image: bool,

    /// Rows clipped from every other scene (negative clips the bottom edge)
    #[arg(long, allow_hyphen_values = true)]
    pub row_clip: Option<isize>,

    /// Skip rendering band and quality images for each scene
    #[arg(long)]
    pub skip_plot_images_masks: bool,
}

impl Cli {
    /// Layers command-line values over the configuration file (or defaults).
    pub fn resolve(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(p) = self.water_mask_percentile {
            config.water_mask_percentile = p;
        }
        if self.remove_first_image {
            config.alignment = AlignmentPolicy::Drop;
        }
        if let Some(clip) = self.row_clip {
            config.row_clip = clip;
        }
        if self.skip_plot_images_masks {
            config.render_images = false;
        }
        Ok(config)
    }
}
