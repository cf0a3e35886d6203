// src/io/mod.rs
pub mod discovery;
pub mod metadata;
pub mod reader;
pub mod render;
pub mod writer;

pub use discovery::{discover_scenes, SceneFiles};
pub use metadata::{MetadataSource, PlanetMetadata};
pub use reader::{RasterSource, TiffRasterSource};
pub use render::{render_scene, render_water_mask};
#[cfg(feature = "gdal")]
pub use reader::GdalRasterSource;
pub use writer::write_report;
