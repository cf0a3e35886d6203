// src/io/discovery.rs
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

pub const IMAGE_SUFFIX: &str = "_3B_AnalyticMS_clip.tif";
pub const METADATA_XML_SUFFIX: &str = "_3B_AnalyticMS_metadata_clip.xml";
pub const METADATA_JSON_SUFFIX: &str = "_metadata.json";
pub const QUALITY_SUFFIX: &str = "_3B_udm2_clip.tif";

/// The four sibling files that make up one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFiles {
    pub key: String,
    pub image: PathBuf,
    pub quality: PathBuf,
    pub metadata_xml: PathBuf,
    pub metadata_json: PathBuf,
}

impl SceneFiles {
    /// Derives the sibling paths from an image path or an already stripped key.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let raw = path.as_ref().to_string_lossy();
        let key = raw.strip_suffix(IMAGE_SUFFIX).unwrap_or(&raw).to_string();

        Self {
            image: PathBuf::from(format!("{key}{IMAGE_SUFFIX}")),
            quality: PathBuf::from(format!("{key}{QUALITY_SUFFIX}")),
            metadata_xml: PathBuf::from(format!("{key}{METADATA_XML_SUFFIX}")),
            metadata_json: PathBuf::from(format!("{key}{METADATA_JSON_SUFFIX}")),
            key,
        }
    }

    pub fn paths(&self) -> [&Path; 4] {
        [
            &self.image,
            &self.quality,
            &self.metadata_xml,
            &self.metadata_json,
        ]
    }

    /// Fails on the first sibling that does not exist.
    pub fn check(&self) -> Result<()> {
        for path in self.paths() {
            if !path.exists() {
                return Err(Error::MissingFile {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Lists the image rasters of a strip, sorted by filename (and so by acquisition).
pub fn discover_scenes<P: AsRef<Path>>(data_dir: P) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(data_dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("AnalyticMS_clip.tif"))
        })
        .collect();
    images.sort();

    debug!(
        "found {} scenes in {}",
        images.len(),
        data_dir.as_ref().display()
    );
    Ok(images)
}
