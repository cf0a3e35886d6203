// src/io/metadata.rs
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Sidecar metadata lookups needed to build a scene.
pub trait MetadataSource: Sync {
    /// Acquisition instant recorded in the JSON sidecar.
    fn acquisition_timestamp(&self, json_path: &Path) -> Result<DateTime<Utc>>;

    /// Reflectance coefficients of every band, in document order.
    fn reflectance_coefficients(&self, xml_path: &Path) -> Result<Vec<f64>>;

    /// Reflectance coefficient of one band (0-based).
    fn reflectance_coefficient(&self, xml_path: &Path, band_index: usize) -> Result<f64> {
        let coeffs = self.reflectance_coefficients(xml_path)?;
        coeffs.get(band_index).copied().ok_or_else(|| Error::Metadata {
            path: xml_path.to_path_buf(),
            reason: format!(
                "no reflectance coefficient for band index {band_index} ({} bands listed)",
                coeffs.len()
            ),
        })
    }
}

/// Reads PlanetScope `_metadata.json` and `_AnalyticMS_metadata_clip.xml` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanetMetadata;

#[derive(Deserialize)]
struct SceneMetadata {
    properties: SceneProperties,
}

#[derive(Deserialize)]
struct SceneProperties {
    acquired: String,
}

const ACQUIRED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parses an acquisition stamp such as `2017-06-10T17:33:06.539473Z`.
pub fn parse_acquired(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    let naive = trimmed.strip_suffix(['Z', 'z']).unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(naive, ACQUIRED_FORMAT)
        .map(|dt| dt.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Extracts the `acquired` instant from the JSON sidecar contents.
pub fn acquired_from_json(json: &str) -> std::result::Result<DateTime<Utc>, String> {
    let metadata: SceneMetadata = serde_json::from_str(json).map_err(|e| e.to_string())?;
    parse_acquired(&metadata.properties.acquired)
        .ok_or_else(|| format!("unparseable acquired field `{}`", metadata.properties.acquired))
}

/// Collects every `bandSpecificMetadata/reflectanceCoefficient` value, in order.
pub fn coefficients_from_xml(xml: &str) -> std::result::Result<Vec<f64>, String> {
    let mut reader = Reader::from_str(xml);
    let mut coeffs = Vec::new();
    let mut in_band = false;
    let mut in_coeff = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"bandSpecificMetadata" => in_band = true,
                b"reflectanceCoefficient" if in_band => in_coeff = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"bandSpecificMetadata" => in_band = false,
                b"reflectanceCoefficient" => in_coeff = false,
                _ => {}
            },
            Event::Text(t) if in_coeff => {
                let text = String::from_utf8_lossy(&t);
                let value = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("bad reflectance coefficient `{}`: {e}", text.trim()))?;
                coeffs.push(value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(coeffs)
}

impl MetadataSource for PlanetMetadata {
    fn acquisition_timestamp(&self, json_path: &Path) -> Result<DateTime<Utc>> {
        let content = fs::read_to_string(json_path)?;
        acquired_from_json(&content).map_err(|reason| Error::Metadata {
            path: json_path.to_path_buf(),
            reason,
        })
    }

    fn reflectance_coefficients(&self, xml_path: &Path) -> Result<Vec<f64>> {
        let content = fs::read_to_string(xml_path)?;
        coefficients_from_xml(&content).map_err(|reason| Error::Metadata {
            path: xml_path.to_path_buf(),
            reason,
        })
    }
}
