// src/io/writer.rs
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::error::Result;

/// Writes any serializable report as pretty JSON, creating parent directories.
pub fn write_report<T: Serialize>(report: &T, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(writer, report)?;

    info!("{} saved", output_path.display());
    Ok(())
}
