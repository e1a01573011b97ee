//! Sliced `.gcode.3mf` jobs.
//!
//! A Bambu job is a zip archive. Each plate has its G-code at
//! `Metadata/plate_<n>.gcode`, an uppercase hex MD5 of that G-code at
//! `Metadata/plate_<n>.gcode.md5`, and plate metadata at
//! `Metadata/plate_<n>.json`.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use ams_remap_gcode::GcodeText;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{BambuError, Result};

const PLATE_PREFIX: &str = "Metadata/plate_";

fn zip_err(e: zip::result::ZipError) -> BambuError {
    BambuError::ThreeMfError(e.to_string())
}

/// Plate metadata (`Metadata/plate_<n>.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateMetadata {
    /// Zero-based slicer tool numbers used on the plate.
    #[serde(default)]
    pub filament_ids: Vec<u32>,
    /// Hex colors, parallel to `filament_ids`.
    #[serde(default)]
    pub filament_colors: Vec<String>,
}

impl PlateMetadata {
    /// Number of job colors: highest tool number plus one.
    pub fn color_count(&self) -> u32 {
        self.filament_ids.iter().max().map_or(0, |id| id + 1)
    }

    /// Hex color of a zero-based tool number.
    pub fn hex_color(&self, tool: u32) -> Option<&str> {
        let idx = self.filament_ids.iter().position(|&id| id == tool)?;
        self.filament_colors.get(idx).map(String::as_str)
    }
}

/// One plate of a sliced job, loaded into memory.
#[derive(Debug, Clone)]
pub struct PlateJob {
    /// Archive the plate was read from.
    pub path: PathBuf,
    /// Plate number.
    pub plate: u32,
    /// Plate G-code.
    pub gcode: GcodeText,
    /// Plate metadata.
    pub metadata: PlateMetadata,
}

impl PlateJob {
    /// Read a plate from a job archive. Without `plate`, the lowest numbered
    /// plate that has G-code is used.
    pub fn open(path: impl AsRef<Path>, plate: Option<u32>) -> Result<Self> {
        let path = path.as_ref();
        let mut archive = ZipArchive::new(File::open(path)?).map_err(zip_err)?;

        let plate = match plate {
            Some(plate) => plate,
            None => archive
                .file_names()
                .filter_map(plate_number)
                .min()
                .ok_or_else(|| BambuError::PlateNotFound(path.display().to_string()))?,
        };

        let gcode = read_entry(&mut archive, &gcode_entry(plate))?;
        let metadata_json = read_entry(&mut archive, &metadata_entry(plate))?;
        let metadata: PlateMetadata = serde_json::from_str(&metadata_json)
            .map_err(|e| BambuError::InvalidMetadata(e.to_string()))?;

        tracing::info!(
            "Loaded plate {} from {} ({} filaments)",
            plate,
            path.display(),
            metadata.filament_ids.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            plate,
            gcode: GcodeText::parse(&gcode),
            metadata,
        })
    }

    /// Write a copy of the source archive with this plate's G-code replaced.
    ///
    /// The MD5 sidecar is rewritten to match; every other entry is copied
    /// without recompression.
    pub fn write_with_gcode(&self, output: impl AsRef<Path>, gcode: &GcodeText) -> Result<()> {
        let output = output.as_ref();
        if same_file(&self.path, output) {
            return Err(BambuError::SameFile(output.display().to_string()));
        }

        let data = gcode.join().into_bytes();
        let checksum = gcode_md5(&data);
        let gcode_name = gcode_entry(self.plate);
        let md5_name = md5_entry(self.plate);

        let mut source = ZipArchive::new(File::open(&self.path)?).map_err(zip_err)?;
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(6));

        let mut wrote_md5 = false;
        for i in 0..source.len() {
            let entry = source.by_index_raw(i).map_err(zip_err)?;
            let name = entry.name().to_string();
            if name == gcode_name {
                zip.start_file(name, options).map_err(zip_err)?;
                zip.write_all(&data)?;
            } else if name == md5_name {
                zip.start_file(name, options).map_err(zip_err)?;
                zip.write_all(checksum.as_bytes())?;
                wrote_md5 = true;
            } else {
                zip.raw_copy_file(entry).map_err(zip_err)?;
            }
        }
        if !wrote_md5 {
            zip.start_file(md5_name, options).map_err(zip_err)?;
            zip.write_all(checksum.as_bytes())?;
        }
        zip.finish().map_err(zip_err)?;

        std::fs::write(output, buffer.into_inner())?;
        tracing::info!("Wrote {}", output.display());
        Ok(())
    }
}

/// Archive path of a plate's G-code.
pub fn gcode_entry(plate: u32) -> String {
    format!("{PLATE_PREFIX}{plate}.gcode")
}

/// Archive path of a plate's G-code checksum.
pub fn md5_entry(plate: u32) -> String {
    format!("{PLATE_PREFIX}{plate}.gcode.md5")
}

/// Archive path of a plate's metadata.
pub fn metadata_entry(plate: u32) -> String {
    format!("{PLATE_PREFIX}{plate}.json")
}

/// Uppercase hex MD5, as Bambu firmware expects it.
pub fn gcode_md5(data: &[u8]) -> String {
    format!("{:X}", Md5::digest(data))
}

/// `dir/cube.gcode.3mf` → `dir/cube_with_pauses.gcode.3mf`.
pub fn paused_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let paused = match name.split_once('.') {
        Some((stem, suffixes)) => format!("{stem}_with_pauses.{suffixes}"),
        None => format!("{name}_with_pauses"),
    };
    input.with_file_name(paused)
}

fn plate_number(name: &str) -> Option<u32> {
    name.strip_prefix(PLATE_PREFIX)?
        .strip_suffix(".gcode")?
        .parse()
        .ok()
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<String> {
    let mut entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => BambuError::PlateNotFound(name.to_string()),
        e => zip_err(e),
    })?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
