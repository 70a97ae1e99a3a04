//! # Slide Deidentification
//!
//! Runs one slide through the full pipeline:
//!
//! 1. copy it next to its destination under a temporary name, hashing on the way,
//! 2. blank the label pixels but keep the label page, since some viewers choke on a
//!    slide whose label disappeared,
//! 3. export the label and read its barcode, when asked to,
//! 4. remove the macro page entirely,
//! 5. record the identified metadata, then move the copy into place.
//!
//! The source file is never opened for writing.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use medid_common::config::Config;
use medid_common::slide::{AssociatedImage, SlideFormat};
use medid_common::{debug, warn};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::barcode::BarcodeReader;
use crate::hash;
use crate::label::{self, LabelError};
use crate::svs::{self, AssociatedImageData, SvsError};

#[derive(Debug, Error)]
pub enum DeidentError {
    #[error("{0} deidentification is not supported")]
    UnsupportedFormat(SlideFormat),
    #[error("cannot read slide directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Svs(#[from] SvsError),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One slide to process and where its output goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlideJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub format: SlideFormat,
}

impl SlideJob {
    pub fn source_name(&self) -> String {
        file_name(&self.source)
    }

    pub fn destination_name(&self) -> String {
        file_name(&self.destination)
    }
}

/// What was done to a slide that made it through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deidentified {
    pub label_found: bool,
    pub macro_removed: bool,
    pub barcode: Option<String>,
    pub sha256_before: String,
    pub sha256_after: Option<String>,
}

#[derive(Debug)]
pub struct SlideReport {
    pub job: SlideJob,
    pub result: Result<Deidentified, DeidentError>,
}

impl SlideReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// The JSON record kept for every slide when a metadata directory is configured.
#[derive(Debug, Serialize)]
pub struct IdentifiedMetadata<'a> {
    pub deident_filename: String,
    pub barcode: &'a str,
    pub original_filename: String,
    pub sha256_before: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<&'a str>,
}

/// Dispatches a job by format.
pub fn deidentify(job: &SlideJob, cfg: &Config, barcode: &dyn BarcodeReader) -> SlideReport {
    let result = match &job.format {
        SlideFormat::Svs => deidentify_svs(job, cfg, barcode),
        other => Err(DeidentError::UnsupportedFormat(other.clone())),
    };

    SlideReport {
        job: job.clone(),
        result,
    }
}

pub fn deidentify_svs(
    job: &SlideJob,
    cfg: &Config,
    barcode: &dyn BarcodeReader,
) -> Result<Deidentified, DeidentError> {
    let dst_dir = job.destination.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dst_dir.join(Uuid::new_v4().to_string());

    let result = strip_into(job, cfg, barcode, &tmp);
    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("could not remove temporary file {}: {e}", tmp.display());
        }
    }
    result
}

fn strip_into(
    job: &SlideJob,
    cfg: &Config,
    reader: &dyn BarcodeReader,
    tmp: &Path,
) -> Result<Deidentified, DeidentError> {
    let source_name = job.source_name();
    let sha256_before = hash::copy_and_hash(&job.source, tmp)?;

    let mut file = OpenOptions::new().read(true).write(true).open(tmp)?;

    let label = svs::erase_associated_image(&mut file, AssociatedImage::Label, true)?;
    let needs_label_pixels =
        cfg.label_image_path.is_some() || cfg.identified_metadata_path.is_some();
    let label_image = match &label {
        Some(erased) if needs_label_pixels => decode_or_warn(&erased.image, &source_name),
        _ => None,
    };

    if let (Some(dir), Some(image)) = (&cfg.label_image_path, &label_image) {
        let path = label::save_png(image, dir, &source_name)?;
        debug!("label saved to {}", path.display());
    }

    let barcode = match (&cfg.identified_metadata_path, &label_image) {
        (Some(_), Some(image)) => reader.read(&image.to_luma8()),
        _ => None,
    };

    let macro_image = svs::erase_associated_image(&mut file, AssociatedImage::Macro, false)?;
    if let (Some(dir), Some(erased)) = (&cfg.macro_image_path, &macro_image) {
        if let Some(image) = decode_or_warn(&erased.image, &source_name) {
            label::save_png(&image, dir, &source_name)?;
        }
    }

    file.sync_all()?;
    drop(file);

    let sha256_after = if cfg.hash_after {
        Some(hash::sha256_file(tmp)?)
    } else {
        None
    };

    let outcome = Deidentified {
        label_found: label.is_some(),
        macro_removed: macro_image.is_some(),
        barcode,
        sha256_before,
        sha256_after,
    };

    // Nothing lands in the output directory unless its metadata is on disk.
    let metadata = match &cfg.identified_metadata_path {
        Some(dir) => Some(write_metadata(job, &outcome, dir)?),
        None => None,
    };

    if let Err(e) = move_file(tmp, &job.destination) {
        if let Some(path) = metadata {
            if let Err(e) = fs::remove_file(&path) {
                warn!("could not remove {}: {e}", path.display());
            }
        }
        return Err(e.into());
    }

    Ok(outcome)
}

fn decode_or_warn(image: &AssociatedImageData, source_name: &str) -> Option<DynamicImage> {
    match image.decode() {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("{source_name}: {e}");
            None
        }
    }
}

/// Writes `<dir>/<source file name>.json`.
pub fn write_metadata(
    job: &SlideJob,
    outcome: &Deidentified,
    dir: &Path,
) -> Result<PathBuf, DeidentError> {
    let record = IdentifiedMetadata {
        deident_filename: job.destination_name(),
        barcode: outcome.barcode.as_deref().unwrap_or(""),
        original_filename: job.source_name(),
        sha256_before: &outcome.sha256_before,
        sha256_after: outcome.sha256_after.as_deref(),
    };

    let path = dir.join(format!("{}.json", job.source_name()));
    fs::write(&path, serde_json::to_string_pretty(&record)?)?;
    Ok(path)
}

/// Renames, falling back to copy and delete when the rename crosses filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            if let Err(e) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            fs::remove_file(from)
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
