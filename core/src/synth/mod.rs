//! Synthetic PHI for deidentified ultrasound exams.
//!
//! Every exam folder of a deidentified DICOM tree gets a made-up patient. The patient's
//! name goes into the output folder name, their details are burned into every frame at
//! a random spot in the top band and written into the header. Where the text landed is
//! recorded per file in [`GROUND_TRUTH_FILE`], so the result can score a PHI detector.

pub mod burn;
pub mod dicom;
pub mod patient;

use std::ffi::OsStr;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use medid_common::config::SynthConfig;
use medid_common::{debug, info};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use burn::{Origin, TextPainter};
use patient::{Gender, Patient};

pub const GROUND_TRUTH_FILE: &str = "ground_truth.json";

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("{path}: {reason}")]
    Dicom { path: PathBuf, reason: String },
    #[error("{path}: {samples} sample(s) of {bits} bits, only 8-bit RGB is burned")]
    UnsupportedPixels { path: PathBuf, samples: u32, bits: u32 },
    #[error("{0}: encapsulated pixel data is not burned")]
    Encapsulated(PathBuf),
    #[error("{0}: no pixel data")]
    NoPixelData(PathBuf),
    #[error("{path}: expected {expected} pixel bytes, found {found}")]
    ShortPixelData {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("cannot load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SynthError {
    pub fn dicom(path: &Path, reason: impl Display) -> Self {
        SynthError::Dicom {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Files that are left out on purpose rather than failing.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            SynthError::UnsupportedPixels { .. }
                | SynthError::Encapsulated(_)
                | SynthError::NoPixelData(_)
        )
    }
}

/// Where the annotation of one output file starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroundTruth {
    pub output: PathBuf,
    pub input: PathBuf,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug)]
pub struct SynthReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<Origin, SynthError>,
}

#[derive(Debug)]
pub struct SynthSummary {
    pub ground_truth: Vec<GroundTruth>,
    pub skipped: usize,
    pub failed: usize,
    /// Exam folders that received a patient.
    pub patients: usize,
    pub elapsed: Duration,
}

impl SynthSummary {
    pub fn written(&self) -> usize {
        self.ground_truth.len()
    }
}

/// Output folder name for an exam: the folder name without its leading and trailing
/// digits, joined to the patient name on one side or the other.
pub fn rename_dir(exam_dir: &str, patient_name: &str, name_first: bool) -> String {
    let exam = exam_dir.trim_matches(|c: char| c.is_ascii_digit());
    let name = patient_name.replace(' ', "_");
    if name_first {
        format!("{name}_{exam}")
    } else {
        format!("{exam}_{name}")
    }
}

fn is_dicom_name(name: &OsStr) -> bool {
    name.to_string_lossy().to_ascii_lowercase().contains("dcm")
}

/// Files of `dir` whose name mentions `dcm`, sorted by name.
pub fn dicom_files(dir: &Path) -> Result<Vec<PathBuf>, SynthError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && is_dicom_name(&entry.file_name()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Every folder under `root`, at any depth, deepest first.
pub fn exam_dirs(root: &Path) -> Result<Vec<PathBuf>, SynthError> {
    if !root.is_dir() {
        let reason = format!("{} is not a directory", root.display());
        return Err(io::Error::new(io::ErrorKind::NotFound, reason).into());
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Burns a synthetic patient into every exam under `cfg.input`, calling `on_file` for
/// each DICOM as it is done, and writes the ground truth next to the exams.
pub fn run<R, F>(
    cfg: &SynthConfig,
    painter: &dyn TextPainter,
    rng: &mut R,
    mut on_file: F,
) -> Result<SynthSummary, SynthError>
where
    R: Rng,
    F: FnMut(&SynthReport),
{
    fs::create_dir_all(&cfg.output)?;
    let today = Local::now().date_naive();
    let start = Instant::now();

    let mut ground_truth = Vec::new();
    let (mut skipped, mut failed, mut patients) = (0, 0, 0);
    let limit_reached = |written: usize| cfg.max.is_some_and(|max| written >= max);

    'exams: for exam in exam_dirs(&cfg.input)? {
        if limit_reached(ground_truth.len()) {
            break;
        }
        let files = dicom_files(&exam)?;
        if files.is_empty() {
            continue;
        }

        let exam_name = exam
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let patient = Patient::fake(Gender::for_exam(&exam_name, rng), today, rng);
        let out_dir = cfg
            .output
            .join(rename_dir(&exam_name, &patient.name, rng.random_bool(0.5)));
        fs::create_dir_all(&out_dir)?;
        patients += 1;
        debug!("{} -> {}", exam.display(), out_dir.display());

        for input in files {
            let Some(name) = input.file_name() else {
                continue;
            };
            let output = out_dir.join(name);
            let origin = Origin::random(rng);
            let result = dicom::inject_phi(&input, &output, &patient, painter, origin)
                .map(|_| origin);

            match &result {
                Ok(origin) => ground_truth.push(GroundTruth {
                    output: output.clone(),
                    input: input.clone(),
                    x: origin.x,
                    y: origin.y,
                }),
                Err(e) if e.is_skip() => skipped += 1,
                Err(_) => failed += 1,
            }
            on_file(&SynthReport {
                input,
                output,
                result,
            });

            if limit_reached(ground_truth.len()) {
                info!("Stopping after {} synthetic files", ground_truth.len());
                break 'exams;
            }
        }
    }

    let path = cfg.output.join(GROUND_TRUTH_FILE);
    fs::write(&path, serde_json::to_string_pretty(&ground_truth)?)?;
    debug!("ground truth written to {}", path.display());

    Ok(SynthSummary {
        ground_truth,
        skipped,
        failed,
        patients,
        elapsed: start.elapsed(),
    })
}
