//! Directory-level orchestration: plan the jobs, fan them out, collect the reports.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use medid_common::config::Config;
use medid_common::slide::SlideFormat;
use medid_common::{debug, info};
use rayon::prelude::*;
use uuid::Uuid;

use crate::barcode::BarcodeReader;
use crate::deident::{self, DeidentError, SlideJob, SlideReport};

pub const SLIDE_MAP_FILE: &str = "slide_map.json";

#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<SlideReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    /// Original file name to deidentified file name, for every slide that made it.
    pub fn mapping(&self) -> BTreeMap<String, String> {
        self.reports
            .iter()
            .filter(|r| r.is_success())
            .map(|r| (r.job.source_name(), r.job.destination_name()))
            .collect()
    }
}

/// Name of the deidentified copy of `file_name`.
pub fn output_name(file_name: &str, rename_to_uuid: bool) -> String {
    if !rename_to_uuid {
        return format!("deident_{file_name}");
    }

    let ext = Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("deident_{}{ext}", Uuid::new_v4())
}

/// Lists the slides of the identified directory, sorted by name.
///
/// Sub-directories are not descended into and files of unknown formats are skipped.
pub fn plan(cfg: &Config) -> Result<Vec<SlideJob>, DeidentError> {
    let dir = &cfg.identified_slides_path;
    let read_dir = fs::read_dir(dir).map_err(|source| DeidentError::ReadDir {
        path: dir.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let jobs = files
        .into_iter()
        .filter_map(|source| {
            let format = SlideFormat::from_path(&source);
            if !format.is_slide() {
                debug!("skipping {}", source.display());
                return None;
            }
            let name = source.file_name()?.to_string_lossy().into_owned();
            let destination = cfg
                .deidentified_slides_path
                .join(output_name(&name, cfg.rename_to_uuid));
            Some(SlideJob {
                source,
                destination,
                format,
            })
        })
        .collect();

    Ok(jobs)
}

/// Deidentifies every job in parallel, calling `on_finished` as each slide completes.
pub fn run<F>(
    cfg: &Config,
    jobs: Vec<SlideJob>,
    barcode: &dyn BarcodeReader,
    on_finished: F,
) -> Result<RunSummary, DeidentError>
where
    F: Fn(&SlideReport) + Sync,
{
    for dir in cfg.output_dirs() {
        fs::create_dir_all(dir)?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.jobs)
        .build()?;
    info!(
        "Processing {} slides on {} threads",
        jobs.len(),
        pool.current_num_threads()
    );

    let start = Instant::now();
    let reports: Vec<SlideReport> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let report = deident::deidentify(job, cfg, barcode);
                on_finished(&report);
                report
            })
            .collect()
    });

    let summary = RunSummary {
        reports,
        elapsed: start.elapsed(),
    };

    if let Some(dir) = &cfg.identified_metadata_path {
        let path = dir.join(SLIDE_MAP_FILE);
        fs::write(&path, serde_json::to_string_pretty(&summary.mapping())?)?;
        debug!("slide map written to {}", path.display());
    }

    Ok(summary)
}
