use anyhow::Context;
use colored::*;
use tracing::info_span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::mprint;
use crate::terminal::print::KeyColumn;
use crate::terminal::{colors, print, progress};
use medid_common::config::Config;
use medid_common::{debug, error, success};
use medid_core::barcode::BarcodeChain;
use medid_core::batch::{self, RunSummary};
use medid_core::deident::SlideReport;

pub fn deident(cfg: &Config) -> anyhow::Result<()> {
    let jobs = batch::plan(cfg).context("could not list the identified slides")?;

    if jobs.is_empty() {
        print::header("zero slides found", cfg.quiet);
        print::no_results();
        return Ok(());
    }

    let span = match cfg.quiet {
        0 => info_span!("deident", indicatif.pb_show = true),
        _ => info_span!("deident"),
    };
    span.pb_set_style(&progress::slide_bar_style());
    span.pb_set_length(jobs.len() as u64);
    let guard = span.enter();

    let barcode = BarcodeChain::default();
    let summary = batch::run(cfg, jobs, &barcode, |report| {
        report_slide(report, cfg);
        span.pb_inc(1);
    })?;

    drop(guard);

    print_summary(&summary, cfg);
    Ok(())
}

fn report_slide(report: &SlideReport, cfg: &Config) {
    let job = &report.job;
    match &report.result {
        Ok(outcome) => {
            if cfg.quiet == 0 {
                success!(
                    "{} {} -> deident -> {}",
                    job.format,
                    job.source.display(),
                    job.destination.display()
                );
            }
            debug!(
                "{}: label {}, macro {}",
                job.source_name(),
                if outcome.label_found { "blanked" } else { "not found" },
                if outcome.macro_removed { "removed" } else { "not found" }
            );
        }
        Err(e) => error!(
            "{} failed deident: {} ({e})",
            job.format,
            job.source.display()
        ),
    }
}

fn print_summary(summary: &RunSummary, cfg: &Config) {
    let done: ColoredString = format!("{} slides", summary.succeeded()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", summary.elapsed.as_secs_f64())
        .bold()
        .yellow();
    let output: String = format!("Deidentification Complete: {done} processed in {total_time}");

    match cfg.quiet {
        0 => {
            mprint!();
            print::header("summary", cfg.quiet);
            let column = KeyColumn::new(["Succeeded", "Failed", "Output", "Metadata"]);
            column.line("Succeeded", summary.succeeded());
            let failed = summary.failed().to_string();
            match summary.failed() {
                0 => column.line("Failed", failed),
                _ => column.line("Failed", failed.red().bold()),
            }
            let output_dir = cfg.deidentified_slides_path.display().to_string();
            column.line("Output", output_dir.color(colors::PATH));
            if let Some(dir) = &cfg.identified_metadata_path {
                column.line("Metadata", dir.display().to_string().color(colors::PATH));
            }
            print::fat_separator();
            print::centerln(&output);
        }
        _ => success!("{}", output),
    }
}
