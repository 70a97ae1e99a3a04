use anyhow::Context;
use colored::*;

use crate::mprint;
use crate::terminal::print::KeyColumn;
use crate::terminal::{colors, print};
use medid_common::config::SynthConfig;
use medid_common::{error, success, warn};
use medid_core::synth::burn::FontPainter;
use medid_core::synth::{self, GROUND_TRUTH_FILE, SynthReport, SynthSummary};

pub fn synth(cfg: &SynthConfig) -> anyhow::Result<()> {
    let painter = FontPainter::from_file(&cfg.font)?;
    let mut rng = rand::rng();

    let summary = synth::run(cfg, &painter, &mut rng, |report| report_file(report, cfg))
        .with_context(|| format!("could not synthesize {}", cfg.input.display()))?;

    if summary.written() == 0 && summary.skipped == 0 && summary.failed == 0 {
        print::header("zero dicoms found", cfg.quiet);
        print::no_results();
        return Ok(());
    }

    print_summary(&summary, cfg);
    Ok(())
}

fn report_file(report: &SynthReport, cfg: &SynthConfig) {
    match &report.result {
        Ok(origin) => {
            if cfg.quiet == 0 {
                success!(
                    "DICOM {} -> synth -> {} at ({}, {})",
                    report.input.display(),
                    report.output.display(),
                    origin.x,
                    origin.y
                );
            }
        }
        Err(e) if e.is_skip() => warn!("skipped {e}"),
        Err(e) => error!("DICOM failed synth: {} ({e})", report.input.display()),
    }
}

fn print_summary(summary: &SynthSummary, cfg: &SynthConfig) {
    let done: ColoredString = format!("{} files", summary.written()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", summary.elapsed.as_secs_f64())
        .bold()
        .yellow();
    let output = format!("Synthesis Complete: {done} written in {total_time}");

    match cfg.quiet {
        0 => {
            mprint!();
            print::header("summary", cfg.quiet);
            let column = KeyColumn::new(["Patients", "Written", "Skipped", "Failed", "Ground truth"]);
            column.line("Patients", summary.patients);
            column.line("Written", summary.written());
            column.line("Skipped", summary.skipped);
            let failed = summary.failed.to_string();
            match summary.failed {
                0 => column.line("Failed", failed),
                _ => column.line("Failed", failed.red().bold()),
            }
            let truth = cfg.output.join(GROUND_TRUTH_FILE).display().to_string();
            column.line("Ground truth", truth.color(colors::PATH));
            print::fat_separator();
            print::centerln(&output);
        }
        _ => success!("{}", output),
    }
}
