pub mod deident;
pub mod inspect;
pub mod synth;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use medid_common::config::{Config, DEFAULT_FONT, SynthConfig};

#[derive(Parser)]
#[command(name = "medid")]
#[command(version, about = "Strips PHI from whole-slide images.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print less; repeat to print only warnings and errors
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Print more; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove label and macro images from every slide in a directory
    #[command(alias = "d")]
    Deident(DeidentArgs),
    /// Show the page layout of a single slide
    #[command(alias = "i")]
    Inspect { slide: PathBuf },
    /// Burn made-up PHI into deidentified ultrasound DICOMs
    #[command(alias = "s")]
    Synth(SynthArgs),
}

#[derive(Args, Debug)]
pub struct DeidentArgs {
    #[arg(long = "identified_slides_path", default_value = "ident")]
    pub identified_slides_path: PathBuf,

    #[arg(long = "deidentified_slides_path", default_value = "deident")]
    pub deidentified_slides_path: PathBuf,

    /// Store identified metadata, if specified
    #[arg(long = "identified_metadata_path")]
    pub identified_metadata_path: Option<PathBuf>,

    /// Store label images, if specified
    #[arg(long = "label_image_path")]
    pub label_image_path: Option<PathBuf>,

    /// Store macro images, if specified
    #[arg(long = "macro_image_path")]
    pub macro_image_path: Option<PathBuf>,

    /// Set to 1 to rename files to a generated uuid
    #[arg(long = "rename_to_uuid", default_value_t = 0)]
    pub rename_to_uuid: u8,

    /// Compute the hash of file after deidentification
    #[arg(long = "hash_after", default_value_t = 1)]
    pub hash_after: u8,

    /// Worker threads, 0 picks one per core
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}

impl DeidentArgs {
    pub fn to_config(&self, cli: &CommandLine) -> Config {
        Config {
            identified_slides_path: self.identified_slides_path.clone(),
            deidentified_slides_path: self.deidentified_slides_path.clone(),
            identified_metadata_path: self.identified_metadata_path.clone(),
            label_image_path: self.label_image_path.clone(),
            macro_image_path: self.macro_image_path.clone(),
            rename_to_uuid: self.rename_to_uuid != 0,
            hash_after: self.hash_after != 0,
            jobs: self.jobs,
            no_banner: cli.no_banner,
            quiet: cli.quiet,
        }
    }
}

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Directory path of de-identified data
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory path for output synthetic data
    #[arg(short, long)]
    pub output: PathBuf,

    /// Maximum number of synthetic DICOM images & videos to create
    #[arg(short, long)]
    pub max: Option<usize>,

    /// TrueType font used for the burned-in text
    #[arg(long, default_value = DEFAULT_FONT)]
    pub font: PathBuf,
}

impl SynthArgs {
    pub fn to_config(&self, cli: &CommandLine) -> SynthConfig {
        SynthConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            max: self.max,
            font: self.font.clone(),
            no_banner: cli.no_banner,
            quiet: cli.quiet,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
