use std::path::PathBuf;

/// Settings for a single deidentification run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding the slides that still carry PHI.
    pub identified_slides_path: PathBuf,
    /// Directory the deidentified copies are written to.
    pub deidentified_slides_path: PathBuf,
    /// Where the identified metadata (barcode, file mapping) is stored, if anywhere.
    pub identified_metadata_path: Option<PathBuf>,
    /// Where label images are exported as PNG, if anywhere.
    pub label_image_path: Option<PathBuf>,
    /// Where macro images are exported as PNG, if anywhere.
    pub macro_image_path: Option<PathBuf>,
    /// Replace output file names with a random UUID.
    pub rename_to_uuid: bool,
    /// Hash every deidentified file once it is written.
    pub hash_after: bool,
    /// Worker threads. `0` lets the pool pick.
    pub jobs: usize,
    pub no_banner: bool,
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identified_slides_path: PathBuf::from("ident"),
            deidentified_slides_path: PathBuf::from("deident"),
            identified_metadata_path: None,
            label_image_path: None,
            macro_image_path: None,
            rename_to_uuid: false,
            hash_after: true,
            jobs: 0,
            no_banner: false,
            quiet: 0,
        }
    }
}

impl Config {
    pub fn new(identified: impl Into<PathBuf>, deidentified: impl Into<PathBuf>) -> Self {
        Self {
            identified_slides_path: identified.into(),
            deidentified_slides_path: deidentified.into(),
            ..Self::default()
        }
    }

    /// Every directory the run may write into.
    pub fn output_dirs(&self) -> Vec<&PathBuf> {
        let mut dirs = vec![&self.deidentified_slides_path];
        dirs.extend(self.identified_metadata_path.iter());
        dirs.extend(self.label_image_path.iter());
        dirs.extend(self.macro_image_path.iter());
        dirs
    }
}

/// Font the synthetic annotations are burned with unless another is given.
pub const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf";

/// Settings for burning synthetic PHI into a deidentified DICOM tree.
#[derive(Clone, Debug)]
pub struct SynthConfig {
    /// Root of the deidentified exams, one folder per exam.
    pub input: PathBuf,
    /// Where the synthetic exams and the ground truth are written.
    pub output: PathBuf,
    /// Stop once this many files have been written.
    pub max: Option<usize>,
    /// TrueType font for the burned-in text.
    pub font: PathBuf,
    pub no_banner: bool,
    pub quiet: u8,
}

impl SynthConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            max: None,
            font: PathBuf::from(DEFAULT_FONT),
            no_banner: false,
            quiet: 0,
        }
    }
}
