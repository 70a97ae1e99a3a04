//! # Slide Vocabulary
//!
//! Names shared by the core engine and the CLI: which associated image is being
//! handled, what container a slide file uses, and which scanner produced it.

use std::fmt;
use std::path::Path;

/// An image stored next to the pyramid that may show patient information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssociatedImage {
    /// Photo of the glass label, usually carrying a barcode and patient data.
    Label,
    /// Overview photo of the whole slide, label included.
    Macro,
}

impl AssociatedImage {
    /// The keyword scanners put in the page description of this image.
    pub fn keyword(self) -> &'static str {
        match self {
            AssociatedImage::Label => "label",
            AssociatedImage::Macro => "macro",
        }
    }
}

impl fmt::Display for AssociatedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Container format, derived from the file extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlideFormat {
    Svs,
    ISyntax,
    Other(String),
}

impl SlideFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "svs" => SlideFormat::Svs,
            "isyntax" => SlideFormat::ISyntax,
            _ => SlideFormat::Other(ext),
        }
    }

    pub fn is_slide(&self) -> bool {
        !matches!(self, SlideFormat::Other(_))
    }
}

impl fmt::Display for SlideFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideFormat::Svs => f.write_str("SVS"),
            SlideFormat::ISyntax => f.write_str("iSyntax"),
            SlideFormat::Other(ext) => write!(f, ".{ext}"),
        }
    }
}

/// Scanner family, read from the first page description.
///
/// Older Aperio scanners (AT2 and friends) tag the label and macro pages by name.
/// The GT450 does not, but always stores them as the last two pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScannerFlavor {
    AperioImageLibrary,
    Gt450,
    Unknown,
}

impl ScannerFlavor {
    pub fn from_description(description: &str) -> Self {
        if description.contains("Aperio Image Library") {
            ScannerFlavor::AperioImageLibrary
        } else if description.contains("Aperio Leica Biosystems GT450") {
            ScannerFlavor::Gt450
        } else {
            ScannerFlavor::Unknown
        }
    }
}

impl fmt::Display for ScannerFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScannerFlavor::AperioImageLibrary => "Aperio Image Library",
            ScannerFlavor::Gt450 => "Aperio GT450",
            ScannerFlavor::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
