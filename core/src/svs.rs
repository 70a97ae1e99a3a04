//! # SVS Associated Images
//!
//! Locates the label and macro pages of an Aperio SVS slide and wipes them in place.
//!
//! Older Aperio scanners name these pages in their ImageDescription. The GT450 leaves
//! the descriptions blank but always writes the label and the macro as the last two
//! pages. Either way the page is striped, so erasing it means zeroing its strips and,
//! when the page should disappear entirely, cutting its IFD out of the chain.

use std::io::{self, Read, Seek, SeekFrom, Write};

use medid_common::slide::{AssociatedImage, ScannerFlavor};
use medid_common::debug;
use thiserror::Error;

use crate::tiff::{Layout, Page, Tiff, TiffError};

const ZERO_CHUNK: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum SvsError {
    #[error("invalid SVS format: duplicate associated {0} images found")]
    DuplicateAssociatedImage(AssociatedImage),
    #[error("no page points to the {0} image")]
    NoPredecessor(AssociatedImage),
    #[error("the {0} image is tiled; only striped associated images can be erased")]
    TiledAssociatedImage(AssociatedImage),
    #[error(transparent)]
    Tiff(#[from] TiffError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Container structure of a slide plus its resolved pages.
#[derive(Clone, Debug)]
pub struct SlideLayout {
    pub tiff: Tiff,
    pub pages: Vec<Page>,
    pub flavor: ScannerFlavor,
}

impl SlideLayout {
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, SvsError> {
        let tiff = Tiff::read(reader)?;
        let pages = Page::read_all(&tiff, reader)?;
        let flavor = pages
            .first()
            .map(|p| ScannerFlavor::from_description(&p.description))
            .unwrap_or(ScannerFlavor::Unknown);

        Ok(Self {
            tiff,
            pages,
            flavor,
        })
    }

    /// Index of the page holding `kind`, or `None` when the slide has no such image.
    pub fn locate(&self, kind: AssociatedImage) -> Result<Option<usize>, SvsError> {
        let matches: Vec<usize> = match self.flavor {
            ScannerFlavor::Gt450 => {
                let n = self.pages.len();
                let index = match kind {
                    AssociatedImage::Label => n.checked_sub(2),
                    AssociatedImage::Macro => n.checked_sub(1),
                };
                // The pyramid base is never an associated image.
                index.filter(|i| *i > 0).into_iter().collect()
            }
            ScannerFlavor::AperioImageLibrary | ScannerFlavor::Unknown => self
                .pages
                .iter()
                .filter(|p| p.description.contains(kind.keyword()))
                .map(|p| p.index)
                .collect(),
        };

        match matches.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            _ => Err(SvsError::DuplicateAssociatedImage(kind)),
        }
    }
}

/// Everything needed to rebuild an associated image after it was wiped from the slide.
#[derive(Clone, Debug)]
pub struct AssociatedImageData {
    pub kind: AssociatedImage,
    pub page: Page,
    pub strips: Vec<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct Erased {
    pub page_index: usize,
    pub image: AssociatedImageData,
}

/// Wipes the `kind` page of an SVS file opened for reading and writing.
///
/// The strips are always overwritten with zeros. With `keep_entry` the page stays in
/// the IFD chain as a black image; without it the page's out-of-line values and IFD
/// are zeroed too and its predecessor is pointed past it.
pub fn erase_associated_image<F: Read + Write + Seek>(
    file: &mut F,
    kind: AssociatedImage,
    keep_entry: bool,
) -> Result<Option<Erased>, SvsError> {
    let slide = SlideLayout::read(file)?;
    let Some(index) = slide.locate(kind)? else {
        debug!("no {kind} image present");
        return Ok(None);
    };

    let page = slide.pages[index].clone();
    let (offsets, byte_counts) = match &page.layout {
        Layout::Strips {
            offsets,
            byte_counts,
        } => (offsets.clone(), byte_counts.clone()),
        Layout::Tiles { .. } => return Err(SvsError::TiledAssociatedImage(kind)),
        Layout::Missing => (Vec::new(), Vec::new()),
    };

    let ifd = &slide.tiff.ifds[index];
    let predecessor = slide
        .tiff
        .predecessor_of(ifd.offset)
        .ok_or(SvsError::NoPredecessor(kind))?;

    let mut strips: Vec<Vec<u8>> = Vec::with_capacity(offsets.len());
    for (offset, count) in offsets.iter().zip(&byte_counts) {
        if offset.saturating_add(*count) > slide.tiff.file_len {
            return Err(TiffError::Truncated { offset: *offset }.into());
        }
        let mut strip = vec![0u8; *count as usize];
        file.seek(SeekFrom::Start(*offset))?;
        file.read_exact(&mut strip)?;
        strips.push(strip);
    }

    for (offset, count) in offsets.iter().zip(&byte_counts) {
        write_zeros(file, *offset, *count)?;
    }

    if !keep_entry {
        for entry in ifd.entries.iter().filter(|e| !e.is_inline()) {
            write_zeros(file, entry.value_offset, entry.value_len)?;
        }
        write_zeros(file, ifd.offset, ifd.header_len())?;

        let pointer = slide.tiff.encode_offset(ifd.next_ifd)?;
        file.seek(SeekFrom::Start(predecessor.next_pointer_at))?;
        file.write_all(&pointer)?;
    }
    file.flush()?;

    debug!(
        "erased {kind} image on page {index} ({} strips, unlinked: {})",
        strips.len(),
        !keep_entry
    );

    Ok(Some(Erased {
        page_index: index,
        image: AssociatedImageData { kind, page, strips },
    }))
}

fn write_zeros<W: Write + Seek>(file: &mut W, offset: u64, len: u64) -> io::Result<()> {
    let zeros = [0u8; ZERO_CHUNK];
    file.seek(SeekFrom::Start(offset))?;

    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(ZERO_CHUNK as u64) as usize;
        file.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}
