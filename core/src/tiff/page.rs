use std::io::{Read, Seek};

use super::{Tiff, TiffError, field::compression, tag};

/// How a page stores its pixel data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    Strips {
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    },
    Tiles {
        width: u64,
        length: u64,
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    },
    Missing,
}

impl Layout {
    pub fn chunk_count(&self) -> usize {
        match self {
            Layout::Strips { offsets, .. } | Layout::Tiles { offsets, .. } => offsets.len(),
            Layout::Missing => 0,
        }
    }
}

/// The image tags of one IFD, resolved into plain values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub offset: u64,
    pub description: String,
    pub width: u64,
    pub length: u64,
    pub compression: u16,
    pub photometric: Option<u16>,
    pub samples_per_pixel: u16,
    pub bits_per_sample: Vec<u16>,
    pub planar_configuration: u16,
    pub predictor: Option<u16>,
    pub rows_per_strip: Option<u64>,
    pub jpeg_tables: Option<Vec<u8>>,
    pub layout: Layout,
}

impl Page {
    pub fn read<R: Read + Seek>(
        tiff: &Tiff,
        reader: &mut R,
        index: usize,
    ) -> Result<Self, TiffError> {
        let ifd = &tiff.ifds[index];
        let description = match ifd.entry(tag::IMAGE_DESCRIPTION) {
            Some(entry) => tiff.read_ascii(reader, entry)?,
            None => String::new(),
        };

        let samples_per_pixel = tiff
            .read_scalar(reader, ifd, tag::SAMPLES_PER_PIXEL)?
            .unwrap_or(1) as u16;
        let bits_per_sample = match ifd.entry(tag::BITS_PER_SAMPLE) {
            Some(entry) => tiff
                .read_values(reader, entry)?
                .into_iter()
                .map(|v| v as u16)
                .collect(),
            None => vec![1],
        };

        let jpeg_tables = match ifd.entry(tag::JPEG_TABLES) {
            Some(entry) => Some(tiff.read_bytes(reader, entry)?),
            None => None,
        };

        let layout = if let (Some(offsets), Some(counts)) = (
            ifd.entry(tag::STRIP_OFFSETS),
            ifd.entry(tag::STRIP_BYTE_COUNTS),
        ) {
            Layout::Strips {
                offsets: tiff.read_values(reader, offsets)?,
                byte_counts: tiff.read_values(reader, counts)?,
            }
        } else if let (Some(offsets), Some(counts)) = (
            ifd.entry(tag::TILE_OFFSETS),
            ifd.entry(tag::TILE_BYTE_COUNTS),
        ) {
            Layout::Tiles {
                width: tiff.read_scalar(reader, ifd, tag::TILE_WIDTH)?.unwrap_or(0),
                length: tiff.read_scalar(reader, ifd, tag::TILE_LENGTH)?.unwrap_or(0),
                offsets: tiff.read_values(reader, offsets)?,
                byte_counts: tiff.read_values(reader, counts)?,
            }
        } else {
            Layout::Missing
        };

        Ok(Page {
            index,
            offset: ifd.offset,
            description,
            width: tiff.read_scalar(reader, ifd, tag::IMAGE_WIDTH)?.unwrap_or(0),
            length: tiff.read_scalar(reader, ifd, tag::IMAGE_LENGTH)?.unwrap_or(0),
            compression: tiff
                .read_scalar(reader, ifd, tag::COMPRESSION)?
                .unwrap_or(compression::NONE as u64) as u16,
            photometric: tiff.read_scalar(reader, ifd, tag::PHOTOMETRIC)?.map(|v| v as u16),
            samples_per_pixel,
            bits_per_sample,
            planar_configuration: tiff
                .read_scalar(reader, ifd, tag::PLANAR_CONFIGURATION)?
                .unwrap_or(1) as u16,
            predictor: tiff.read_scalar(reader, ifd, tag::PREDICTOR)?.map(|v| v as u16),
            rows_per_strip: tiff.read_scalar(reader, ifd, tag::ROWS_PER_STRIP)?,
            jpeg_tables,
            layout,
        })
    }

    /// Reads every page of the file in chain order.
    pub fn read_all<R: Read + Seek>(tiff: &Tiff, reader: &mut R) -> Result<Vec<Self>, TiffError> {
        (0..tiff.ifds.len())
            .map(|index| Page::read(tiff, reader, index))
            .collect()
    }

    /// First line of the description, which is where scanners put the summary.
    pub fn headline(&self) -> &str {
        self.description.lines().next().unwrap_or("").trim()
    }
}
