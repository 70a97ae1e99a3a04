//! Turns a captured associated image back into pixels.
//!
//! The page is repacked on its own into a single-IFD TIFF and handed to the `image`
//! crate, which takes care of the actual codecs.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::svs::AssociatedImageData;
use crate::tiff::field::compression;
use crate::tiff::writer::{IfdBuilder, TiffWriter};
use crate::tiff::{FieldType, TiffError, tag};

const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PHOTOMETRIC_RGB: u16 = 2;
const PHOTOMETRIC_YCBCR: u16 = 6;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("{kind} image uses {name} compression ({code}), which cannot be decoded")]
    UnsupportedCompression {
        kind: medid_common::slide::AssociatedImage,
        name: &'static str,
        code: u16,
    },
    #[error("{0} image has no pixel data")]
    Empty(medid_common::slide::AssociatedImage),
    #[error(transparent)]
    Tiff(#[from] TiffError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl AssociatedImageData {
    /// Builds a standalone TIFF holding only this page.
    pub fn to_standalone_tiff(&self) -> Result<Vec<u8>, LabelError> {
        let page = &self.page;
        if self.strips.is_empty() {
            return Err(LabelError::Empty(self.kind));
        }

        let width = u32::try_from(page.width).map_err(|_| TiffError::TooLarge)?;
        let length = u32::try_from(page.length).map_err(|_| TiffError::TooLarge)?;
        let rows_per_strip = page
            .rows_per_strip
            .map(|r| r.min(page.length))
            .unwrap_or(page.length);
        let rows_per_strip = u32::try_from(rows_per_strip).map_err(|_| TiffError::TooLarge)?;

        let photometric = match page.photometric {
            // The JPEG decoder already hands back RGB.
            Some(PHOTOMETRIC_YCBCR) if page.compression == compression::JPEG => PHOTOMETRIC_RGB,
            Some(photometric) => photometric,
            None if page.samples_per_pixel >= 3 => PHOTOMETRIC_RGB,
            None => PHOTOMETRIC_BLACK_IS_ZERO,
        };

        let mut ifd = IfdBuilder::new()
            .long(tag::IMAGE_WIDTH, &[width])
            .long(tag::IMAGE_LENGTH, &[length])
            .short(tag::BITS_PER_SAMPLE, &page.bits_per_sample)
            .short(tag::COMPRESSION, &[page.compression])
            .short(tag::PHOTOMETRIC, &[photometric])
            .short(tag::SAMPLES_PER_PIXEL, &[page.samples_per_pixel])
            .long(tag::ROWS_PER_STRIP, &[rows_per_strip])
            .short(tag::PLANAR_CONFIGURATION, &[page.planar_configuration]);

        if let Some(predictor) = page.predictor {
            ifd = ifd.short(tag::PREDICTOR, &[predictor]);
        }
        if let Some(tables) = &page.jpeg_tables {
            ifd = ifd.raw(tag::JPEG_TABLES, FieldType::Undefined, tables.clone());
        }

        let bytes = TiffWriter::new()
            .ifd(ifd.strips(self.strips.clone()))
            .finish()?;
        Ok(bytes)
    }

    pub fn decode(&self) -> Result<DynamicImage, LabelError> {
        let code = self.page.compression;
        if !compression::is_decodable(code) {
            return Err(LabelError::UnsupportedCompression {
                kind: self.kind,
                name: compression::name(code),
                code,
            });
        }

        let bytes = self.to_standalone_tiff()?;
        Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Tiff)?)
    }
}

/// Writes `<dir>/<source_name>.png` and returns its path.
pub fn save_png(image: &DynamicImage, dir: &Path, source_name: &str) -> Result<PathBuf, LabelError> {
    let path = dir.join(format!("{source_name}.png"));
    image.save_with_format(&path, ImageFormat::Png)?;
    Ok(path)
}
