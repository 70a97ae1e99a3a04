//! Barcode detection on label images.
//!
//! Slide labels normally carry a DataMatrix symbol; some labs print QR codes instead.

use image::GrayImage;
use rxing::BarcodeFormat;

/// Something that can pull the text out of a barcode on a grayscale image.
pub trait BarcodeReader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the text of the first symbol found, if any.
    fn read(&self, image: &GrayImage) -> Option<String>;
}

pub struct DataMatrixReader;

impl BarcodeReader for DataMatrixReader {
    fn name(&self) -> &'static str {
        "DataMatrix"
    }

    fn read(&self, image: &GrayImage) -> Option<String> {
        let (width, height) = image.dimensions();
        rxing::helpers::detect_in_luma(
            image.as_raw().clone(),
            width,
            height,
            Some(BarcodeFormat::DATA_MATRIX),
        )
        .ok()
        .map(|result| result.getText().to_string())
    }
}

pub struct QrReader;

impl BarcodeReader for QrReader {
    fn name(&self) -> &'static str {
        "QR"
    }

    fn read(&self, image: &GrayImage) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare(image.clone());
        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
    }
}

/// Tries each reader in turn; the first hit wins.
pub struct BarcodeChain {
    readers: Vec<Box<dyn BarcodeReader>>,
}

impl BarcodeChain {
    pub fn new(readers: Vec<Box<dyn BarcodeReader>>) -> Self {
        Self { readers }
    }
}

impl Default for BarcodeChain {
    fn default() -> Self {
        Self::new(vec![Box::new(DataMatrixReader), Box::new(QrReader)])
    }
}

impl BarcodeReader for BarcodeChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn read(&self, image: &GrayImage) -> Option<String> {
        self.readers.iter().find_map(|reader| {
            let text = reader.read(image)?;
            medid_common::debug!("{} barcode found", reader.name());
            Some(text)
        })
    }
}
