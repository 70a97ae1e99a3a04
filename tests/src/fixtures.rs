use std::fs;
use std::path::{Path, PathBuf};

use dicom_core::value::PrimitiveValue;
use dicom_core::{DataElement, VR};
use dicom_dictionary_std::tags;
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use image::{GrayImage, Luma, Rgb, RgbImage};
use medid_core::barcode::BarcodeReader;
use medid_core::synth::burn::TextPainter;
use medid_core::tiff::tag;
use medid_core::tiff::writer::{IfdBuilder, TiffWriter};
use rxing::{BarcodeFormat, MultiFormatWriter, Writer};

pub const LABEL_FILL: u8 = 0xA5;
pub const MACRO_FILL: u8 = 0x5A;

/// Answers every label with the same text.
pub struct FixedBarcode(pub &'static str);

impl BarcodeReader for FixedBarcode {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn read(&self, _image: &GrayImage) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn rgb_page(description: &str, width: u32, height: u32, fill: u8) -> IfdBuilder {
    IfdBuilder::new()
        .long(tag::IMAGE_WIDTH, &[width])
        .long(tag::IMAGE_LENGTH, &[height])
        .short(tag::BITS_PER_SAMPLE, &[8, 8, 8])
        .short(tag::COMPRESSION, &[1])
        .short(tag::PHOTOMETRIC, &[2])
        .ascii(tag::IMAGE_DESCRIPTION, description)
        .short(tag::SAMPLES_PER_PIXEL, &[3])
        .long(tag::ROWS_PER_STRIP, &[height])
        .strips(vec![vec![fill; (width * height * 3) as usize]])
}

/// A label page whose pixels are `label`, repeated over the three channels.
fn label_page(description: &str, label: &GrayImage) -> IfdBuilder {
    let (width, height) = label.dimensions();
    let rgb: Vec<u8> = label.pixels().flat_map(|Luma([v])| [*v; 3]).collect();
    IfdBuilder::new()
        .long(tag::IMAGE_WIDTH, &[width])
        .long(tag::IMAGE_LENGTH, &[height])
        .short(tag::BITS_PER_SAMPLE, &[8, 8, 8])
        .short(tag::COMPRESSION, &[1])
        .short(tag::PHOTOMETRIC, &[2])
        .ascii(tag::IMAGE_DESCRIPTION, description)
        .short(tag::SAMPLES_PER_PIXEL, &[3])
        .long(tag::ROWS_PER_STRIP, &[height])
        .strips(vec![rgb])
}

fn tiled_base(description: &str) -> IfdBuilder {
    IfdBuilder::new()
        .long(tag::IMAGE_WIDTH, &[32])
        .long(tag::IMAGE_LENGTH, &[16])
        .long(tag::TILE_WIDTH, &[16])
        .long(tag::TILE_LENGTH, &[16])
        .short(tag::COMPRESSION, &[7])
        .ascii(tag::IMAGE_DESCRIPTION, description)
        .tiles(vec![vec![0x11; 64], vec![0x22; 64]])
}

/// An AT2-style slide: base, thumbnail, then pages named "label" and "macro".
pub fn aperio_slide(dir: &Path, name: &str) -> PathBuf {
    let prefix = "Aperio Image Library v12.0.15\r\n";
    let bytes = TiffWriter::new()
        .ifd(tiled_base(&format!("{prefix}32x16 [0,0 32x16] (16x16) JPEG/RGB Q=70|AppMag = 40")))
        .ifd(rgb_page(&format!("{prefix}32x16 -> 4x2 - |AppMag = 40"), 4, 2, 0x33))
        .ifd(rgb_page(&format!("{prefix}label 6x4"), 6, 4, LABEL_FILL))
        .ifd(rgb_page(&format!("{prefix}macro 8x4"), 8, 4, MACRO_FILL))
        .finish()
        .expect("fixture slide");
    write(dir, name, &bytes)
}

/// A GT450 slide: nothing is named, label and macro are the last two pages.
pub fn gt450_slide(dir: &Path, name: &str) -> PathBuf {
    let bytes = TiffWriter::new()
        .ifd(tiled_base("Aperio Leica Biosystems GT450 v1.0.1\r\n32x16 (16x16) JPEG/RGB Q=91"))
        .ifd(rgb_page("", 4, 2, 0x33))
        .ifd(rgb_page("", 6, 4, LABEL_FILL))
        .ifd(rgb_page("", 8, 4, MACRO_FILL))
        .finish()
        .expect("fixture slide");
    write(dir, name, &bytes)
}

/// A DataMatrix symbol as it would be printed on a slide label.
pub fn datamatrix(text: &str) -> GrayImage {
    const SCALE: u32 = 8;
    const QUIET: u32 = 40;

    let matrix = MultiFormatWriter::default()
        .encode(text, &BarcodeFormat::DATA_MATRIX, 0, 0)
        .expect("encodable label text");
    let (w, h) = (matrix.getWidth(), matrix.getHeight());

    GrayImage::from_fn(w * SCALE + 2 * QUIET, h * SCALE + 2 * QUIET, |x, y| {
        let inside =
            (QUIET..QUIET + w * SCALE).contains(&x) && (QUIET..QUIET + h * SCALE).contains(&y);
        if inside && matrix.get((x - QUIET) / SCALE, (y - QUIET) / SCALE) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// An Aperio slide whose label carries a real DataMatrix code.
pub fn labelled_slide(dir: &Path, name: &str, barcode: &str) -> PathBuf {
    let prefix = "Aperio Image Library v12.0.15\r\n";
    let label = datamatrix(barcode);
    let bytes = TiffWriter::new()
        .ifd(tiled_base(&format!("{prefix}32x16 [0,0 32x16] (16x16) JPEG/RGB Q=70")))
        .ifd(label_page(&format!("{prefix}label {}x{}", label.width(), label.height()), &label))
        .ifd(rgb_page(&format!("{prefix}macro 8x4"), 8, 4, MACRO_FILL))
        .finish()
        .expect("fixture slide");
    write(dir, name, &bytes)
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("fixture write");
    path
}

pub const SCAN_FILL: [u8; 3] = [12, 12, 12];
pub const TEXT_FILL: [u8; 3] = [255, 255, 255];

/// Paints a 6px bar per character instead of glyphs, so burned text is easy to find.
pub struct BarPainter;

impl TextPainter for BarPainter {
    fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str) {
        let width = 6 * text.len() as i32;
        for py in y.max(0)..(y + 6).min(image.height() as i32) {
            for px in x.max(0)..(x + width).min(image.width() as i32) {
                image.put_pixel(px as u32, py as u32, Rgb(TEXT_FILL));
            }
        }
    }
}

/// A deidentified ultrasound export: 8-bit interleaved RGB, `frames` frames of dark scan.
pub fn ultrasound_dicom(path: &Path, rows: u16, columns: u16, frames: u32) {
    const US_IMAGE: &str = "1.2.840.10008.5.1.4.1.1.6.1";
    let pixels = SCAN_FILL.repeat(rows as usize * columns as usize * frames as usize);

    let mut obj = InMemDicomObject::new_empty();
    let mut put = |tag, vr, value: PrimitiveValue| {
        obj.put(DataElement::new(tag, vr, value));
    };
    put(tags::SOP_CLASS_UID, VR::UI, US_IMAGE.into());
    put(tags::PATIENT_NAME, VR::PN, "".into());
    put(tags::PATIENT_SEX, VR::CS, "O".into());
    put(tags::SAMPLES_PER_PIXEL, VR::US, 3_u16.into());
    put(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "RGB".into());
    put(tags::PLANAR_CONFIGURATION, VR::US, 0_u16.into());
    if frames > 1 {
        put(tags::NUMBER_OF_FRAMES, VR::IS, frames.to_string().into());
    }
    put(tags::ROWS, VR::US, rows.into());
    put(tags::COLUMNS, VR::US, columns.into());
    put(tags::BITS_ALLOCATED, VR::US, 8_u16.into());
    put(tags::BITS_STORED, VR::US, 8_u16.into());
    put(tags::HIGH_BIT, VR::US, 7_u16.into());
    put(tags::PIXEL_REPRESENTATION, VR::US, 0_u16.into());
    put(tags::PIXEL_DATA, VR::OB, pixels.into());

    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax("1.2.840.10008.1.2.1")
                .media_storage_sop_class_uid(US_IMAGE)
                .media_storage_sop_instance_uid("2.25.88213947112093847561029384756102938475"),
        )
        .expect("file meta");
    file.write_to_file(path).expect("write dicom");
}
