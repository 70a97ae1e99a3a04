//! Burning synthetic PHI into one DICOM file.
//!
//! Only native (uncompressed) 8-bit RGB pixel data is handled, which is how ultrasound
//! stills and cine loops are exported once deidentified. A single frame is treated as an
//! image and several frames as a video; either way every frame gets the same
//! annotation at the same place.

use std::path::Path;

use dicom_core::value::{PrimitiveValue, Value};
use dicom_core::{DataElement, Tag, VR};
use dicom_dictionary_std::tags;
use dicom_object::{DefaultDicomObject, open_file};
use image::RgbImage;

use super::SynthError;
use super::burn::{self, Origin, TextPainter};
use super::patient::Patient;

/// Pixel geometry of an RGB DICOM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    pub rows: u32,
    pub columns: u32,
    pub frames: u32,
    /// Colour planes stored one after the other (PlanarConfiguration 1).
    pub planar: bool,
}

impl FrameLayout {
    pub fn read(obj: &DefaultDicomObject, path: &Path) -> Result<Self, SynthError> {
        let samples = int_attr(obj, tags::SAMPLES_PER_PIXEL, path)?.unwrap_or(1);
        let bits = int_attr(obj, tags::BITS_ALLOCATED, path)?.unwrap_or(0);
        if samples != 3 || bits != 8 {
            return Err(SynthError::UnsupportedPixels {
                path: path.to_path_buf(),
                samples,
                bits,
            });
        }

        Ok(FrameLayout {
            rows: int_attr(obj, tags::ROWS, path)?.unwrap_or(0),
            columns: int_attr(obj, tags::COLUMNS, path)?.unwrap_or(0),
            frames: int_attr(obj, tags::NUMBER_OF_FRAMES, path)?.unwrap_or(1).max(1),
            planar: int_attr(obj, tags::PLANAR_CONFIGURATION, path)?.unwrap_or(0) == 1,
        })
    }

    pub fn frame_len(&self) -> usize {
        self.rows as usize * self.columns as usize * 3
    }

    pub fn is_video(&self) -> bool {
        self.frames > 1
    }
}

fn int_attr(obj: &DefaultDicomObject, tag: Tag, path: &Path) -> Result<Option<u32>, SynthError> {
    match obj.get(tag) {
        Some(element) => element
            .to_int::<u32>()
            .map(Some)
            .map_err(|e| SynthError::dicom(path, e)),
        None => Ok(None),
    }
}

fn native_pixels(obj: &DefaultDicomObject, path: &Path) -> Result<Vec<u8>, SynthError> {
    let element = obj
        .get(tags::PIXEL_DATA)
        .ok_or_else(|| SynthError::NoPixelData(path.to_path_buf()))?;
    match element.value() {
        Value::Primitive(value) => Ok(value.to_bytes().into_owned()),
        _ => Err(SynthError::Encapsulated(path.to_path_buf())),
    }
}

/// RRR..GGG..BBB.. to RGBRGB..
fn interleave(planes: &[u8]) -> Vec<u8> {
    let plane = planes.len() / 3;
    (0..plane)
        .flat_map(|i| [planes[i], planes[plane + i], planes[2 * plane + i]])
        .collect()
}

/// Writes `input` to `output` with `patient` burned into every frame and recorded in
/// the header. Returns the layout of the burned pixels.
pub fn inject_phi(
    input: &Path,
    output: &Path,
    patient: &Patient,
    painter: &dyn TextPainter,
    origin: Origin,
) -> Result<FrameLayout, SynthError> {
    let mut obj = open_file(input).map_err(|e| SynthError::dicom(input, e))?;
    let layout = FrameLayout::read(&obj, input)?;
    let pixels = native_pixels(&obj, input)?;

    let frame_len = layout.frame_len();
    let expected = frame_len * layout.frames as usize;
    if frame_len == 0 || pixels.len() < expected {
        return Err(SynthError::ShortPixelData {
            path: input.to_path_buf(),
            expected,
            found: pixels.len(),
        });
    }

    let mut burned = Vec::with_capacity(expected + 1);
    for frame in pixels[..expected].chunks_exact(frame_len) {
        let raw = if layout.planar {
            interleave(frame)
        } else {
            frame.to_vec()
        };
        let mut image = RgbImage::from_raw(layout.columns, layout.rows, raw).ok_or_else(|| {
            SynthError::ShortPixelData {
                path: input.to_path_buf(),
                expected,
                found: pixels.len(),
            }
        })?;
        burn::burn(painter, &mut image, patient, origin);
        burned.extend_from_slice(image.as_raw());
    }
    if burned.len() % 2 == 1 {
        burned.push(0);
    }

    obj.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from(patient.name.as_str()),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_BIRTH_DATE,
        VR::DA,
        PrimitiveValue::from(patient.dicom_birth_date()),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_SEX,
        VR::CS,
        PrimitiveValue::from(patient.gender.code()),
    ));
    if layout.planar {
        obj.put(DataElement::new(
            tags::PLANAR_CONFIGURATION,
            VR::US,
            PrimitiveValue::from(0_u16),
        ));
    }
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(burned),
    ));

    obj.write_to_file(output)
        .map_err(|e| SynthError::dicom(output, e))?;
    Ok(layout)
}
