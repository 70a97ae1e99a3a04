use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use rand::Rng;
use serde::Serialize;

use super::SynthError;
use super::patient::Patient;

pub const FONT_SIZE: f32 = 20.0;
/// Vertical distance between two burned lines.
pub const LINE_SPACING: i32 = 20;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Top-left corner of the first burned line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub x: u32,
    pub y: u32,
}

impl Origin {
    /// Somewhere in the top band, where scanners print the patient banner.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Origin {
            x: rng.random_range(0..180),
            y: rng.random_range(0..20),
        }
    }
}

/// Draws one line of text onto a frame.
pub trait TextPainter: Send + Sync {
    fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str);
}

/// Renders white text with a TrueType font.
pub struct FontPainter {
    font: FontVec,
    scale: PxScale,
}

impl FontPainter {
    pub fn from_file(path: &Path) -> Result<Self, SynthError> {
        let font_error = |reason: String| SynthError::Font {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = fs::read(path).map_err(|e| font_error(e.to_string()))?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| font_error(e.to_string()))?;

        Ok(FontPainter {
            font,
            scale: PxScale::from(FONT_SIZE),
        })
    }
}

impl TextPainter for FontPainter {
    fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str) {
        draw_text_mut(image, WHITE, x, y, self.scale, &self.font, text);
    }
}

/// Burns the patient's name, SSN and birth date into `image`, one line under the other.
pub fn burn(painter: &dyn TextPainter, image: &mut RgbImage, patient: &Patient, origin: Origin) {
    let x = origin.x as i32;
    for (i, line) in patient.burned_lines().iter().enumerate() {
        let y = origin.y as i32 + i as i32 * LINE_SPACING;
        painter.draw(image, x, y, line);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::synth::patient::Gender;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(i32, i32, String)>>);

    impl TextPainter for Recorder {
        fn draw(&self, _image: &mut RgbImage, x: i32, y: i32, text: &str) {
            self.0.lock().unwrap().push((x, y, text.to_string()));
        }
    }

    #[test]
    fn lines_are_stacked_under_the_origin() {
        let patient = Patient {
            name: "Paul Reyes".into(),
            ssn: "201-33-0457".into(),
            dob: NaiveDate::from_ymd_opt(1980, 1, 31).unwrap(),
            gender: Gender::Male,
        };
        let recorder = Recorder::default();
        let mut image = RgbImage::new(8, 8);

        burn(&recorder, &mut image, &patient, Origin { x: 17, y: 5 });

        let calls = recorder.0.into_inner().unwrap();
        assert_eq!(
            calls,
            vec![
                (17, 5, "Paul Reyes".to_string()),
                (17, 25, "SSN: 201-33-0457".to_string()),
                (17, 45, "DOB: 1980-01-31".to_string()),
            ]
        );
    }

    #[test]
    fn origin_stays_in_the_banner_band() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let origin = Origin::random(&mut rng);
            assert!(origin.x < 180 && origin.y < 20);
        }
    }

    #[test]
    fn unreadable_fonts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ttf");
        assert!(matches!(
            FontPainter::from_file(&missing),
            Err(SynthError::Font { path, .. }) if path == missing
        ));

        let garbage = dir.path().join("garbage.ttf");
        fs::write(&garbage, b"definitely not a font").unwrap();
        assert!(matches!(
            FontPainter::from_file(&garbage),
            Err(SynthError::Font { .. })
        ));
    }
}
