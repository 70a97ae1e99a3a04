use std::fs;
use std::path::{Path, PathBuf};

use dicom_dictionary_std::tags;
use dicom_object::open_file;
use medid_common::config::SynthConfig;
use medid_core::synth::{self, GROUND_TRUTH_FILE};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

use crate::fixtures::{self, BarPainter, SCAN_FILL, TEXT_FILL};

const ROWS: u16 = 120;
const COLUMNS: u16 = 320;

struct Workspace {
    _root: tempfile::TempDir,
    cfg: SynthConfig,
}

fn workspace() -> Workspace {
    let root = tempfile::tempdir().expect("tempdir");
    let cfg = SynthConfig::new(root.path().join("deid"), root.path().join("synth"));
    Workspace { _root: root, cfg }
}

fn exam(cfg: &SynthConfig, name: &str, frames: &[u32]) -> PathBuf {
    let dir = cfg.input.join(name);
    fs::create_dir_all(&dir).expect("exam dir");
    for (i, &n) in frames.iter().enumerate() {
        fixtures::ultrasound_dicom(&dir.join(format!("{i:04}.dcm")), ROWS, COLUMNS, n);
    }
    dir
}

fn attr(path: &Path, tag: dicom_core::Tag) -> String {
    let obj = open_file(path).expect("output is DICOM");
    let value = obj.element(tag).expect("attribute").to_str().expect("text");
    value.trim().to_string()
}

fn pixel(bytes: &[u8], frame: usize, x: u32, y: u32) -> [u8; 3] {
    let frame_len = ROWS as usize * COLUMNS as usize * 3;
    let at = frame * frame_len + ((y * COLUMNS as u32 + x) * 3) as usize;
    [bytes[at], bytes[at + 1], bytes[at + 2]]
}

#[test]
fn exams_get_a_patient_and_text_where_the_ground_truth_says() {
    let ws = workspace();
    exam(&ws.cfg, "OB20230117", &[1, 4]);
    exam(&ws.cfg, "ABD20230118", &[1]);
    fs::write(ws.cfg.input.join("ABD20230118").join("report.txt"), "n/a").expect("write");

    let mut rng = StdRng::seed_from_u64(2024);
    let summary = synth::run(&ws.cfg, &BarPainter, &mut rng, |_| {}).expect("run");
    assert_eq!((summary.written(), summary.patients), (3, 2));

    let json = fs::read_to_string(ws.cfg.output.join(GROUND_TRUTH_FILE)).expect("ground truth");
    let truth: Vec<Value> = serde_json::from_str(&json).expect("json");
    assert_eq!(truth.len(), 3);

    for entry in &truth {
        let output = PathBuf::from(entry["output"].as_str().expect("output"));
        let input = PathBuf::from(entry["input"].as_str().expect("input"));
        let (x, y) = (
            entry["x"].as_u64().expect("x") as u32,
            entry["y"].as_u64().expect("y") as u32,
        );
        assert!(input.starts_with(&ws.cfg.input));
        assert_eq!(output.file_name(), input.file_name());

        let name = attr(&output, tags::PATIENT_NAME);
        let folder = output.parent().and_then(Path::file_name).expect("folder");
        assert!(folder.to_string_lossy().contains(&name.replace(' ', "_")));
        assert_eq!(attr(&output, tags::PATIENT_BIRTH_DATE).len(), 8);

        let obj = open_file(&output).expect("output is DICOM");
        let bytes = obj.element(tags::PIXEL_DATA).expect("pixels").to_bytes().expect("bytes");
        let frames = bytes.len() / (ROWS as usize * COLUMNS as usize * 3);
        for frame in 0..frames {
            for line in 0..3 {
                assert_eq!(pixel(&bytes, frame, x, y + 20 * line), TEXT_FILL);
            }
            assert_eq!(pixel(&bytes, frame, COLUMNS as u32 - 1, ROWS as u32 - 1), SCAN_FILL);
        }
    }

    let obgyn: Vec<&Value> = truth
        .iter()
        .filter(|e| e["input"].as_str().is_some_and(|p| p.contains("OB20230117")))
        .collect();
    assert_eq!(obgyn.len(), 2);
    for entry in obgyn {
        let output = Path::new(entry["output"].as_str().expect("output"));
        assert_eq!(attr(output, tags::PATIENT_SEX), "F");
    }
}

#[test]
fn one_patient_per_exam() {
    let ws = workspace();
    exam(&ws.cfg, "CARD7", &[1, 1, 2]);

    let mut rng = StdRng::seed_from_u64(8);
    let summary = synth::run(&ws.cfg, &BarPainter, &mut rng, |_| {}).expect("run");

    let names: Vec<String> = summary
        .ground_truth
        .iter()
        .map(|t| attr(&t.output, tags::PATIENT_NAME))
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n == &names[0]));
    assert!(!names[0].is_empty());
}

#[test]
fn max_caps_the_files_written() {
    let ws = workspace();
    let mut cfg = ws.cfg.clone();
    exam(&cfg, "A100", &[1, 1]);
    exam(&cfg, "B200", &[1, 1]);
    cfg.max = Some(3);

    let mut reported = 0;
    let mut rng = StdRng::seed_from_u64(1);
    let summary = synth::run(&cfg, &BarPainter, &mut rng, |_| reported += 1).expect("run");

    assert_eq!(summary.written(), 3);
    assert_eq!(reported, 3);
    let written = fs::read_dir(&cfg.output)
        .expect("output")
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .map(|e| fs::read_dir(e.path()).expect("exam").count())
        .sum::<usize>();
    assert_eq!(written, 3);
}

#[test]
fn missing_input_is_an_error() {
    let ws = workspace();
    let mut rng = StdRng::seed_from_u64(1);
    assert!(synth::run(&ws.cfg, &BarPainter, &mut rng, |_| {}).is_err());
}
