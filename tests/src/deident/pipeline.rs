use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use medid_common::config::Config;
use medid_core::barcode::BarcodeChain;
use medid_core::batch::{self, SLIDE_MAP_FILE};
use medid_core::svs::SlideLayout;
use medid_core::tiff::Layout;

use crate::fixtures::{self, FixedBarcode, LABEL_FILL, MACRO_FILL};

struct Workspace {
    _root: tempfile::TempDir,
    cfg: Config,
}

fn workspace() -> Workspace {
    let root = tempfile::tempdir().expect("tempdir");
    let base = root.path();
    let ident = base.join("identified");
    fs::create_dir(&ident).expect("ident dir");

    let mut cfg = Config::new(&ident, base.join("deidentified"));
    cfg.identified_metadata_path = Some(base.join("metadata"));
    cfg.label_image_path = Some(base.join("labels"));
    cfg.macro_image_path = Some(base.join("macros"));
    cfg.jobs = 2;

    Workspace { _root: root, cfg }
}

fn layout(path: &Path) -> SlideLayout {
    let mut file = File::open(path).expect("open output");
    SlideLayout::read(&mut file).expect("output is still a TIFF")
}

fn assert_deidentified(path: &Path) {
    let slide = layout(path);
    assert_eq!(slide.pages.len(), 3, "macro page still linked in {}", path.display());

    let label = &slide.pages[2];
    let Layout::Strips { offsets, byte_counts } = &label.layout else {
        panic!("label page lost its strips");
    };
    let bytes = fs::read(path).expect("read output");
    let start = offsets[0] as usize;
    let strip = &bytes[start..start + byte_counts[0] as usize];
    assert!(strip.iter().all(|b| *b == 0), "label pixels survived");
    assert!(!bytes.windows(4).any(|w| w == [LABEL_FILL; 4]));
    assert!(!bytes.windows(4).any(|w| w == [MACRO_FILL; 4]));
}

#[test]
fn deidentifies_a_mixed_directory() -> anyhow::Result<()> {
    let ws = workspace();
    let ident = &ws.cfg.identified_slides_path;

    let aperio = fixtures::aperio_slide(ident, "aperio.svs");
    let gt450 = fixtures::gt450_slide(ident, "gt450.svs");
    fixtures::write(ident, "corrupt.svs", b"II*\0\xff\xff\xff\x7f");
    fixtures::write(ident, "scan.isyntax", b"<xml/>");
    fixtures::write(ident, "notes.txt", b"not a slide");
    let originals = [fs::read(&aperio)?, fs::read(&gt450)?];

    let jobs = batch::plan(&ws.cfg)?;
    assert_eq!(jobs.len(), 4);

    let summary = batch::run(&ws.cfg, jobs, &FixedBarcode("S24-0042"), |_| {})?;
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 2);

    assert_eq!(fs::read(&aperio)?, originals[0]);
    assert_eq!(fs::read(&gt450)?, originals[1]);

    let out = &ws.cfg.deidentified_slides_path;
    let mut produced: Vec<String> = fs::read_dir(out)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    produced.sort();
    assert_eq!(produced, vec!["deident_aperio.svs", "deident_gt450.svs"]);

    assert_deidentified(&out.join("deident_aperio.svs"));
    assert_deidentified(&out.join("deident_gt450.svs"));

    let meta_dir = ws.cfg.identified_metadata_path.as_ref().unwrap();
    let meta: serde_json::Value =
        serde_json::from_slice(&fs::read(meta_dir.join("aperio.svs.json"))?)?;
    assert_eq!(meta["deident_filename"], "deident_aperio.svs");
    assert_eq!(meta["barcode"], "S24-0042");
    assert_eq!(meta["sha256_before"].as_str().map(str::len), Some(64));
    assert!(meta["sha256_after"].is_string());
    assert_ne!(meta["sha256_before"], meta["sha256_after"]);
    assert!(!meta_dir.join("corrupt.svs.json").exists());

    let map: BTreeMap<String, String> =
        serde_json::from_slice(&fs::read(meta_dir.join(SLIDE_MAP_FILE))?)?;
    assert_eq!(map.len(), 2);
    assert_eq!(map["gt450.svs"], "deident_gt450.svs");

    let labels = ws.cfg.label_image_path.as_ref().unwrap();
    let label = image::open(labels.join("aperio.svs.png"))?.to_rgb8();
    assert_eq!(label.dimensions(), (6, 4));
    assert_eq!(label.get_pixel(0, 0).0, [LABEL_FILL; 3]);

    let macros = ws.cfg.macro_image_path.as_ref().unwrap();
    assert_eq!(image::open(macros.join("gt450.svs.png"))?.width(), 8);
    Ok(())
}

#[test]
fn failures_are_reported_per_slide() -> anyhow::Result<()> {
    let ws = workspace();
    let ident = &ws.cfg.identified_slides_path;
    fixtures::write(ident, "corrupt.svs", b"MM\0*\0\0\0\x08");
    fixtures::write(ident, "scan.isyntax", b"<xml/>");

    let seen = std::sync::Mutex::new(Vec::new());
    let summary = batch::run(&ws.cfg, batch::plan(&ws.cfg)?, &FixedBarcode(""), |report| {
        seen.lock().unwrap().push(report.job.source_name());
    })?;

    let mut seen = seen.into_inner().unwrap();
    seen.sort();
    assert_eq!(seen, vec!["corrupt.svs", "scan.isyntax"]);
    assert_eq!(summary.succeeded(), 0);

    let messages: Vec<String> = summary
        .reports
        .iter()
        .map(|r| r.result.as_ref().unwrap_err().to_string())
        .collect();
    assert!(messages[0].contains("truncated"), "{}", messages[0]);
    assert_eq!(messages[1], "iSyntax deidentification is not supported");

    assert_eq!(fs::read_dir(&ws.cfg.deidentified_slides_path)?.count(), 0);
    Ok(())
}

#[test]
fn uuid_renaming_hides_the_original_name() -> anyhow::Result<()> {
    let mut ws = workspace();
    ws.cfg.rename_to_uuid = true;
    ws.cfg.hash_after = false;
    fixtures::aperio_slide(&ws.cfg.identified_slides_path, "DOE_JOHN_1961.svs");

    let summary = batch::run(&ws.cfg, batch::plan(&ws.cfg)?, &FixedBarcode("x"), |_| {})?;
    assert_eq!(summary.succeeded(), 1);

    let produced = summary.mapping()["DOE_JOHN_1961.svs"].clone();
    assert!(produced.starts_with("deident_") && produced.ends_with(".svs"));
    assert!(!produced.contains("DOE"));
    assert!(ws.cfg.deidentified_slides_path.join(&produced).is_file());

    let meta_dir = ws.cfg.identified_metadata_path.as_ref().unwrap();
    let meta: serde_json::Value =
        serde_json::from_slice(&fs::read(meta_dir.join("DOE_JOHN_1961.svs.json"))?)?;
    assert_eq!(meta["deident_filename"], produced.as_str());
    assert!(meta.get("sha256_after").is_none());
    Ok(())
}

#[test]
fn second_pass_is_harmless() -> anyhow::Result<()> {
    let ws = workspace();
    fixtures::aperio_slide(&ws.cfg.identified_slides_path, "again.svs");
    batch::run(&ws.cfg, batch::plan(&ws.cfg)?, &FixedBarcode("x"), |_| {})?;

    let mut cfg = Config::new(
        &ws.cfg.deidentified_slides_path,
        ws.cfg.deidentified_slides_path.join("twice"),
    );
    cfg.jobs = 1;
    let summary = batch::run(&cfg, batch::plan(&cfg)?, &FixedBarcode("x"), |_| {})?;
    assert_eq!(summary.succeeded(), 1);

    let first = ws.cfg.deidentified_slides_path.join("deident_again.svs");
    let second = cfg.deidentified_slides_path.join("deident_deident_again.svs");
    assert_eq!(fs::read(first)?, fs::read(&second)?);
    assert_deidentified(&second);
    Ok(())
}

#[test]
fn barcode_is_read_from_the_label() -> anyhow::Result<()> {
    let ws = workspace();
    fixtures::labelled_slide(&ws.cfg.identified_slides_path, "case-7.svs", "S24-0042 A1");

    let summary = batch::run(&ws.cfg, batch::plan(&ws.cfg)?, &BarcodeChain::default(), |_| {})?;
    assert_eq!(summary.succeeded(), 1);

    let meta_dir = ws.cfg.identified_metadata_path.as_ref().unwrap();
    let meta: serde_json::Value =
        serde_json::from_slice(&fs::read(meta_dir.join("case-7.svs.json"))?)?;
    assert_eq!(meta["barcode"], "S24-0042 A1");

    let out = layout(&ws.cfg.deidentified_slides_path.join("deident_case-7.svs"));
    assert_eq!(out.pages.len(), 2);
    Ok(())
}
