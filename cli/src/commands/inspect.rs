use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use colored::*;

use crate::terminal::print::KeyColumn;
use crate::terminal::{colors, print};
use medid_common::slide::AssociatedImage;
use medid_core::svs::SlideLayout;
use medid_core::tiff::field::compression;
use medid_core::tiff::{Layout, Page, TiffKind};

type Detail = (&'static str, ColoredString);

pub fn inspect(path: &Path) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let slide = SlideLayout::read(&mut reader)
        .with_context(|| format!("{} is not a readable TIFF", path.display()))?;

    let kind = match slide.tiff.kind {
        TiffKind::Classic => "TIFF",
        TiffKind::Big => "BigTIFF",
    };

    let column = KeyColumn::new(["Container", "Byte order", "Scanner", "Pages"]);
    column.line("Container", kind);
    column.line("Byte order", format!("{:?} endian", slide.tiff.byte_order));
    column.line("Scanner", &slide.flavor);
    column.line("Pages", slide.pages.len());

    let label = slide.locate(AssociatedImage::Label).ok().flatten();
    let macro_page = slide.locate(AssociatedImage::Macro).ok().flatten();

    for page in &slide.pages {
        let role = if Some(page.index) == label {
            Some(AssociatedImage::Label)
        } else if Some(page.index) == macro_page {
            Some(AssociatedImage::Macro)
        } else {
            None
        };

        let headline = match page.headline() {
            "" => "(no description)",
            line => line,
        };
        print::tree(page.index, headline, &page_details(page, role));
    }

    Ok(())
}

fn page_details(page: &Page, role: Option<AssociatedImage>) -> Vec<Detail> {
    let codec = format!("{} ({})", compression::name(page.compression), page.compression);
    let mut details: Vec<Detail> = vec![
        ("Offset", page.offset.to_string().normal()),
        ("Size", format!("{}x{}", page.width, page.length).normal()),
        ("Codec", codec.normal()),
    ];

    let chunks = page.layout.chunk_count();
    let layout = match &page.layout {
        Layout::Strips { .. } => format!("{chunks} strips"),
        Layout::Tiles { width, length, .. } => format!("{chunks} tiles of {width}x{length}"),
        Layout::Missing => "no pixel data".to_string(),
    };
    details.push(("Layout", layout.normal()));

    if let Some(role) = role {
        details.push((
            "Role",
            format!("{role} (contains PHI)").color(colors::REDACTED).bold(),
        ));
    }

    details
}
