use indicatif::ProgressStyle;

pub fn slide_bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} [{bar:32.cyan/bright_black}] {pos}/{len} slides {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▆▁")
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ])
}
