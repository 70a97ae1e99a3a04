use std::fmt::Display;

use colored::*;
use medid_common::PRINT_TARGET;
use tracing::info;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;
const TREE_KEY_WIDTH: usize = 8;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

/// Sends a finished line through the logger so it never tears the progress bar.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// `title` centered in a rule of `fill` characters.
fn rule(title: &str, fill: &str) -> String {
    let width = console::measure_text_width(title);
    let left = TOTAL_WIDTH.saturating_sub(width) / 2;
    let right = TOTAL_WIDTH.saturating_sub(width + left);
    format!(
        "{}{}{}",
        fill.repeat(left).bright_black(),
        title,
        fill.repeat(right).bright_black()
    )
}

pub fn banner(no_banner: bool, quiet: u8) {
    if no_banner || quiet > 0 {
        return;
    }
    let title = format!("⟦ MEDID v{} ⟧", env!("CARGO_PKG_VERSION"));
    print(&rule(&title.color(colors::PRIMARY).bold().to_string(), "═"));
}

pub fn header(msg: &str, quiet: u8) {
    if quiet > 0 {
        return;
    }
    let title = format!("⟦ {} ⟧", msg.to_uppercase());
    print(&rule(&title.color(colors::PRIMARY).to_string(), "─"));
}

pub fn fat_separator() {
    print(&"═".repeat(TOTAL_WIDTH).bright_black().to_string());
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{space}{msg}{space}"));
}

/// A block of `key....: value` lines whose colons line up.
pub struct KeyColumn {
    width: usize,
}

impl KeyColumn {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let width = keys.into_iter().map(str::len).max().unwrap_or(0);
        Self { width }
    }

    pub fn format(&self, key: &str, value: impl Display) -> String {
        let dots = ".".repeat((self.width + 1).saturating_sub(key.len()));
        format!(
            "{} {}{}{} {value}",
            ">".color(colors::SEPARATOR),
            key.color(colors::PRIMARY),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
        )
    }

    pub fn line(&self, key: &str, value: impl Display) {
        print(&self.format(key, value));
    }
}

/// Prints `[index] title` followed by one branch per detail.
pub fn tree(index: usize, title: &str, details: &[(&str, ColoredString)]) {
    print(&format!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        index.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        title.color(colors::PRIMARY)
    ));

    for (i, (key, value)) in details.iter().enumerate() {
        let branch = if i + 1 == details.len() { "└─" } else { "├─" };
        let dots = ".".repeat(TREE_KEY_WIDTH.saturating_sub(key.len()));
        print(&format!(
            " {} {}{}{} {value}",
            branch.bright_black(),
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
        ));
    }
}

const NO_RESULTS: &str = r#"
         _   _  ___    ____  _     ___ ____  _____ ____
        | \ | |/ _ \  / ___|| |   |_ _|  _ \| ____/ ___|
        |  \| | | | | \___ \| |    | || | | |  _| \___ \
        | |\  | |_| |  ___) | |___ | || |_| | |___ ___) |
        |_| \_|\___/  |____/|_____|___|____/|_____|____/
"#;

pub fn no_results() {
    print(&NO_RESULTS.red().bold().to_string());
}
