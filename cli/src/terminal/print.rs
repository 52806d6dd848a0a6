//! Report lines. Everything here goes out as `culler::print` events so it
//! interleaves cleanly with log lines and spinners.

use colored::*;
use culler_common::log::PRINT_TARGET;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;
use crate::terminal::format::Detail;

pub const TOTAL_WIDTH: usize = 64;

#[macro_export]
macro_rules! cprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// Splits the room left on a line into left and right padding.
fn split_fill(used: usize) -> (usize, usize) {
    let free: usize = TOTAL_WIDTH.saturating_sub(used);
    (free / 2, free - free / 2)
}

/// Dot leader that lines `key` up with the widest key in a block.
fn leader(key: &str, key_width: usize) -> String {
    ".".repeat(key_width.saturating_sub(key.width()) + 1)
}

pub fn banner(q_level: u8) {
    if q_level > 0 {
        return;
    }

    let title: String = format!(" culler {} ", env!("CARGO_PKG_VERSION"));
    let (left, right) = split_fill(title.width());
    print(&format!(
        "{}{}{}",
        "━".repeat(left).color(colors::SEPARATOR),
        title.to_uppercase().color(colors::FRESH).bold(),
        "━".repeat(right).color(colors::SEPARATOR)
    ));
}

/// Opens a block of output. Hidden from `-q` on.
pub fn section(title: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let label: String = format!("[ {} ]", title.to_uppercase());
    let (left, right) = split_fill(label.width());
    print(&format!(
        "{}{}{}",
        "-".repeat(left).color(colors::SEPARATOR),
        label.color(colors::PRIMARY),
        "-".repeat(right).color(colors::SEPARATOR)
    ));
}

pub fn rule() {
    print(&format!("{}", "━".repeat(TOTAL_WIDTH).color(colors::SEPARATOR)));
}

pub fn key_value(key: &str, key_width: usize, value: ColoredString) {
    bullet(format!(
        "{}{}{} {}",
        key.color(colors::PRIMARY),
        leader(key, key_width).color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR),
        value
    ));
}

pub fn bullet<T: AsRef<str>>(msg: T) {
    print(&format!("{} {}", "•".color(colors::SEPARATOR), msg.as_ref()));
}

/// A numbered entry with its details hanging below it.
pub fn entry(idx: usize, name: &str, details: &[Detail]) {
    print(&format!(
        "{}{} {}",
        "#".color(colors::SEPARATOR),
        (idx + 1).to_string().color(colors::ACCENT),
        name.color(colors::PRIMARY).bold()
    ));

    let key_width: usize = details.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    for (i, (key, value)) in details.iter().enumerate() {
        let branch: &str = if i + 1 == details.len() { "└" } else { "├" };
        print(&format!(
            "  {} {}{}{} {}",
            branch.color(colors::SEPARATOR),
            key.color(colors::TEXT_DEFAULT),
            leader(key, key_width).color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

pub fn centered(msg: &str) {
    let (left, _) = split_fill(console::measure_text_width(msg));
    print(&format!("{}{}", " ".repeat(left), msg));
}

pub fn no_results(msg: &str) {
    centered(&format!("{}", msg.color(colors::STALE).bold()));
}
