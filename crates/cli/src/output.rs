// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal output: colors, widths, separators, and diagnostics.

use std::io::IsTerminal;

#[path = "output_diagnostic.rs"]
mod diagnostic;

pub use diagnostic::{print_error, print_warning};

/// Width used when the terminal size cannot be read
pub const DEFAULT_TERMINAL_WIDTH: u16 = 100;

/// Narrowest width the report wraps to
pub const MIN_REPORT_WIDTH: usize = 40;

/// Section header rule character
pub const SECTION_CHAR: char = '═';

/// Plain rule character
pub const RULE_CHAR: char = '─';

/// ANSI escape sequences
pub mod escape {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Applies ANSI styles when color is enabled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Color when stdout is a terminal, unless disabled by flag or NO_COLOR
    pub fn for_stdout(no_color: bool) -> Self {
        Self::new(!no_color && !crate::env::no_color() && std::io::stdout().is_terminal())
    }

    /// Color when stderr is a terminal, unless disabled by NO_COLOR
    pub fn for_stderr() -> Self {
        Self::new(!crate::env::no_color() && std::io::stderr().is_terminal())
    }

    pub fn is_color(self) -> bool {
        self.color
    }

    pub fn paint(self, style: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", style, text, escape::RESET)
        } else {
            text.to_string()
        }
    }

    pub fn bold(self, text: &str) -> String {
        self.paint(escape::BOLD, text)
    }

    pub fn dim(self, text: &str) -> String {
        self.paint(escape::DIM, text)
    }

    pub fn red(self, text: &str) -> String {
        self.paint(escape::RED, text)
    }

    pub fn green(self, text: &str) -> String {
        self.paint(escape::GREEN, text)
    }

    pub fn yellow(self, text: &str) -> String {
        self.paint(escape::YELLOW, text)
    }

    pub fn cyan(self, text: &str) -> String {
        self.paint(escape::CYAN, text)
    }
}

/// Current terminal width in columns
pub fn terminal_width() -> usize {
    let width = crossterm::terminal::size()
        .map(|(w, _)| w)
        .unwrap_or(DEFAULT_TERMINAL_WIDTH);
    usize::from(width).max(MIN_REPORT_WIDTH)
}

/// A full-width rule
pub fn make_rule(width: usize) -> String {
    RULE_CHAR.to_string().repeat(width)
}

/// A section header with centered text.
/// Format: "═══ {text} ═══"
pub fn make_section_header(text: &str, width: usize) -> String {
    let text_with_spaces = format!(" {} ", text);
    let text_len = unicode_width::UnicodeWidthStr::width(text_with_spaces.as_str());

    if width <= text_len {
        return text_with_spaces;
    }

    let remaining = width - text_len;
    let left_count = remaining / 2;
    let right_count = remaining - left_count;

    format!(
        "{}{}{}",
        SECTION_CHAR.to_string().repeat(left_count),
        text_with_spaces,
        SECTION_CHAR.to_string().repeat(right_count)
    )
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
