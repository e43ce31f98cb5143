// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Stderr diagnostics for problems outside the report: configuration errors
//! that stop a run before it starts, and artifacts that could not be written
//! after it finished.

use super::Palette;
use std::fmt::Display;
use std::io::{self, Write};

/// Severity of a diagnostic line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Level {
    Error,
    Warning,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
        }
    }

    fn paint(self, palette: Palette, text: &str) -> String {
        match self {
            Self::Error => palette.red(text),
            Self::Warning => palette.yellow(text),
        }
    }
}

/// Print an error to stderr, red when stderr is a terminal
pub fn print_error(msg: impl Display) {
    write_diagnostic(&mut io::stderr(), Palette::for_stderr(), Level::Error, msg);
}

/// Print a warning to stderr, yellow when stderr is a terminal
pub fn print_warning(msg: impl Display) {
    write_diagnostic(&mut io::stderr(), Palette::for_stderr(), Level::Warning, msg);
}

fn write_diagnostic<W: Write>(writer: &mut W, palette: Palette, level: Level, msg: impl Display) {
    let line = format!("{}: {}", level.label(), msg);
    let _ = writeln!(writer, "{}", level.paint(palette, &line));
}

#[cfg(test)]
#[path = "output_diagnostic_tests.rs"]
mod tests;
