//! Document kinds and the invariants shared by every rendered file.

use std::{collections::HashSet, fmt};

/// Excel rejects worksheet names longer than this many characters.
pub const MAX_WORKSHEET_NAME_CHARS: usize = 31;

/// Name given to a worksheet whose requested name is empty.
pub const DEFAULT_WORKSHEET_NAME: &str = "Sheet";

/// Binary office formats produced by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Docx,
    Xlsx,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Xlsx => "xlsx",
        }
    }

    /// Upper-case label used in caller-facing diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Docx => "DOCX",
            DocumentKind::Xlsx => "XLSX",
        }
    }

}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a file came from the primary renderer or from a fallback document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    Full,
    Fallback,
}

impl Fidelity {
    pub fn as_str(self) -> &'static str {
        match self {
            Fidelity::Full => "full",
            Fidelity::Fallback => "fallback",
        }
    }
}

/// Truncate a caller-supplied worksheet name to the Excel limit.
///
/// Counts Unicode scalar values, not bytes, so multi-byte names are never cut
/// inside a character.
pub fn worksheet_name(name: &str) -> String {
    name.chars().take(MAX_WORKSHEET_NAME_CHARS).collect()
}

/// Hands out worksheet names for one workbook.
///
/// Names are truncated, empty names become [`DEFAULT_WORKSHEET_NAME`], and a
/// name already taken (compared case-insensitively, as Excel does) gets the
/// lowest free numeric suffix: `Totals`, `Totals1`, `Totals2`. The suffix
/// counts toward the length limit, so the base is shortened to make room.
#[derive(Debug, Default)]
pub struct WorksheetNames {
    taken: HashSet<String>,
}

impl WorksheetNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, requested: &str) -> String {
        let base = if requested.is_empty() {
            DEFAULT_WORKSHEET_NAME
        } else {
            requested
        };

        let mut name = worksheet_name(base);
        let mut counter = 0usize;
        while self.taken.contains(&name.to_lowercase()) {
            counter += 1;
            let suffix = counter.to_string();
            let room = MAX_WORKSHEET_NAME_CHARS.saturating_sub(suffix.len());
            name = base.chars().take(room).chain(suffix.chars()).collect();
        }

        self.taken.insert(name.to_lowercase());
        name
    }
}
