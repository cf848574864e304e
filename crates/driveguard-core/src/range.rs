//! A1-notation range parsing and validation.
//!
//! Ranges are validated locally before any remote call so a typo like
//! `"README!!A1"` fails fast with a configuration error instead of an
//! opaque 400 from the API.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CoreError, CoreResult};

/// Matches `Tab!A1:F10`, `Tab!A:F`, `A1`, `A1:F10`, `A:F`.
/// Tab names may contain spaces, digits, underscores and dashes.
fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<tab>[A-Za-z0-9][A-Za-z0-9 _\-]*)!)?(?P<cells>[A-Za-z]{1,3}\d*(?::[A-Za-z]{1,3}\d*)?)$",
        )
        .expect("range pattern is valid")
    })
}

/// A validated A1-notation range, optionally scoped to a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    tab: Option<String>,
    cells: String,
}

impl SheetRange {
    /// Parses and validates an A1-notation range string.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let captures = range_pattern()
            .captures(input.trim())
            .ok_or_else(|| CoreError::config(format!("invalid A1 range: '{}'", input)))?;

        Ok(Self {
            tab: captures.name("tab").map(|m| m.as_str().to_string()),
            cells: captures["cells"].to_string(),
        })
    }

    /// Builds a range covering `span` (e.g. `"A:F"`) of the given tab.
    pub fn for_tab(tab: &str, span: &str) -> CoreResult<Self> {
        Self::parse(&format!("{}!{}", tab, span))
    }

    /// Returns the tab name, if the range is tab-scoped.
    pub fn tab(&self) -> Option<&str> {
        self.tab.as_deref()
    }

    /// Returns the cell portion (e.g. `"A1:F10"`).
    pub fn cells(&self) -> &str {
        &self.cells
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tab {
            Some(tab) => write!(f, "{}!{}", tab, self.cells),
            None => write!(f, "{}", self.cells),
        }
    }
}
