//! Serializes a cut pattern for export collaborators (files, spreadsheets).
//!
//! The core only produces the payload; writing it anywhere is the caller's job.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::model::{CutPattern, Material};
use crate::types::Dimensional;

/// Errors raised by the export helper.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format '{0}' (supported: json, csv)")]
    UnsupportedFormat(String),
    #[error("Could not serialize pattern: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Known export formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// MIME type of the rendered document.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    material: &'a Material,
    pattern: &'a CutPattern,
}

/// Renders a pattern in the requested format.
///
/// # Parameters
/// * `pattern` - The pattern to export
/// * `material` - Sheet definition, included for context
/// * `format` - Target format; parse user input with `str::parse::<ExportFormat>()`,
///   which rejects unknown names with `ExportError::UnsupportedFormat`
pub fn export_pattern(
    pattern: &CutPattern,
    material: &Material,
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => {
            Ok(serde_json::to_string_pretty(&JsonExport { material, pattern })?)
        }
        ExportFormat::Csv => Ok(render_csv(pattern)),
    }
}

fn render_csv(pattern: &CutPattern) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "id,sheet,x,y,width,height,rotated,area,description");
    for cut in &pattern.cuts {
        let _ = writeln!(
            out,
            "{},{},{:.1},{:.1},{:.1},{:.1},{},{:.1},{}",
            csv_field(&cut.id),
            cut.sheet_index + 1,
            cut.x,
            cut.y,
            cut.width,
            cut.height,
            cut.rotated,
            cut.area(),
            csv_field(&cut.description),
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "efficiency,waste,sheets,used_area,waste_area");
    let _ = writeln!(
        out,
        "{:.2},{:.2},{},{:.1},{:.1}",
        pattern.efficiency,
        pattern.waste,
        pattern.sheets_needed,
        pattern.total_used_area,
        pattern.total_waste_area
    );
    out
}

/// Quotes a field when it contains separators, quotes or line breaks.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
