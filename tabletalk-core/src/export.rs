//! PDF report export.
//!
//! Writes the analysis (summary, notes, insights, quality issues, narrative
//! hook), a short preview of the data, and one section per suggested chart
//! with its mapped records tabulated as text. Chart rasterization is out of
//! scope; the record tables carry the same data a renderer would draw.

use genpdf::elements::{Break, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::{Document, SimplePageDecorator};
use serde_json::{Map, Value};
use std::path::Path;

use crate::charts::{chart_data, ChartSpec};
use crate::error::ExportError;
use crate::gemini::analysis::AnalysisResult;
use crate::table::Table;

/// Fixed file name used when the caller does not pick one.
pub const DEFAULT_REPORT_NAME: &str = "tabletalk-report.pdf";

/// Record lines shown per chart before eliding the rest.
const MAX_CHART_LINES: usize = 50;

/// Render the report and write it to `path`.
pub fn write_report(
    path: &Path,
    analysis: &AnalysisResult,
    table: &Table,
    preview_rows: usize,
) -> Result<(), ExportError> {
    let font_family = load_font()?;

    let mut doc = Document::new(font_family);
    doc.set_title("Tabletalk Analysis Report");

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(30);
    doc.set_page_decorator(decorator);

    let title_style = Style::new().bold().with_font_size(18);
    let heading_style = Style::new().bold().with_font_size(13);

    doc.push(Paragraph::new(StyledString::new(
        "Tabletalk Analysis Report",
        title_style,
    )));
    doc.push(Break::new(1));

    doc.push(Paragraph::new(analysis.summary.clone()));
    doc.push(Break::new(1));

    if !analysis.analysis_notes.is_empty() {
        push_list_section(
            &mut doc,
            heading_style,
            "Notes",
            &analysis.analysis_notes,
        );
    }
    push_list_section(&mut doc, heading_style, "Key Insights", &analysis.key_insights);
    push_list_section(
        &mut doc,
        heading_style,
        "Data Quality Issues",
        &analysis.data_quality_issues,
    );

    doc.push(Paragraph::new(StyledString::new(
        "Narrative Hook",
        heading_style,
    )));
    doc.push(Paragraph::new(analysis.narrative_hook.clone()));
    doc.push(Break::new(1));

    doc.push(Paragraph::new(StyledString::new(
        "Data Preview",
        heading_style,
    )));
    doc.push(Paragraph::new(table.headers.join(", ")));
    for row in table.preview(preview_rows) {
        doc.push(Paragraph::new(row.join(", ")));
    }
    doc.push(Break::new(1));

    for spec in &analysis.chart_parameters {
        push_chart_section(&mut doc, heading_style, spec, table);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    doc.render_to_file(path).map_err(|e| ExportError::RenderFailed {
        message: format!("Failed to render PDF: {}", e),
    })
}

fn push_list_section(doc: &mut Document, heading: Style, title: &str, items: &[String]) {
    doc.push(Paragraph::new(StyledString::new(title.to_string(), heading)));
    if items.is_empty() {
        doc.push(Paragraph::new("None."));
    }
    for item in items {
        doc.push(Paragraph::new(format!("- {}", item)));
    }
    doc.push(Break::new(1));
}

fn push_chart_section(doc: &mut Document, heading: Style, spec: &ChartSpec, table: &Table) {
    doc.push(Paragraph::new(StyledString::new(
        format!("Chart: {}", spec.title),
        heading,
    )));
    doc.push(Paragraph::new(spec.description.clone()));
    if let Some(label) = &spec.x_axis_label {
        doc.push(Paragraph::new(format!("X axis: {}", label)));
    }
    if let Some(label) = &spec.y_axis_label {
        doc.push(Paragraph::new(format!("Y axis: {}", label)));
    }

    let records = chart_data(spec, table);
    if records.is_empty() {
        doc.push(Paragraph::new(
            "Could not generate chart data for this suggestion.",
        ));
    } else {
        for record in records.iter().take(MAX_CHART_LINES) {
            doc.push(Paragraph::new(record_line(record)));
        }
        if records.len() > MAX_CHART_LINES {
            doc.push(Paragraph::new(format!(
                "... {} more records",
                records.len() - MAX_CHART_LINES
            )));
        }
    }
    doc.push(Break::new(1));
}

/// One chart record as a compact `key: value` line.
fn record_line(record: &Map<String, Value>) -> String {
    record
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Try the common system font locations.
fn load_font() -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, ExportError> {
    const CANDIDATES: &[(&str, &str)] = &[
        ("/usr/share/fonts/truetype/liberation", "LiberationSans"),
        ("/usr/share/fonts/liberation", "LiberationSans"),
        ("/usr/share/fonts/truetype/dejavu", "DejaVuSans"),
        ("/System/Library/Fonts", "Helvetica"),
        ("/Library/Fonts", "Arial"),
    ];

    for (dir, name) in CANDIDATES {
        if let Ok(family) = genpdf::fonts::from_files(dir, name, None) {
            return Ok(family);
        }
    }
    Err(ExportError::NoFont)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_line_formatting() {
        let mut record = Map::new();
        record.insert("name".to_string(), json!("east"));
        record.insert("count".to_string(), json!(4));
        assert_eq!(record_line(&record), "name: east, count: 4");
    }

    #[test]
    fn test_record_line_numeric_values() {
        let mut record = Map::new();
        record.insert("x".to_string(), json!(1.5));
        record.insert("y".to_string(), json!(2.0));
        assert_eq!(record_line(&record), "x: 1.5, y: 2.0");
    }

    // Rendering a full document depends on fonts installed on the host, so
    // the render path is exercised manually rather than in unit tests.
}
