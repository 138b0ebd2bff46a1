//! Tabular file parsing and typed cell coercion.
//!
//! The parser is deliberately minimal: lines split on `\n`, fields split on
//! commas, every field trimmed. Quoted fields, embedded commas/newlines, and
//! per-row column-count validation are not supported; ragged input produces
//! misaligned rows rather than an error. Downstream consumers (the chart
//! mapper) treat missing cells as absent values.

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// A parsed tabular file: one header row plus data rows of raw strings.
///
/// Replaced wholesale each time a new file is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Ordered column names from the first non-blank line.
    pub headers: Vec<String>,
    /// Ordered data rows; each row is an ordered sequence of cell strings.
    pub rows: Vec<Vec<String>>,
}

/// A cell value coerced once at lookup time.
///
/// A cell that trims to empty, or whose content is not a valid finite
/// numeric literal, stays text; otherwise it is a number. Keeping the tag
/// explicit makes the mapper's drop rules auditable.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Coerce a raw cell string to a typed cell.
    pub fn coerce(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Text(String::new());
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// Whether this cell parsed as a number.
    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    /// The cell rendered as a grouping key: numbers use their canonical
    /// string form (no trailing `.0` for integral values), text is as-is.
    pub fn key(&self) -> String {
        match self {
            Cell::Number(n) => fmt_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }

    /// The cell as a JSON value: numbers stay numbers, text stays a string.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(fmt_number(*n))),
            Cell::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Format a number the way it reads as a label: integral values without a
/// fractional part, everything else with Rust's shortest f64 form.
pub(crate) fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Table {
    /// Parse raw file text into a table.
    ///
    /// Blank lines are discarded. The first non-blank line becomes the
    /// headers, every later line a data row. Fails only when no non-blank
    /// lines exist.
    pub fn parse(text: &str) -> Result<Table, TableError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let header_line = lines.next().ok_or(TableError::Empty)?;
        let headers: Vec<String> = split_fields(header_line);

        let rows: Vec<Vec<String>> = lines.map(split_fields).collect();

        Ok(Table { headers, rows })
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The typed cell at (row, column), or `None` if the row is too short.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|raw| Cell::coerce(raw))
    }

    /// Re-serialize headers plus at most the first `max_rows` data rows as
    /// comma-joined lines, for embedding in the analysis prompt.
    pub fn sample_csv(&self, max_rows: usize) -> String {
        let mut out = String::new();
        out.push_str(&self.headers.join(","));
        for row in self.rows.iter().take(max_rows) {
            out.push('\n');
            out.push_str(&row.join(","));
        }
        out
    }

    /// The first `n` data rows, for report previews.
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(|field| field.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic() {
        let table = Table::parse("a,b,c\n1,2,3\n4,5,6").unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["1", "2", "3"]);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_parse_trims_fields_and_skips_blank_lines() {
        let table = Table::parse("\n  name , age \n\n alice , 30 \n\n").unwrap();
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows, vec![vec!["alice", "30"]]);
    }

    #[test]
    fn test_parse_empty_input_fails() {
        assert!(matches!(Table::parse(""), Err(TableError::Empty)));
        assert!(matches!(Table::parse("\n  \n\t\n"), Err(TableError::Empty)));
    }

    #[test]
    fn test_parse_headers_only() {
        let table = Table::parse("x,y").unwrap();
        assert_eq!(table.headers, vec!["x", "y"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_parse_ragged_rows_preserved() {
        // No column-count validation: short and long rows pass through.
        let table = Table::parse("a,b\n1\n1,2,3").unwrap();
        assert_eq!(table.rows[0], vec!["1"]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_cell_coercion() {
        assert_eq!(Cell::coerce("42"), Cell::Number(42.0));
        assert_eq!(Cell::coerce(" 3.5 "), Cell::Number(3.5));
        assert_eq!(Cell::coerce("-1e3"), Cell::Number(-1000.0));
        assert_eq!(Cell::coerce("foo"), Cell::Text("foo".to_string()));
        assert_eq!(Cell::coerce(""), Cell::Text(String::new()));
        assert_eq!(Cell::coerce("   "), Cell::Text(String::new()));
        // Non-finite literals stay text.
        assert_eq!(Cell::coerce("NaN"), Cell::Text("NaN".to_string()));
        assert_eq!(Cell::coerce("inf"), Cell::Text("inf".to_string()));
    }

    #[test]
    fn test_cell_key_formatting() {
        assert_eq!(Cell::Number(5.0).key(), "5");
        assert_eq!(Cell::Number(-2.0).key(), "-2");
        assert_eq!(Cell::Number(2.5).key(), "2.5");
        assert_eq!(Cell::Text("east".into()).key(), "east");
    }

    #[test]
    fn test_cell_lookup_absent() {
        let table = Table::parse("a,b\n1").unwrap();
        assert_eq!(table.cell(0, 0), Some(Cell::Number(1.0)));
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.cell(5, 0), None);
    }

    #[test]
    fn test_sample_csv_caps_rows() {
        let mut text = String::from("h1,h2");
        for i in 0..150 {
            text.push_str(&format!("\n{},{}", i, i * 2));
        }
        let table = Table::parse(&text).unwrap();

        let sample = table.sample_csv(100);
        let lines: Vec<&str> = sample.lines().collect();
        assert_eq!(lines.len(), 101); // header + 100 rows
        assert_eq!(lines[0], "h1,h2");
        assert_eq!(lines[1], "0,0");
        assert_eq!(lines[100], "99,198");
    }

    #[test]
    fn test_sample_csv_smaller_table() {
        let table = Table::parse("a\n1\n2").unwrap();
        assert_eq!(table.sample_csv(100), "a\n1\n2");
    }

    #[test]
    fn test_preview() {
        let table = Table::parse("a\n1\n2\n3").unwrap();
        assert_eq!(table.preview(2).len(), 2);
        assert_eq!(table.preview(10).len(), 3);
    }

    #[test]
    fn test_column_index() {
        let table = Table::parse("region,sales\n").unwrap();
        assert_eq!(table.column_index("sales"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }
}
