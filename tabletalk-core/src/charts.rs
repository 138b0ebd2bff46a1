//! Chart specifications and the chart data mapper.
//!
//! The model suggests charts as `ChartSpec` values; `chart_data` reshapes the
//! parsed table into the record list a renderer needs. A spec whose kind and
//! column list don't line up (wrong arity, unknown column) maps to an empty
//! record list, which callers render as an explicit "could not generate"
//! placeholder rather than an empty chart.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::table::{Cell, Table};

/// The chart shapes the model may suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    /// Occurrence counts per distinct value of one column (bar chart).
    #[serde(rename = "category-count")]
    CategoryCount,
    /// One point per row over two numeric columns.
    #[serde(rename = "scatter")]
    Scatter,
    /// One x column plus one or more numeric series columns.
    #[serde(rename = "multi-line")]
    MultiLine,
}

/// A model-suggested description of one chart to render.
///
/// Produced once per analysis; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    /// Ordered column names the chart draws from.
    pub columns: Vec<String>,
}

impl ChartSpec {
    /// Whether the column list satisfies the kind's arity requirement.
    pub fn is_renderable(&self) -> bool {
        match self.kind {
            ChartKind::CategoryCount => self.columns.len() == 1,
            ChartKind::Scatter => self.columns.len() == 2,
            ChartKind::MultiLine => self.columns.len() >= 2,
        }
    }
}

/// Reshape the table into the record list for one chart spec.
///
/// Returns an empty Vec when the spec is unrenderable or names a column the
/// table does not have.
pub fn chart_data(spec: &ChartSpec, table: &Table) -> Vec<Map<String, Value>> {
    if !spec.is_renderable() {
        return Vec::new();
    }

    let indices: Option<Vec<usize>> = spec
        .columns
        .iter()
        .map(|name| table.column_index(name))
        .collect();
    let indices = match indices {
        Some(idx) => idx,
        None => return Vec::new(),
    };

    match spec.kind {
        ChartKind::CategoryCount => category_count(table, indices[0]),
        ChartKind::Scatter => scatter(table, &spec.columns, &indices),
        ChartKind::MultiLine => multi_line(table, &spec.columns, &indices),
    }
}

/// Group rows by the coerced value of one column, counting occurrences per
/// distinct value in first-seen order. Absent cells and cells that trim to
/// empty are excluded from the grouping.
fn category_count(table: &Table, col: usize) -> Vec<Map<String, Value>> {
    let mut groups: Vec<(String, u64)> = Vec::new();

    for row in 0..table.row_count() {
        let key = match table.cell(row, col) {
            None => continue,
            Some(Cell::Text(s)) if s.is_empty() => continue,
            Some(cell) => cell.key(),
        };
        match groups.iter_mut().find(|(name, _)| *name == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(name, count)| {
            let mut record = Map::new();
            record.insert("name".to_string(), Value::String(name));
            record.insert("count".to_string(), Value::Number(count.into()));
            record
        })
        .collect()
}

/// One record per row with both column values, but only for rows where both
/// values parsed as numbers; other rows are dropped entirely.
fn scatter(table: &Table, columns: &[String], indices: &[usize]) -> Vec<Map<String, Value>> {
    let mut records = Vec::new();

    for row in 0..table.row_count() {
        let x = table.cell(row, indices[0]);
        let y = table.cell(row, indices[1]);
        if let (Some(x @ Cell::Number(_)), Some(y @ Cell::Number(_))) = (x, y) {
            let mut record = Map::new();
            record.insert(columns[0].clone(), x.to_json());
            record.insert(columns[1].clone(), y.to_json());
            records.push(record);
        }
    }

    records
}

/// One record per row carrying the x value plus, for each series column, its
/// value only when that value parsed as a number for that row; non-numeric
/// series values leave the key out of the record rather than defaulting.
fn multi_line(table: &Table, columns: &[String], indices: &[usize]) -> Vec<Map<String, Value>> {
    let mut records = Vec::new();

    for row in 0..table.row_count() {
        let mut record = Map::new();
        let x = table
            .cell(row, indices[0])
            .unwrap_or_else(|| Cell::Text(String::new()));
        record.insert(columns[0].clone(), x.to_json());

        for (name, &col) in columns[1..].iter().zip(&indices[1..]) {
            if let Some(cell @ Cell::Number(_)) = table.cell(row, col) {
                record.insert(name.clone(), cell.to_json());
            }
        }
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn spec(kind: ChartKind, columns: &[&str]) -> ChartSpec {
        ChartSpec {
            kind,
            title: "t".into(),
            description: "d".into(),
            x_axis_label: None,
            y_axis_label: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_category_count_excludes_empty_and_keeps_order() {
        let table = Table::parse("cat\na\na\nb\n,").unwrap();
        let records = chart_data(&spec(ChartKind::CategoryCount, &["cat"]), &table);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], json!("a"));
        assert_eq!(records[0]["count"], json!(2));
        assert_eq!(records[1]["name"], json!("b"));
        assert_eq!(records[1]["count"], json!(1));
    }

    #[test]
    fn test_category_count_numeric_values_group_by_label() {
        let table = Table::parse("n\n5\n5.0\n2.5").unwrap();
        let records = chart_data(&spec(ChartKind::CategoryCount, &["n"]), &table);
        // 5 and 5.0 coerce to the same number and share a group key.
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], json!("5"));
        assert_eq!(records[0]["count"], json!(2));
        assert_eq!(records[1]["name"], json!("2.5"));
    }

    #[test]
    fn test_category_count_absent_cells_excluded() {
        let table = Table::parse("a,b\n1,x\n2").unwrap();
        let records = chart_data(&spec(ChartKind::CategoryCount, &["b"]), &table);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], json!("x"));
    }

    #[test]
    fn test_scatter_drops_rows_with_non_numeric_values() {
        let table = Table::parse("x,y\n1,2\nfoo,3\n4,bar").unwrap();
        let records = chart_data(&spec(ChartKind::Scatter, &["x", "y"]), &table);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["x"], json!(1.0));
        assert_eq!(records[0]["y"], json!(2.0));
    }

    #[test]
    fn test_multi_line_omits_non_numeric_series_keys() {
        let table = Table::parse("t,a,b\nq1,10,oops").unwrap();
        let records = chart_data(&spec(ChartKind::MultiLine, &["t", "a", "b"]), &table);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["t"], json!("q1"));
        assert_eq!(records[0]["a"], json!(10.0));
        assert!(!records[0].contains_key("b"));
    }

    #[test]
    fn test_multi_line_numeric_x_stays_numeric() {
        let table = Table::parse("t,a\n1,5\n2,6").unwrap();
        let records = chart_data(&spec(ChartKind::MultiLine, &["t", "a"]), &table);
        assert_eq!(records[0]["t"], json!(1.0));
        assert_eq!(records[1]["a"], json!(6.0));
    }

    #[test]
    fn test_wrong_arity_yields_empty() {
        let table = Table::parse("a,b\n1,2").unwrap();
        assert!(chart_data(&spec(ChartKind::CategoryCount, &["a", "b"]), &table).is_empty());
        assert!(chart_data(&spec(ChartKind::Scatter, &["a"]), &table).is_empty());
        assert!(chart_data(&spec(ChartKind::MultiLine, &["a"]), &table).is_empty());
    }

    #[test]
    fn test_record_keys_keep_insertion_order() {
        // Renderers and the PDF export print keys in iteration order, so
        // records must keep name-before-count and the x column first.
        let table = Table::parse("x,y\n1,2").unwrap();

        let records = chart_data(&spec(ChartKind::CategoryCount, &["x"]), &table);
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "count"]);

        let records = chart_data(&spec(ChartKind::Scatter, &["y", "x"]), &table);
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["y", "x"]);
    }

    #[test]
    fn test_unknown_column_yields_empty() {
        let table = Table::parse("a,b\n1,2").unwrap();
        assert!(chart_data(&spec(ChartKind::Scatter, &["a", "missing"]), &table).is_empty());
    }

    #[test]
    fn test_chart_spec_wire_shape() {
        let json = r#"{
            "type": "multi-line",
            "title": "Sales over time",
            "description": "Monthly sales by region",
            "xAxisLabel": "Month",
            "columns": ["month", "east", "west"]
        }"#;
        let spec: ChartSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.kind, ChartKind::MultiLine);
        assert_eq!(spec.x_axis_label.as_deref(), Some("Month"));
        assert!(spec.y_axis_label.is_none());
        assert_eq!(spec.columns.len(), 3);
        assert!(spec.is_renderable());
    }

    #[test]
    fn test_chart_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ChartKind::CategoryCount).unwrap(),
            "\"category-count\""
        );
        assert_eq!(
            serde_json::from_str::<ChartKind>("\"scatter\"").unwrap(),
            ChartKind::Scatter
        );
    }
}
