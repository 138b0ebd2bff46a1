//! Terminal rendering for analysis results, chart data, and transcripts.

use tabletalk_core::{chart_data, AnalysisResult, Message, Sender, Table};

const HEADING: &str = "\x1b[1;36m";
const DIM: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Print the full analysis: summary, notes, insights, issues, hook, and
/// the suggested charts.
pub fn print_analysis(analysis: &AnalysisResult, row_count: Option<usize>) {
    println!();
    if let Some(rows) = row_count {
        println!("{}[{} rows loaded]{}", DIM, rows, RESET);
    }
    println!("{}Summary{}", HEADING, RESET);
    println!("  {}", analysis.summary);

    if !analysis.analysis_notes.is_empty() {
        println!("\n{}Notes{}", HEADING, RESET);
        for note in &analysis.analysis_notes {
            println!("  {}- {}{}", DIM, note, RESET);
        }
    }

    println!("\n{}Key Insights{}", HEADING, RESET);
    for insight in &analysis.key_insights {
        println!("  - {}", insight);
    }

    if !analysis.data_quality_issues.is_empty() {
        println!("\n{}Data Quality Issues{}", HEADING, RESET);
        for issue in &analysis.data_quality_issues {
            println!("  - {}", issue);
        }
    }

    println!("\n{}Where to dig in{}", HEADING, RESET);
    println!("  {}", analysis.narrative_hook);

    if !analysis.chart_parameters.is_empty() {
        println!(
            "\n{}{} chart suggestion(s){} (show with /charts)",
            HEADING,
            analysis.chart_parameters.len(),
            RESET
        );
    }
    println!();
}

/// Print every suggested chart as a small text table.
pub fn print_charts(analysis: &AnalysisResult, table: &Table) {
    if analysis.chart_parameters.is_empty() {
        println!("No chart suggestions in the current analysis.");
        return;
    }

    for spec in &analysis.chart_parameters {
        println!("\n{}{}{}", HEADING, spec.title, RESET);
        println!("{}{}{}", DIM, spec.description, RESET);

        let records = chart_data(spec, table);
        if records.is_empty() {
            println!("  (could not generate data for this chart)");
            continue;
        }

        // Column layout from the first record's keys.
        let keys: Vec<&String> = records[0].keys().collect();
        let mut widths: Vec<usize> = keys.iter().map(|k| k.len()).collect();
        let cells: Vec<Vec<String>> = records
            .iter()
            .map(|record| {
                keys.iter()
                    .map(|k| match record.get(*k) {
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(v) => v.to_string(),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let header: Vec<String> = keys
            .iter()
            .zip(&widths)
            .map(|(k, w)| format!("{:<w$}", k, w = w))
            .collect();
        println!("  {}", header.join("  "));
        for row in cells.iter().take(20) {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<w$}", c, w = w))
                .collect();
            println!("  {}", line.join("  "));
        }
        if records.len() > 20 {
            println!("  {}... {} more rows{}", DIM, records.len() - 20, RESET);
        }
    }
    println!();
}

/// Print the transcript with 1-based indices for /play.
pub fn print_transcript(transcript: &[Message]) {
    if transcript.is_empty() {
        println!("No messages yet.");
        return;
    }
    for (i, message) in transcript.iter().enumerate() {
        let label = match message.sender {
            Sender::User => "\x1b[1;34myou\x1b[0m",
            Sender::Assistant => "\x1b[32mtabletalk\x1b[0m",
        };
        println!("{}{:>3}.{} {}: {}", DIM, i + 1, RESET, label, message.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletalk_core::{ChartKind, ChartSpec};

    // Rendering goes to stdout; these only check it does not panic on
    // awkward inputs.

    #[test]
    fn test_print_charts_handles_unmappable_spec() {
        let table = Table::parse("a,b\n1,2").unwrap();
        let analysis = AnalysisResult {
            summary: "s".into(),
            key_insights: vec![],
            data_quality_issues: vec![],
            narrative_hook: "h".into(),
            chart_parameters: vec![ChartSpec {
                kind: ChartKind::Scatter,
                title: "t".into(),
                description: "d".into(),
                columns: vec!["missing".into(), "also-missing".into()],
                x_axis_label: None,
                y_axis_label: None,
            }],
            analysis_notes: vec![],
        };
        print_charts(&analysis, &table);
    }

    #[test]
    fn test_print_transcript_empty() {
        print_transcript(&[]);
    }
}
