//! The analysis client: one schema-constrained completion per loaded table.
//!
//! Serializes headers plus a row-capped sample back into CSV, embeds it in a
//! fixed instructional prompt, and asks for a JSON completion matching
//! [`AnalysisResult`]. Failures surface to the caller; nothing is retried.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{strip_code_fence, GeminiClient};
use crate::charts::ChartSpec;
use crate::error::GeminiError;
use crate::table::Table;

/// The full structured output of one analysis call.
///
/// Replaced on the next analysis; cleared when a new file is loaded. The
/// insight, issue, and chart lists are required on the wire (empty is valid,
/// missing is not); notes may be absent and normalize to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub key_insights: Vec<String>,
    pub data_quality_issues: Vec<String>,
    pub narrative_hook: String,
    pub chart_parameters: Vec<ChartSpec>,
    #[serde(default)]
    pub analysis_notes: Vec<String>,
}

impl AnalysisResult {
    /// Condensed context string used to seed the follow-up chat session.
    pub fn chat_context(&self) -> String {
        let mut context = format!("Dataset summary: {}", self.summary);
        if !self.key_insights.is_empty() {
            context.push_str("\nKey insights:\n");
            for insight in &self.key_insights {
                context.push_str(&format!("- {}\n", insight));
            }
        }
        if !self.data_quality_issues.is_empty() {
            context.push_str("Data quality issues:\n");
            for issue in &self.data_quality_issues {
                context.push_str(&format!("- {}\n", issue));
            }
        }
        context
    }
}

impl GeminiClient {
    /// Analyze a table: send headers plus at most `sample_rows` rows and
    /// parse the model's structured verdict.
    #[instrument(skip(self, table), fields(rows = table.row_count()))]
    pub async fn analyze(
        &self,
        table: &Table,
        sample_rows: usize,
    ) -> Result<AnalysisResult, GeminiError> {
        let prompt = build_prompt(&table.sample_csv(sample_rows));
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": 0.2,
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        let url = self.endpoint_url(&self.model, "generateContent");
        let response = self.post_json(&url, &body).await?;
        let raw = Self::candidate_text(&response)?;
        debug!(len = raw.len(), "Analysis completion received");

        let mut result = parse_analysis(&raw)?;
        if table.row_count() > sample_rows {
            result.analysis_notes.insert(
                0,
                format!(
                    "Only the first {} of {} rows were sent for analysis; charts use the full table.",
                    sample_rows,
                    table.row_count()
                ),
            );
        }
        Ok(result)
    }
}

/// The fixed instructional prompt wrapped around the CSV sample.
fn build_prompt(sample_csv: &str) -> String {
    format!(
        "You are a data analyst. Analyze the following CSV data and respond with a \
         single JSON object containing exactly these fields:\n\
         - \"summary\": a short plain-language summary of the dataset\n\
         - \"keyInsights\": an array of the most notable insight strings\n\
         - \"dataQualityIssues\": an array of data quality issue strings (empty if none)\n\
         - \"narrativeHook\": one engaging sentence a report could open with\n\
         - \"chartParameters\": an array of chart suggestions, each with \"type\" \
         (one of \"category-count\", \"scatter\", \"multi-line\"), \"title\", \
         \"description\", \"columns\" (array of column names from the header), and \
         optional \"xAxisLabel\" and \"yAxisLabel\"\n\
         - \"analysisNotes\": an optional array of caveat strings\n\
         Use only column names that appear in the header row.\n\n\
         CSV data:\n{}",
        sample_csv
    )
}

/// The Gemini `responseSchema` constraining the completion shape.
fn response_schema() -> Value {
    let string_array = json!({"type": "ARRAY", "items": {"type": "STRING"}});
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {"type": "STRING"},
            "keyInsights": string_array,
            "dataQualityIssues": string_array,
            "narrativeHook": {"type": "STRING"},
            "chartParameters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {
                            "type": "STRING",
                            "enum": ["category-count", "scatter", "multi-line"]
                        },
                        "title": {"type": "STRING"},
                        "description": {"type": "STRING"},
                        "xAxisLabel": {"type": "STRING"},
                        "yAxisLabel": {"type": "STRING"},
                        "columns": string_array,
                    },
                    "required": ["type", "title", "description", "columns"]
                }
            },
            "analysisNotes": string_array,
        },
        "required": ["summary", "keyInsights", "dataQualityIssues", "narrativeHook", "chartParameters"]
    })
}

/// Parse a raw completion into an `AnalysisResult`, tolerating a wrapping
/// code fence.
fn parse_analysis(raw: &str) -> Result<AnalysisResult, GeminiError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).map_err(|e| GeminiError::ResponseParse {
        message: format!("Analysis response did not match the expected shape: {}", e),
    })
}
