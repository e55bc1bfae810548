//! Output formatting for diagnostic results.
//!
//! Diagnostic tools return structured JSON by default. `table` and `markdown`
//! render the rows into the `formatted` field and drop the JSON rows, so large
//! result sets are not sent twice.

use crate::models::{JsonRow, QueryResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for diagnostic results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format (like psql)
    Table,
    /// Markdown table format
    Markdown,
}

/// Render `result` in `format`. Failed results are returned untouched.
pub fn apply_format(mut result: QueryResult, format: OutputFormat) -> QueryResult {
    if !result.is_success() {
        return result;
    }
    let rendered = match format {
        OutputFormat::Json => return result,
        OutputFormat::Table => format_as_table(
            &result.columns,
            &result.rows,
            result.count,
            result.execution_time_ms,
        ),
        OutputFormat::Markdown => format_as_markdown(&result.columns, &result.rows, result.count),
    };
    result.formatted = Some(match &result.note {
        Some(note) => format!("{rendered}\nNote: {note}\n"),
        None => rendered,
    });
    result.rows.clear();
    result
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Collapse whitespace so query text stays on one table line.
fn cell_text(value: &JsonValue) -> String {
    format_value(value)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_as_table(
    columns: &[String],
    rows: &[JsonRow],
    row_count: usize,
    execution_time_ms: u64,
) -> String {
    if columns.is_empty() {
        return format!(
            "(0 rows) ({:.2} sec)\n",
            execution_time_ms as f64 / 1000.0
        );
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, col) in columns.iter().enumerate() {
            if let Some(value) = row.get(col) {
                widths[i] = widths[i].max(cell_text(value).width());
            }
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", pad_center(col, *w)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                let value = row.get(col).unwrap_or(&JsonValue::Null);
                let text = cell_text(value);
                if matches!(value, JsonValue::Number(_)) {
                    format!("| {} ", pad_left(&text, *w))
                } else {
                    format!("| {} ", pad_right(&text, *w))
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "({} {}) ({:.2} sec)\n",
        row_count,
        row_text,
        execution_time_ms as f64 / 1000.0
    ));

    output
}

pub fn format_as_markdown(columns: &[String], rows: &[JsonRow], row_count: usize) -> String {
    if columns.is_empty() {
        return "*No rows*".to_string();
    }

    let mut output = String::new();

    let header: String = columns
        .iter()
        .map(|c| format!("| {} ", c))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in rows {
        let row_str: String = columns
            .iter()
            .map(|col| {
                let value = row.get(col).unwrap_or(&JsonValue::Null);
                format!("| {} ", cell_text(value).replace('|', "\\|"))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*", row_count));

    output
}

// `format!` width counts chars, not display columns; pad by display width.
fn pad_right(text: &str, width: usize) -> String {
    format!("{}{}", text, " ".repeat(width.saturating_sub(text.width())))
}

fn pad_left(text: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width.saturating_sub(text.width())), text)
}

fn pad_center(text: &str, width: usize) -> String {
    let gap = width.saturating_sub(text.width());
    let left = gap / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(gap - left))
}
