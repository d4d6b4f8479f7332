//! CLI Output Formatting.
//!
//! Handles output formatting for different formats (text, JSON, table).

use chrono::{TimeZone, Utc};
use console::style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::amount::format_units;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
    /// Table format
    Table,
    /// Minimal format (values only)
    Minimal,
}

impl OutputFormat {
    /// Whether the format is machine readable
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "table" | "tbl" => Ok(OutputFormat::Table),
            "minimal" | "min" => Ok(OutputFormat::Minimal),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    /// Output format
    format: OutputFormat,
    /// Color enabled
    color: bool,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format, color: true }
    }

    /// Disable color
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ "status": "success", "message": message }));
        } else if self.color {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("OK: {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ "status": "error", "message": message }));
        } else if self.color {
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ "status": "warning", "message": message }));
        } else if self.color {
            println!("{} {}", style("⚠").yellow(), message);
        } else {
            println!("WARNING: {}", message);
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.format.is_json() {
            return;
        }
        if self.color {
            println!("{} {}", style("ℹ").blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.print_json(data),
            OutputFormat::Minimal => {
                if let Ok(json) = serde_json::to_value(data) {
                    self.print_minimal(&json);
                }
            }
            _ => {
                if let Ok(json) = serde_json::to_value(data) {
                    self.print_text(&json, 0);
                }
            }
        }
    }

    /// Print table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.format.is_json() {
            let data: Vec<BTreeMap<&str, &str>> = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (*h, v.as_str()))
                        .collect()
                })
                .collect();
            self.print_json(&data);
        } else {
            self.print_table_text(headers, rows);
        }
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        if matches!(self.format, OutputFormat::Text | OutputFormat::Table) {
            println!();
            if self.color {
                println!("{}", style(format!("=== {} ===", title)).cyan().bold());
            } else {
                println!("=== {} ===", title);
            }
            println!();
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, data: &T) {
        let output = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };

        if let Ok(json) = output {
            println!("{}", json);
        }
    }

    fn print_text(&self, json: &serde_json::Value, indent: usize) {
        let prefix = "  ".repeat(indent);

        match json {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let key = if self.color {
                        style(key).bold().to_string()
                    } else {
                        key.clone()
                    };
                    match value {
                        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                            println!("{}{}:", prefix, key);
                            self.print_text(value, indent + 1);
                        }
                        _ => println!("{}{}: {}", prefix, key, format_value(value)),
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for (i, item) in arr.iter().enumerate() {
                    println!("{}[{}]:", prefix, i);
                    self.print_text(item, indent + 1);
                }
            }
            _ => println!("{}{}", prefix, format_value(json)),
        }
    }

    fn print_minimal(&self, json: &serde_json::Value) {
        match json {
            serde_json::Value::Object(map) => map.values().for_each(|v| self.print_minimal(v)),
            serde_json::Value::Array(arr) => arr.iter().for_each(|v| self.print_minimal(v)),
            _ => println!("{}", format_value(json)),
        }
    }

    fn print_table_text(&self, headers: &[&str], rows: &[Vec<String>]) {
        if headers.is_empty() {
            return;
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let header_line: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:width$}", h, width = w))
            .collect();
        if self.color {
            println!("{}", style(header_line.join(" | ")).bold());
        } else {
            println!("{}", header_line.join(" | "));
        }

        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        println!("{}", separator.join("-+-"));

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let width = widths.get(i).copied().unwrap_or(cell.len());
                    format!("{:width$}", cell, width = width)
                })
                .collect();
            println!("{}", cells.join(" | "));
        }
    }
}

/// Format a JSON value for text output
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "-".into(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPLAY HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Render a simulated timestamp as RFC 3339, falling back to raw seconds
pub fn format_timestamp(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| format!("{}s", seconds))
}

/// Render an 18-decimal rate as a percentage
pub fn format_rate(rate: u128) -> String {
    format!("{}%", format_units(rate.saturating_mul(100)))
}

/// Render an 18-decimal scale factor
pub fn format_scale_factor(scale_factor: u128) -> String {
    format!("{}x", format_units(scale_factor))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::ONE;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputFormat::Json).without_color();
        assert_eq!(formatter.format(), OutputFormat::Json);
        assert!(formatter.format().is_json());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&serde_json::Value::Null), "-");
        assert_eq!(format_value(&serde_json::json!(true)), "true");
        assert_eq!(format_value(&serde_json::json!(42)), "42");
        assert_eq!(format_value(&serde_json::json!("hello")), "hello");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_timestamp(86_400), "1970-01-02T00:00:00+00:00");
        assert_eq!(format_timestamp(u64::MAX), format!("{}s", u64::MAX));
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(ONE / 20), "5%");
        assert_eq!(format_rate(0), "0%");
        assert_eq!(format_scale_factor(ONE + ONE / 4), "1.25x");
    }
}
