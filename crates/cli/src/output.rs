//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use stepguard::{ValidationMessage, ValidationResult};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// One validator message flattened for display
#[derive(Debug, Serialize)]
pub struct Finding {
    pub kind: &'static str,
    pub line: Option<u64>,
    pub column: Option<u64>,
    pub message: String,
    pub extract: String,
}

impl Finding {
    fn new(msg: &ValidationMessage) -> Self {
        Self {
            kind: msg.kind.as_str(),
            line: msg.line,
            column: msg.column,
            message: msg.text.clone(),
            extract: msg.extract.clone(),
        }
    }
}

impl TableDisplay for Finding {
    fn headers() -> Vec<&'static str> {
        vec!["Kind", "Line", "Column", "Message", "Extract"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.kind.to_string(),
            self.line.map(|l| l.to_string()).unwrap_or_default(),
            self.column.map(|c| c.to_string()).unwrap_or_default(),
            self.message.clone(),
            self.extract.clone(),
        ]
    }
}

/// Errors first, then warnings
pub fn findings(result: &ValidationResult) -> Vec<Finding> {
    result
        .errors
        .iter()
        .map(Finding::new)
        .chain(result.warnings.iter().map(Finding::new))
        .collect()
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No findings.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for item in items {
                println!("{}", item.row().join("\t"));
            }
        }
    }
}

/// Print any serializable report as JSON
pub fn print_json<T: Serialize>(item: &T) {
    println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
}

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a section heading
pub fn heading(msg: &str) {
    println!("{}", msg.bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepguard::MessageKind;

    fn message(kind: MessageKind, text: &str, line: u64) -> ValidationMessage {
        ValidationMessage {
            kind,
            text: text.to_string(),
            line: Some(line),
            column: None,
            extract: "<div>".to_string(),
        }
    }

    #[test]
    fn test_findings_list_errors_before_warnings() {
        let result = ValidationResult {
            warnings: vec![message(MessageKind::Warning, "Consider adding a lang attribute", 1)],
            errors: vec![message(MessageKind::Error, "Stray end tag", 7)],
        };
        let rows = findings(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, "error");
        assert_eq!(rows[1].kind, "warning");
        assert_eq!(rows[0].row(), vec!["error", "7", "", "Stray end tag", "<div>"]);
    }
}
