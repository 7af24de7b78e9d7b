// Output formatting for CLI

use std::io::{self, Write};

use anyhow::Result;

use crate::cli::config::OutputFormat;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    pub quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output metadata
    pub fn output_metadata(&self, metadata: &serde_json::Value, writer: &mut dyn Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(metadata)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(metadata)?)?;
            }
            OutputFormat::KeyValue => {
                self.output_key_value(metadata, writer)?;
            }
            OutputFormat::Table => {
                self.output_table(metadata, writer)?;
            }
        }
        Ok(())
    }

    /// Output as key-value pairs, nested objects flattened to dotted keys
    fn output_key_value(&self, metadata: &serde_json::Value, writer: &mut dyn Write) -> io::Result<()> {
        let mut items = Vec::new();
        flatten("", metadata, &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in items {
            writeln!(writer, "{}: {}", key, value)?;
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, metadata: &serde_json::Value, writer: &mut dyn Write) -> io::Result<()> {
        let mut items = Vec::new();
        flatten("", metadata, &mut items);
        let max_key_len = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        for (key, value) in items {
            writeln!(writer, "{:<width$}{}", format!("{}:", key), value, width = max_key_len + 2)?;
        }
        writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(obj) if !obj.is_empty() => {
            for (key, inner) in obj {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&key, inner, out);
            }
        }
        other => out.push((prefix.to_string(), format_value(other))),
    }
}

/// Format a JSON value for display
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "(null)".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(arr) => {
            if arr.is_empty() {
                "[]".to_string()
            } else {
                format!("[{} items]", arr.len())
            }
        }
        serde_json::Value::Object(_) => "{}".to_string(),
    }
}

/// Progress indicator for batch operations
pub struct ProgressBar {
    total: usize,
    current: usize,
    show: bool,
}

impl ProgressBar {
    pub fn new(total: usize, show: bool) -> Self {
        Self {
            total,
            current: 0,
            show,
        }
    }

    pub fn increment(&mut self, label: &str) {
        self.current += 1;
        if self.show && self.total > 0 {
            let percent = (self.current * 100) / self.total;
            print!("\r[{}/{}] ({}%) {} ", self.current, self.total, percent, label);
            if self.current == self.total {
                println!();
            }
            io::stdout().flush().ok();
        }
    }
}
