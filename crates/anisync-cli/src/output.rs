use clap::ValueEnum;
use comfy_table::{Attribute, Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Success,
    Info,
    Warning,
    Error,
}

impl MessageKind {
    fn json_type(self) -> &'static str {
        match self {
            MessageKind::Success => "success",
            MessageKind::Info => "info",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        }
    }
}

/// Prints command results as coloured text or one JSON object per message
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.message(MessageKind::Success, msg.as_ref());
    }

    /// Shown even in quiet mode
    pub fn error(&self, msg: impl AsRef<str>) {
        self.message(MessageKind::Error, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.message(MessageKind::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.message(MessageKind::Warning, msg.as_ref());
    }

    /// Plain line for human output, skipped in JSON mode
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.quiet || !self.is_human() {
            return;
        }
        println!("{}", msg.as_ref());
    }

    /// Print a table built with [`table_with_header`] in human mode
    pub fn table(&self, table: &Table) {
        if self.quiet || !self.is_human() {
            return;
        }
        println!("{}", table);
    }

    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet && self.format != OutputFormat::Human {
            return;
        }
        self.print_json(data);
    }

    fn message(&self, kind: MessageKind, msg: &str) {
        if self.quiet && kind != MessageKind::Error {
            return;
        }

        match self.format {
            OutputFormat::Human => match kind {
                MessageKind::Success => println!("{} {}", "✓".green(), msg),
                MessageKind::Info => println!("{}", msg),
                MessageKind::Warning => println!("{} {}", "⚠".yellow(), msg),
                MessageKind::Error => eprintln!("{} {}", "✗".red(), msg),
            },
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&message_json(kind, msg));
            }
        }
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(data).unwrap_or_default());
            }
            OutputFormat::JsonPretty => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            OutputFormat::Human => {
                println!("{}", data);
            }
        }
    }
}

fn message_json(kind: MessageKind, msg: &str) -> serde_json::Value {
    json!({
        "type": kind.json_type(),
        "message": msg
    })
}

/// Rounded UTF-8 table with a bold header row
pub fn table_with_header(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}
