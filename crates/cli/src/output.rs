//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dockhand_common::{ContainerSummary, DirectoryEntry};
use serde::Serialize;

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

impl TableDisplay for ContainerSummary {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Image", "State", "Status"]
    }

    fn row(&self) -> Vec<String> {
        let state = if self.is_running() {
            self.state.green().to_string()
        } else {
            self.state.yellow().to_string()
        };
        vec![
            self.short_id.clone(),
            self.name.clone(),
            self.image.clone(),
            state,
            self.status.clone(),
        ]
    }
}

impl TableDisplay for DirectoryEntry {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Permissions", "Size", "Modified"]
    }

    fn row(&self) -> Vec<String> {
        let name = match (&self.link_target, self.is_directory) {
            (Some(target), _) => format!("{} -> {}", self.name.cyan(), target),
            (None, true) => format!("{}/", self.name).blue().bold().to_string(),
            (None, false) => self.name.clone(),
        };
        vec![
            name,
            self.permission_string.clone(),
            self.size_bytes_display.clone(),
            self.modified_display.clone(),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No items found.");
                return;
            }
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
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print a simple message
pub fn print_message(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "message": message })),
        _ => println!("{}", message),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✔".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✘".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_directory: bool, link: Option<&str>) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            is_directory,
            permission_string: "-rw-r--r--".to_string(),
            size_bytes_display: "20".to_string(),
            modified_display: "Mar 4 10:12".to_string(),
            link_target: link.map(|l| l.to_string()),
        }
    }

    #[test]
    fn test_entry_row_columns() {
        colored::control::set_override(false);
        assert_eq!(
            entry("notes.txt", false, None).row(),
            vec!["notes.txt", "-rw-r--r--", "20", "Mar 4 10:12"]
        );
        assert_eq!(entry("logs", true, None).row()[0], "logs/");
        assert_eq!(entry("current", false, Some("logs/today")).row()[0], "current -> logs/today");
    }

    #[test]
    fn test_container_row_uses_short_id() {
        colored::control::set_override(false);
        let c = ContainerSummary {
            id: "4f2a9c1e7b3d8a6f5e4c".to_string(),
            short_id: "4f2a9c1e7b3d".to_string(),
            name: "web".to_string(),
            image: "nginx:1.25".to_string(),
            state: "running".to_string(),
            status: "Up 2 hours".to_string(),
        };
        let row = c.row();
        assert_eq!(row[0], "4f2a9c1e7b3d");
        assert_eq!(row[3], "running");
        assert_eq!(row.len(), ContainerSummary::headers().len());
    }
}
