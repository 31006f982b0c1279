//! Rendering for `--output`: tables via `tabled`, JSON/YAML via serde,
//! and `plain` for scripts (one identifier per line).

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use ohmguard_core::{AlertStatus, Severity};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// `--color auto` means a terminal on stdout and no `NO_COLOR`.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status label, red for NEW and dim once closed.
pub fn paint_status(status: AlertStatus, color: bool) -> String {
    let label = status.to_string();
    if !color {
        return label;
    }
    match status {
        AlertStatus::New => label.red().bold().to_string(),
        AlertStatus::Ack => label.yellow().to_string(),
        AlertStatus::Resolved | AlertStatus::FalseAlarm => label.dimmed().to_string(),
    }
}

pub fn paint_severity(severity: Severity, color: bool) -> String {
    let label = severity.to_string();
    if !color {
        return label;
    }
    match severity {
        Severity::High => label.red().to_string(),
        Severity::Med => label.yellow().to_string(),
        Severity::Low => label,
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a collection: one `Tabled` row per item for `table`,
/// the items themselves for structured formats.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => {
            let ids: Vec<String> = data.iter().map(id_fn).collect();
            ids.join("\n")
        }
        structured => render_structured(structured, data),
    }
}

/// Render one item; `table` shows the key/value block from `detail_fn`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Plain => id_fn(data),
        structured => render_structured(structured, data),
    }
}

/// Write to stdout unless `--quiet` or there is nothing to show.
pub fn print_output(output: &str, quiet: bool) {
    if !quiet && !output.is_empty() {
        let _ = writeln!(io::stdout().lock(), "{output}");
    }
}

fn render_structured<T: serde::Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
    };
    rendered.unwrap_or_else(|e| format!("error: cannot serialize output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        id: &'static str,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: &'static str,
    }

    const ITEMS: [Item; 2] = [Item { id: "e1" }, Item { id: "e2" }];

    fn render(format: &OutputFormat) -> String {
        render_list(format, &ITEMS, |i| ItemRow { id: i.id }, |i| i.id.into())
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        assert_eq!(render(&OutputFormat::Plain), "e1\ne2");
    }

    #[test]
    fn table_has_header_and_rows() {
        let out = render(&OutputFormat::Table);
        assert!(out.contains("ID"));
        assert!(out.contains("e2"));
    }

    #[test]
    fn compact_json_is_single_line() {
        assert_eq!(render(&OutputFormat::JsonCompact), r#"[{"id":"e1"},{"id":"e2"}]"#);
    }

    #[test]
    fn uncolored_status_is_the_wire_name() {
        assert_eq!(paint_status(AlertStatus::FalseAlarm, false), "FALSE_ALARM");
    }
}
