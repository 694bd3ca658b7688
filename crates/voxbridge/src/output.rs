//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Output settings resolved from flags first, then `[defaults]` in the config.
#[derive(Debug, Clone, Copy)]
pub struct OutputOpts {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl OutputOpts {
    pub fn resolve(
        global: &GlobalOpts,
        defaults: &voxbridge_config::Defaults,
    ) -> Result<Self, CliError> {
        let format = match global.output {
            Some(format) => format,
            None => parse_default("defaults.output", &defaults.output)?,
        };
        let color = match global.color {
            Some(mode) => mode,
            None => parse_default("defaults.color", &defaults.color)?,
        };
        Ok(Self {
            format,
            color: should_color(color),
            quiet: global.quiet,
        })
    }
}

fn parse_default<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// `[ok]` / `[fail]` marker for a dispatch result.
pub fn status_marker(ok: bool, color: bool) -> String {
    match (ok, color) {
        (true, true) => "[ok]".bright_green().to_string(),
        (true, false) => "[ok]".into(),
        (false, true) => "[fail]".bright_red().to_string(),
        (false, false) => "[fail]".into(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl FnMut(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single item; table mode uses a pre-formatted detail view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// One-line confirmation on stderr, suppressed by `--quiet`.
pub fn notice(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        name: String,
    }

    fn rows() -> Vec<Row> {
        vec![Row { name: "Lamp".into() }, Row { name: "Fan".into() }]
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let out = render_list(
            OutputFormat::Plain,
            &rows(),
            |r| Row { name: r.name.clone() },
            |r| r.name.clone(),
        )
        .unwrap_or_default();
        assert_eq!(out, "Lamp\nFan");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            OutputFormat::JsonCompact,
            &rows(),
            |r| Row { name: r.name.clone() },
            |r| r.name.clone(),
        )
        .unwrap_or_default();
        assert_eq!(out, r#"[{"name":"Lamp"},{"name":"Fan"}]"#);
    }

    #[test]
    fn markers_without_color_are_plain_ascii() {
        assert_eq!(status_marker(true, false), "[ok]");
        assert_eq!(status_marker(false, false), "[fail]");
    }
}
