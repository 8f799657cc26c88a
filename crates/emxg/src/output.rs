//! Output formatting: table, JSON, YAML, CSV, plain.
//!
//! Renders any [`Frame`] in the format selected by `--output`. The table
//! view is built column by column from the frame itself, since result
//! columns are only known at runtime.

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;

use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use emxg_core::{CellValue, Frame};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Byte order mark so spreadsheet tools detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ── Color helpers ────────────────────────────────────────────────────

/// Whether to color output on stderr.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Status line on stderr.
pub fn status(message: &str, color: bool) {
    if color {
        eprintln!("{}", message.green());
    } else {
        eprintln!("{message}");
    }
}

pub fn warning(message: &str, color: bool) {
    if color {
        eprintln!("{} {message}", "warning:".yellow().bold());
    } else {
        eprintln!("warning: {message}");
    }
}

// ── Render dispatcher ────────────────────────────────────────────────

pub fn render_frame<F: Frame + ?Sized>(
    format: OutputFormat,
    frame: &F,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => render_table(frame),
        OutputFormat::Json => serde_json::to_string_pretty(frame.records())?,
        OutputFormat::JsonCompact => serde_json::to_string(frame.records())?,
        OutputFormat::Yaml => serde_yaml::to_string(frame.records())?,
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            write_csv(frame, &mut buf)?;
            String::from_utf8_lossy(&buf).trim_end().to_owned()
        }
        OutputFormat::Plain => render_plain(frame),
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

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<F: Frame + ?Sized>(frame: &F) -> String {
    let columns = frame.columns();
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for record in frame.records() {
        builder.push_record(
            columns
                .iter()
                .map(|c| record.get(c).map(display_cell).unwrap_or_default()),
        );
    }
    builder.build().with(Style::rounded()).to_string()
}

fn render_plain<F: Frame + ?Sized>(frame: &F) -> String {
    let Some(first) = frame.columns().first() else {
        return String::new();
    };
    frame
        .records()
        .iter()
        .map(|r| r.get(first).map(ToString::to_string).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbers with at most four decimals, trailing zeros dropped.
fn display_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Number(n) if n.is_finite() && n.fract() != 0.0 => {
            let s = format!("{n:.4}");
            s.trim_end_matches('0').trim_end_matches('.').to_owned()
        }
        other => other.to_string(),
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

/// Header row plus one line per record; missing cells are empty.
pub fn write_csv<F: Frame + ?Sized, W: Write>(frame: &F, writer: W) -> Result<(), CliError> {
    let columns = frame.columns();
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(columns)?;
    for record in frame.records() {
        csv.write_record(
            columns
                .iter()
                .map(|c| record.get(c).map(ToString::to_string).unwrap_or_default()),
        )?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `frame` to `path` as BOM-prefixed CSV.
pub fn save_csv<F: Frame + ?Sized>(frame: &F, path: &Path) -> Result<(), CliError> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;
    write_csv(frame, &mut file)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emxg_core::{Record, Table};
    use serde_json::json;

    fn sample() -> Table {
        let mut a = Record::new();
        a.insert("Code".into(), CellValue::Raw(json!("000001")));
        a.insert("Chg".into(), CellValue::Number(0.105));
        let mut b = Record::new();
        b.insert("Code".into(), CellValue::Raw(json!("600000")));
        b.insert("Chg".into(), CellValue::Number(0.123_456));
        b.insert("Board".into(), CellValue::Bool(true));
        Table::from_records(vec![a, b])
    }

    #[test]
    fn table_has_all_columns_and_trimmed_numbers() {
        let out = render_frame(OutputFormat::Table, &sample()).unwrap();
        assert!(out.contains("Code"));
        assert!(out.contains("Board"));
        assert!(out.contains("0.105"));
        assert!(out.contains("0.1235"));
        assert!(!out.contains("0.1050"));
    }

    #[test]
    fn csv_has_header_and_blank_missing_cells() {
        let out = render_frame(OutputFormat::Csv, &sample()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Code,Chg,Board");
        assert_eq!(lines[1], "000001,0.105,");
        assert_eq!(lines[2], "600000,0.123456,true");
    }

    #[test]
    fn json_keeps_column_order() {
        let out = render_frame(OutputFormat::JsonCompact, &sample()).unwrap();
        assert!(out.starts_with(r#"[{"Code":"000001","Chg":0.105}"#));
    }

    #[test]
    fn plain_prints_first_column() {
        let out = render_frame(OutputFormat::Plain, &sample()).unwrap();
        assert_eq!(out, "000001\n600000");
    }

    #[test]
    fn saved_csv_starts_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save_csv(&sample(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert!(String::from_utf8_lossy(&bytes[3..]).starts_with("Code,Chg,Board"));
    }
}
