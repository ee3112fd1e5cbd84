//! Writers for [ResultTable]s.

use std::io::{self, Write};

use comfy_table::{Table, presets::ASCII_NO_BORDERS};
use tabwriter::TabWriter;

use crate::table::ResultTable;

/// An error encountered while rendering a table.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum RenderError {
    #[error("failed to write output")]
    Io(#[from] io::Error),
    #[error("failed to write CSV")]
    Csv(#[from] csv::Error),
    #[error("failed to write JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to write YAML")]
    Yaml(#[from] serde_yaml::Error),
}

/// The supported output formats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// A grid with column separators and a rule under the header.
    #[default]
    Table1,
    /// Tab-aligned columns with no decoration.
    Table2,
    /// Comma-separated values.
    Csv,
    /// A JSON array of arrays.
    Json,
    /// A YAML sequence of sequences.
    Yaml,
}

impl Renderer {
    /// Write `table` to `out`, omitting the header row if `show_header` is
    /// false.
    pub fn render(
        self,
        out: &mut impl Write,
        table: &ResultTable,
        show_header: bool,
    ) -> Result<(), RenderError> {
        match self {
            Renderer::Table1 => render_table(out, table, show_header),
            Renderer::Table2 => render_plain(out, table, show_header),
            Renderer::Csv => render_csv(out, table.rows(show_header)),
            Renderer::Json => {
                serde_json::to_writer(&mut *out, table.rows(show_header))?;
                writeln!(out)?;
                Ok(())
            }
            Renderer::Yaml => {
                serde_yaml::to_writer(&mut *out, table.rows(show_header))?;
                Ok(())
            }
        }
    }
}

fn render_table(
    out: &mut impl Write,
    table: &ResultTable,
    show_header: bool,
) -> Result<(), RenderError> {
    if table.width() == 0 {
        return Ok(());
    }

    let mut grid = Table::new();
    grid.load_preset(ASCII_NO_BORDERS);

    if show_header {
        grid.set_header(table.header());
    }

    for row in table.body() {
        grid.add_row(row);
    }

    writeln!(out, "{grid}")?;
    Ok(())
}

fn render_plain(
    out: &mut impl Write,
    table: &ResultTable,
    show_header: bool,
) -> Result<(), RenderError> {
    let mut tw = TabWriter::new(out);

    if show_header {
        let header: Vec<_> = table.header().iter().map(|h| h.to_uppercase()).collect();
        writeln!(tw, "{}", header.join("\t"))?;
    }

    for row in table.body() {
        writeln!(tw, "{}", row.join("\t"))?;
    }

    tw.flush()?;
    Ok(())
}

fn render_csv(out: &mut impl Write, rows: &[Vec<String>]) -> Result<(), RenderError> {
    let mut w = csv::WriterBuilder::new().flexible(true).from_writer(out);
    for row in rows {
        w.write_record(row)?;
    }

    w.flush()?;
    Ok(())
}
