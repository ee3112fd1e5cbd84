//! Conversion of query results into a grid of strings for rendering.

use serde::Serialize;
use serde_json::Value;

use crate::query_result::{Column, QueryResult};

/// A rectangular grid of strings. The first row is the header (the columns'
/// friendly names); each following row has one cell per column, in declared
/// column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Build a table from a query result.
    ///
    /// Missing and null cells become empty strings. Cells in `integer` columns
    /// are printed as integers even though the service sends every number as
    /// a float; everything else uses its plain string form.
    pub fn from_query_result(result: &QueryResult) -> Self {
        let columns = &result.data.columns;

        let mut rows = Vec::with_capacity(result.data.rows.len() + 1);
        rows.push(columns.iter().map(|c| c.friendly_name.clone()).collect());

        for row in &result.data.rows {
            rows.push(
                columns
                    .iter()
                    .map(|column| format_cell(column, row.get(&column.name)))
                    .collect(),
            );
        }

        Self { rows }
    }

    /// The header row.
    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    /// The data rows, without the header.
    pub fn body(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    /// All rows, with or without the header.
    pub fn rows(&self, show_header: bool) -> &[Vec<String>] {
        if show_header {
            &self.rows
        } else {
            self.body()
        }
    }

    /// The number of columns.
    pub fn width(&self) -> usize {
        self.header().len()
    }
}

impl From<&QueryResult> for ResultTable {
    fn from(result: &QueryResult) -> Self {
        Self::from_query_result(result)
    }
}

fn format_cell(column: &Column, value: Option<&Value>) -> String {
    let value = match value {
        None | Some(Value::Null) => return String::new(),
        Some(v) => v,
    };

    if column.r#type.as_deref() == Some("integer")
        && let Value::Number(n) = value
    {
        if let Some(i) = n.as_i64() {
            return i.to_string();
        } else if let Some(u) = n.as_u64() {
            return u.to_string();
        } else if let Some(f) = n.as_f64() {
            return (f.trunc() as i64).to_string();
        }
    }

    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None if n.is_u64() => n.to_string(),
            // Display for f64 prints 5.0 as "5" and never uses an exponent.
            None => n.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        },
        other => other.to_string(),
    }
}
