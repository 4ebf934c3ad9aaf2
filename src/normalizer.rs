use crate::error::{DashboardError, Result};
use crate::schema::{
    NormalizedRow, NormalizedTable, PipelineConfig, RawTable, TableSelector, CANONICAL_COLUMNS,
};
use crate::splitter::TableSplitter;
use log::{debug, info};

/// Maps either input shape onto the canonical column set.
pub struct SchemaNormalizer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SchemaNormalizer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Delimited path: split the export, pick the line-item table, clean it.
    pub fn normalize_delimited(&self, content: &str) -> Result<NormalizedTable> {
        let tables = TableSplitter::new(self.config.header_marker.clone()).split(content)?;
        let source = self.select_table(tables)?;
        self.normalize_export_table(source)
    }

    /// Spreadsheet path: the sheet is already in canonical shape apart from
    /// stray whitespace around the header names.
    pub fn normalize_spreadsheet(&self, mut table: RawTable) -> Result<NormalizedTable> {
        for header in &mut table.headers {
            *header = header.trim().to_string();
        }

        let rows = table
            .rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| (idx + 1, row))
            .collect();

        let normalized = project_canonical(&table.headers, rows)?;
        info!(
            "Normalized spreadsheet upload into {} row(s)",
            normalized.len()
        );
        Ok(normalized)
    }

    pub fn select_table(&self, mut tables: Vec<RawTable>) -> Result<RawTable> {
        let found = tables.len();

        let index = match &self.config.table_selector {
            TableSelector::Positional { index } => *index,
            TableSelector::Signature {
                columns,
                fallback_index,
            } => {
                let matched = tables
                    .iter()
                    .position(|t| columns.iter().all(|c| t.column_index(c).is_some()));
                match matched {
                    Some(idx) => {
                        debug!("Header signature {:?} matched sub-table #{}", columns, idx + 1);
                        idx
                    }
                    None => {
                        debug!(
                            "No sub-table matched signature {:?}, using position {}",
                            columns,
                            fallback_index + 1
                        );
                        *fallback_index
                    }
                }
            }
        };

        if index >= found {
            return Err(DashboardError::TableNotFound {
                expected: index + 1,
                found,
            });
        }

        debug!("Selected sub-table #{} of {}", index + 1, found);
        Ok(tables.swap_remove(index))
    }

    /// Cleans the line-item table of a delimited export.
    pub fn normalize_export_table(&self, table: RawTable) -> Result<NormalizedTable> {
        let RawTable { headers, rows } = table;

        let keep: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !self.config.drop_columns.contains(h))
            .map(|(idx, _)| idx)
            .collect();

        let mut headers: Vec<String> = keep.iter().map(|&idx| headers[idx].clone()).collect();

        let total = rows.len();
        let mut numbered: Vec<(usize, Vec<String>)> = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let row = keep
                    .iter()
                    .map(|&col| row.get(col).cloned().unwrap_or_default())
                    .collect();
                (idx + 1, row)
            })
            .collect();

        numbered.retain(|(_, row)| !row.iter().any(|cell| self.config.is_missing(cell)));
        if numbered.len() < total {
            debug!(
                "Dropped {} row(s) with missing values",
                total - numbered.len()
            );
        }

        for header in &mut headers {
            if let Some(renamed) = self.config.column_renames.get(header.as_str()) {
                *header = renamed.clone();
            }
        }

        inject_constant(&mut headers, &mut numbered, "status", &self.config.default_status);
        inject_constant(
            &mut headers,
            &mut numbered,
            "location",
            &self.config.default_location,
        );

        let normalized = project_canonical(&headers, numbered)?;
        info!(
            "Normalized delimited export into {} row(s) out of {}",
            normalized.len(),
            total
        );
        Ok(normalized)
    }
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Overwrites `name` in every row, appending the column when absent.
fn inject_constant(
    headers: &mut Vec<String>,
    rows: &mut [(usize, Vec<String>)],
    name: &str,
    value: &str,
) {
    match find_column(headers, name) {
        Some(idx) => {
            for (_, row) in rows.iter_mut() {
                row[idx] = value.to_string();
            }
        }
        None => {
            headers.push(name.to_string());
            for (_, row) in rows.iter_mut() {
                row.push(value.to_string());
            }
        }
    }
}

/// Checks the required columns and reorders every row into canonical order.
fn project_canonical(
    headers: &[String],
    rows: Vec<(usize, Vec<String>)>,
) -> Result<NormalizedTable> {
    let mut indices = Vec::with_capacity(CANONICAL_COLUMNS.len());
    let mut missing = Vec::new();

    for column in CANONICAL_COLUMNS {
        match find_column(headers, column) {
            Some(idx) => indices.push(idx),
            None => missing.push(column.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(DashboardError::MissingColumns(missing));
    }

    let cell = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();

    let rows = rows
        .into_iter()
        .map(|(number, row)| NormalizedRow {
            number,
            date: cell(&row, indices[0]),
            item_type: cell(&row, indices[1]),
            quantity: cell(&row, indices[2]),
            total_price: cell(&row, indices[3]),
            status: cell(&row, indices[4]),
            location: cell(&row, indices[5]),
        })
        .collect();

    Ok(NormalizedTable { rows })
}
