use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Column names of the canonical transaction schema, in canonical order.
pub const CANONICAL_COLUMNS: [&str; 6] = [
    "date",
    "type",
    "quantity",
    "total_price",
    "status",
    "location",
];

/// Label of the 1-based row position assigned during normalization.
pub const ROW_NUMBER_LABEL: &str = "No";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// A concatenated multi-table `.csv` dump.
    Delimited,
    /// An `.xlsx`/`.xls` workbook that already carries the canonical columns.
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(SourceFormat::Delimited),
            Some("xlsx") | Some("xls") => Ok(SourceFormat::Spreadsheet),
            _ => Err(DashboardError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// A file handed over by the upload widget.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::from_file_name(&self.file_name)
    }
}

/// A table exactly as parsed from the source, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the normalized table, still textual, with its `No` label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub number: usize,
    pub date: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: String,
    pub total_price: String,
    pub status: String,
    pub location: String,
}

/// Output of the schema normalizer: exactly the canonical columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn columns(&self) -> [&'static str; 6] {
        CANONICAL_COLUMNS
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// `No` label of the normalized row this record came from.
    pub row_number: usize,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: u64,
    pub total_price: u64,
    pub status: String,
    pub location: String,
    /// Full weekday name, e.g. "Monday".
    pub day_of_week: String,
    /// Year-month key, e.g. "2024-03".
    pub month: String,
}

/// The canonical transaction table. Never mutated after construction;
/// filtering produces a new table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTable {
    records: Vec<TransactionRecord>,
}

impl CanonicalTable {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransactionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest transaction dates, `None` for an empty table.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    pub fn head(&self, n: usize) -> &[TransactionRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

impl<'a> IntoIterator for &'a CanonicalTable {
    type Item = &'a TransactionRecord;
    type IntoIter = std::slice::Iter<'a, TransactionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum TableSelector {
    #[schemars(
        description = "Take the sub-table at a fixed zero-based position. The known export layout puts the sales line items at index 5 (the 6th table)."
    )]
    Positional { index: usize },

    #[schemars(
        description = "Take the first sub-table whose header contains every listed column. Falls back to the positional index when no sub-table matches."
    )]
    Signature {
        columns: Vec<String>,
        fallback_index: usize,
    },
}

impl Default for TableSelector {
    fn default() -> Self {
        Self::Positional { index: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(
        description = "Line prefix that marks the start of a new sub-table in a multi-table CSV export. Only counts when a sub-table is already being accumulated."
    )]
    pub header_marker: String,

    #[schemars(description = "How the sales line-item table is picked out of the split export")]
    pub table_selector: TableSelector,

    #[schemars(description = "Identifier columns removed from the delimited export if present")]
    pub drop_columns: Vec<String>,

    #[schemars(description = "Source column name to canonical column name")]
    pub column_renames: BTreeMap<String, String>,

    #[schemars(
        description = "Status written into every row of a delimited export. The export comes from a single sales channel."
    )]
    pub default_status: String,

    #[schemars(description = "Location written into every row of a delimited export")]
    pub default_location: String,

    #[schemars(description = "Cell values treated as missing, in addition to blank cells")]
    pub na_tokens: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut column_renames = BTreeMap::new();
        column_renames.insert("order_date".to_string(), "date".to_string());
        column_renames.insert("fruit_name".to_string(), "type".to_string());

        Self {
            header_marker: "\"id\"".to_string(),
            table_selector: TableSelector::default(),
            drop_columns: vec!["user_id".to_string(), "id".to_string()],
            column_renames,
            default_status: "online".to_string(),
            default_location: "Tuban".to_string(),
            na_tokens: ["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.header_marker.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "header_marker must not be empty".to_string(),
            ));
        }
        if self.default_status.trim().is_empty() {
            return Err(DashboardError::InvalidConfig(
                "default_status must not be empty".to_string(),
            ));
        }
        if self.default_location.trim().is_empty() {
            return Err(DashboardError::InvalidConfig(
                "default_location must not be empty".to_string(),
            ));
        }
        if let TableSelector::Signature { columns, .. } = &self.table_selector {
            if columns.is_empty() {
                return Err(DashboardError::InvalidConfig(
                    "signature selector needs at least one column".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_missing(&self, cell: &str) -> bool {
        let cell = cell.trim();
        cell.is_empty() || self.na_tokens.iter().any(|token| token == cell)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(
            SourceFormat::from_file_name("sales.csv").unwrap(),
            SourceFormat::Delimited
        );
        assert_eq!(
            SourceFormat::from_file_name("Sales.XLSX").unwrap(),
            SourceFormat::Spreadsheet
        );
        assert_eq!(
            SourceFormat::from_file_name("old.xls").unwrap(),
            SourceFormat::Spreadsheet
        );

        let err = SourceFormat::from_file_name("notes.txt").unwrap_err();
        assert!(matches!(err, DashboardError::UnsupportedFormat(name) if name == "notes.txt"));
        assert!(SourceFormat::from_file_name("no_extension").is_err());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = PipelineConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("header_marker"));
        assert!(schema_json.contains("table_selector"));
        assert!(schema_json.contains("default_location"));
    }

    #[test]
    fn test_config_from_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{"default_location": "Lamongan", "table_selector": {"strategy": "signature", "columns": ["order_date"], "fallback_index": 5}}"#,
        )
        .unwrap();

        assert_eq!(config.default_location, "Lamongan");
        assert_eq!(config.default_status, "online");
        assert_eq!(config.header_marker, "\"id\"");
        assert!(matches!(
            config.table_selector,
            TableSelector::Signature { fallback_index: 5, .. }
        ));
    }

    #[test]
    fn test_config_validation_rejects_blank_constants() {
        let result = PipelineConfig::from_json(r#"{"default_status": "  "}"#);
        assert!(matches!(result, Err(DashboardError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_cells() {
        let config = PipelineConfig::default();
        assert!(config.is_missing(""));
        assert!(config.is_missing("   "));
        assert!(config.is_missing("NaN"));
        assert!(config.is_missing("N/A"));
        assert!(!config.is_missing("0"));
        assert!(!config.is_missing("Mango"));
    }

    #[test]
    fn test_date_bounds() {
        let record = |day: u32| TransactionRecord {
            row_number: day as usize,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            item_type: "Mango".to_string(),
            quantity: 1,
            total_price: 10_000,
            status: "online".to_string(),
            location: "Tuban".to_string(),
            day_of_week: String::new(),
            month: "2024-03".to_string(),
        };

        let table = CanonicalTable::new(vec![record(9), record(2), record(17)]);
        assert_eq!(
            table.date_bounds(),
            Some((
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 17).unwrap()
            ))
        );
        assert_eq!(CanonicalTable::default().date_bounds(), None);
        assert_eq!(table.head(2).len(), 2);
        assert_eq!(table.head(10).len(), 3);
    }
}
