use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Unsupported file format: {0}. Expected a .csv, .xlsx or .xls upload")]
    UnsupportedFormat(String),

    #[error("Upload is not valid UTF-8 text: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("Expected table not found: needed table #{expected}, export contains {found} table(s)")]
    TableNotFound { expected: usize, found: usize },

    #[error("Missing required columns in the file: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid date range: start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Please enter both username and password")]
    EmptyCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No sales data has been uploaded yet")]
    NoData,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DashboardError {
    /// True for errors caused by the shape of the uploaded file itself.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            DashboardError::TableNotFound { .. } | DashboardError::MissingColumns(_)
        )
    }

    /// True for errors raised before the upload content is parsed.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DashboardError::UnsupportedFormat(_)
                | DashboardError::InvalidEncoding(_)
                | DashboardError::EmptyWorkbook
                | DashboardError::Csv(_)
                | DashboardError::Spreadsheet(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
