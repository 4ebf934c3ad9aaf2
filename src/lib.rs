//! # Sales Dashboard
//!
//! Turns a raw sales export into a canonical transaction table and answers the
//! questions a single-shop sales dashboard asks of it.
//!
//! ## Core Concepts
//!
//! - **Delimited exports**: a `.csv` database dump that concatenates several
//!   tables; the sales line items are picked out and cleaned
//! - **Spreadsheets**: an `.xlsx`/`.xls` sheet already carrying the canonical columns
//! - **Canonical table**: `date`, `type`, `quantity`, `total_price`, `status`,
//!   `location` plus the derived `day_of_week` and `month`
//! - **Filters**: one value set per dimension plus a date range; an empty set
//!   means "all"
//! - **Rollups**: per-type, per-location, daily and monthly sums
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_dashboard::*;
//!
//! let pipeline = SalesPipeline::new(PipelineConfig::default())?;
//! let upload = Upload::new("orders.csv", std::fs::read("orders.csv")?);
//! let outcome = pipeline.ingest(&upload)?;
//!
//! let spec = FilterSpec::all().with_months(["2024-03"]);
//! let report = DashboardReport::build(&outcome.table, &spec)?;
//! println!("{}", report.to_json()?);
//! ```

pub mod aggregation;
pub mod auth;
pub mod coercion;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod normalizer;
pub mod schema;
pub mod splitter;
pub mod utils;

pub use aggregation::{
    best_selling_type, daily_sales, leaderboard, monthly_sales, rollup, sales_by_location,
    sales_by_type, top_types_by_quantity, top_types_by_revenue, Dimension, RankBy, Rollup,
    SummaryMetrics,
};
pub use auth::{CredentialStore, InMemoryCredentialStore, SessionContext};
pub use coercion::{coerce_table, CoercionReport};
pub use error::{DashboardError, Result};
pub use filter::{apply_filter, DateRange, FilterOptions, FilterSpec};
pub use normalizer::SchemaNormalizer;
pub use schema::*;
pub use splitter::TableSplitter;

use ingestion::{read_delimited_text, read_workbook};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// How many types the leaderboard charts show.
pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub format: SourceFormat,
    pub table: CanonicalTable,
    pub coercion: CoercionReport,
}

pub struct SalesPipeline {
    config: PipelineConfig,
}

impl SalesPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the upload through detection and normalization, stopping before
    /// any field is coerced.
    pub fn normalize(&self, upload: &Upload) -> Result<NormalizedTable> {
        let format = upload.format()?;
        let normalizer = SchemaNormalizer::new(&self.config);

        match format {
            SourceFormat::Delimited => {
                let content = read_delimited_text(&upload.bytes)?;
                normalizer.normalize_delimited(content)
            }
            SourceFormat::Spreadsheet => {
                let table = read_workbook(&upload.bytes)?;
                normalizer.normalize_spreadsheet(table)
            }
        }
    }

    pub fn ingest(&self, upload: &Upload) -> Result<IngestOutcome> {
        let format = upload.format()?;
        info!(
            "Ingesting {} ({} bytes) as {:?}",
            upload.file_name,
            upload.bytes.len(),
            format
        );

        let normalized = self.normalize(upload)?;
        let (table, coercion) = coerce_table(&normalized);

        debug!(
            "Canonical table ready: {} transaction(s), {} dropped, {} defaulted quantities, {} defaulted prices",
            table.len(),
            coercion.dropped_count(),
            coercion.defaulted_quantities,
            coercion.defaulted_prices
        );

        Ok(IngestOutcome {
            format,
            table,
            coercion,
        })
    }
}

pub fn ingest_upload(upload: &Upload) -> Result<IngestOutcome> {
    SalesPipeline::new(PipelineConfig::default())?.ingest(upload)
}

/// Everything the presentation layer renders for one filter selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub options: FilterOptions,
    pub filtered: CanonicalTable,
    pub metrics: SummaryMetrics,
    /// False when the filters leave no transactions; every rollup is then empty.
    pub has_data: bool,
    pub sales_by_type: Vec<Rollup>,
    pub sales_by_location: Vec<Rollup>,
    pub daily_sales: Vec<Rollup>,
    pub monthly_sales: Vec<Rollup>,
    pub top_by_quantity: Vec<Rollup>,
    pub top_by_revenue: Vec<Rollup>,
    pub best_seller: Option<Rollup>,
}

impl DashboardReport {
    pub fn build(table: &CanonicalTable, spec: &FilterSpec) -> Result<Self> {
        let filtered = apply_filter(table, spec)?;
        let metrics = SummaryMetrics::from_table(&filtered);

        Ok(Self {
            options: FilterOptions::from_table(table),
            metrics,
            has_data: !filtered.is_empty(),
            sales_by_type: sales_by_type(&filtered),
            sales_by_location: sales_by_location(&filtered),
            daily_sales: daily_sales(&filtered),
            monthly_sales: monthly_sales(&filtered),
            top_by_quantity: top_types_by_quantity(&filtered, Some(LEADERBOARD_SIZE)),
            top_by_revenue: top_types_by_revenue(&filtered, Some(LEADERBOARD_SIZE)),
            best_seller: best_selling_type(&filtered),
            filtered,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One user's dashboard: the login state and the table currently loaded.
pub struct Dashboard {
    pipeline: SalesPipeline,
    session: SessionContext,
    table: Option<CanonicalTable>,
    coercion: Option<CoercionReport>,
}

impl Dashboard {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            pipeline: SalesPipeline::new(config)?,
            session: SessionContext::new(),
            table: None,
            coercion: None,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn login<S: CredentialStore + ?Sized>(
        &mut self,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.session.login(store, username, password)
    }

    /// Ends the session and forgets the uploaded data.
    pub fn logout(&mut self) {
        self.session.logout();
        self.table = None;
        self.coercion = None;
    }

    /// Replaces the loaded table. A failed upload keeps the previous one.
    pub fn upload(&mut self, upload: &Upload) -> Result<&CoercionReport> {
        self.session.require_login()?;
        let outcome = self.pipeline.ingest(upload)?;

        self.table = Some(outcome.table);
        Ok(self.coercion.insert(outcome.coercion))
    }

    pub fn table(&self) -> Option<&CanonicalTable> {
        self.table.as_ref()
    }

    pub fn coercion_report(&self) -> Option<&CoercionReport> {
        self.coercion.as_ref()
    }

    pub fn filter_options(&self) -> Result<FilterOptions> {
        Ok(FilterOptions::from_table(self.loaded_table()?))
    }

    pub fn report(&self, spec: &FilterSpec) -> Result<DashboardReport> {
        DashboardReport::build(self.loaded_table()?, spec)
    }

    fn loaded_table(&self) -> Result<&CanonicalTable> {
        self.session.require_login()?;
        self.table.as_ref().ok_or(DashboardError::NoData)
    }
}
