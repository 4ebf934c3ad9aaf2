use crate::error::{DashboardError, Result};
use crate::schema::{CanonicalTable, TransactionRecord};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(DashboardError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The user's selection per dimension. An empty set means "all values".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub months: BTreeSet<String>,
    pub days: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
    pub date_range: Option<DateRange>,
}

fn to_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl FilterSpec {
    /// No restriction on any dimension.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_months<I: IntoIterator<Item = S>, S: Into<String>>(mut self, months: I) -> Self {
        self.months = to_set(months);
        self
    }

    pub fn with_days<I: IntoIterator<Item = S>, S: Into<String>>(mut self, days: I) -> Self {
        self.days = to_set(days);
        self
    }

    pub fn with_types<I: IntoIterator<Item = S>, S: Into<String>>(mut self, types: I) -> Self {
        self.types = to_set(types);
        self
    }

    pub fn with_locations<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        locations: I,
    ) -> Self {
        self.locations = to_set(locations);
        self
    }

    pub fn with_statuses<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        statuses: I,
    ) -> Self {
        self.statuses = to_set(statuses);
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.months.is_empty()
            && self.days.is_empty()
            && self.types.is_empty()
            && self.locations.is_empty()
            && self.statuses.is_empty()
            && self.date_range.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.date_range {
            Some(range) => range.validate(),
            None => Ok(()),
        }
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        selected(&self.months, &record.month)
            && selected(&self.days, &record.day_of_week)
            && selected(&self.types, &record.item_type)
            && selected(&self.locations, &record.location)
            && selected(&self.statuses, &record.status)
            && self
                .date_range
                .map_or(true, |range| range.contains(record.date))
    }
}

fn selected(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

/// Returns the records matching every dimension of `spec`, in their original
/// order. The source table is left untouched.
pub fn apply_filter(table: &CanonicalTable, spec: &FilterSpec) -> Result<CanonicalTable> {
    spec.validate()?;

    let records: Vec<TransactionRecord> = table
        .iter()
        .filter(|record| spec.matches(record))
        .cloned()
        .collect();

    debug!(
        "Filter kept {} of {} transaction(s)",
        records.len(),
        table.len()
    );

    Ok(CanonicalTable::new(records))
}

/// Choices offered for each filter dimension: sorted distinct values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub months: Vec<String>,
    pub days: Vec<String>,
    pub types: Vec<String>,
    pub locations: Vec<String>,
    pub statuses: Vec<String>,
    pub date_bounds: Option<DateRange>,
}

impl FilterOptions {
    pub fn from_table(table: &CanonicalTable) -> Self {
        let distinct = |field: fn(&TransactionRecord) -> &str| -> Vec<String> {
            table
                .iter()
                .map(field)
                .collect::<BTreeSet<&str>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        Self {
            months: distinct(|r| r.month.as_str()),
            days: distinct(|r| r.day_of_week.as_str()),
            types: distinct(|r| r.item_type.as_str()),
            locations: distinct(|r| r.location.as_str()),
            statuses: distinct(|r| r.status.as_str()),
            date_bounds: table
                .date_bounds()
                .map(|(start, end)| DateRange { start, end }),
        }
    }
}
