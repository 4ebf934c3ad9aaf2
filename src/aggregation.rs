use crate::schema::{CanonicalTable, TransactionRecord};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_sales: u64,
    pub total_quantity: u64,
    pub total_transactions: usize,
}

impl SummaryMetrics {
    pub fn from_table(table: &CanonicalTable) -> Self {
        table.iter().fold(Self::default(), |mut acc, record| {
            acc.total_sales = acc.total_sales.saturating_add(record.total_price);
            acc.total_quantity = acc.total_quantity.saturating_add(record.quantity);
            acc.total_transactions += 1;
            acc
        })
    }

    pub fn is_empty(&self) -> bool {
        self.total_transactions == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Type,
    Location,
    Status,
    Day,
    Date,
    Month,
}

impl Dimension {
    pub fn key(&self, record: &TransactionRecord) -> String {
        match self {
            Dimension::Type => record.item_type.clone(),
            Dimension::Location => record.location.clone(),
            Dimension::Status => record.status.clone(),
            Dimension::Day => record.day_of_week.clone(),
            Dimension::Date => record.date.format("%Y-%m-%d").to_string(),
            Dimension::Month => record.month.clone(),
        }
    }

    /// Calendar anchor of the group, for time-series dimensions only.
    fn period(&self, record: &TransactionRecord) -> Option<NaiveDate> {
        match self {
            Dimension::Date => Some(record.date),
            Dimension::Month => record.date.with_day(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    Quantity,
    Revenue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollup {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<NaiveDate>,
    pub quantity: u64,
    pub total_price: u64,
    pub transactions: usize,
}

impl Rollup {
    fn metric(&self, rank_by: RankBy) -> u64 {
        match rank_by {
            RankBy::Quantity => self.quantity,
            RankBy::Revenue => self.total_price,
        }
    }
}

/// Groups the table by `dimension`, in order of first appearance.
pub fn rollup(table: &CanonicalTable, dimension: Dimension) -> Vec<Rollup> {
    let mut groups: Vec<Rollup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in table {
        let key = dimension.key(record);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(Rollup {
                    key: key.clone(),
                    period: dimension.period(record),
                    quantity: 0,
                    total_price: 0,
                    transactions: 0,
                });
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        group.quantity = group.quantity.saturating_add(record.quantity);
        group.total_price = group.total_price.saturating_add(record.total_price);
        group.transactions += 1;
    }

    groups
}

/// Highest first. Ties keep their first-appearance order.
pub fn leaderboard(
    table: &CanonicalTable,
    dimension: Dimension,
    rank_by: RankBy,
    limit: Option<usize>,
) -> Vec<Rollup> {
    let mut groups = rollup(table, dimension);
    groups.sort_by(|a, b| b.metric(rank_by).cmp(&a.metric(rank_by)));
    if let Some(limit) = limit {
        groups.truncate(limit);
    }
    groups
}

pub fn top_types_by_quantity(table: &CanonicalTable, limit: Option<usize>) -> Vec<Rollup> {
    leaderboard(table, Dimension::Type, RankBy::Quantity, limit)
}

pub fn top_types_by_revenue(table: &CanonicalTable, limit: Option<usize>) -> Vec<Rollup> {
    leaderboard(table, Dimension::Type, RankBy::Revenue, limit)
}

pub fn sales_by_type(table: &CanonicalTable) -> Vec<Rollup> {
    top_types_by_revenue(table, None)
}

/// Sorted by location name.
pub fn sales_by_location(table: &CanonicalTable) -> Vec<Rollup> {
    let mut groups = rollup(table, Dimension::Location);
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

pub fn daily_sales(table: &CanonicalTable) -> Vec<Rollup> {
    time_series(table, Dimension::Date)
}

pub fn monthly_sales(table: &CanonicalTable) -> Vec<Rollup> {
    time_series(table, Dimension::Month)
}

fn time_series(table: &CanonicalTable, dimension: Dimension) -> Vec<Rollup> {
    let mut groups = rollup(table, dimension);
    groups.sort_by_key(|g| g.period);
    groups
}

/// The type with the most units sold, `None` when there is nothing to rank.
pub fn best_selling_type(table: &CanonicalTable) -> Option<Rollup> {
    top_types_by_quantity(table, Some(1)).into_iter().next()
}
