use crate::schema::{CanonicalTable, NormalizedRow, NormalizedTable, TransactionRecord};
use crate::utils::{month_key, parse_date_flexible, weekday_name};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Audit trail of the soft data-quality fixes applied during coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoercionReport {
    pub input_rows: usize,
    pub output_rows: usize,
    /// `No` labels of the rows removed because their date could not be read.
    pub dropped_rows: Vec<usize>,
    pub defaulted_quantities: usize,
    pub defaulted_prices: usize,
}

impl CoercionReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped_rows.len()
    }

    pub fn is_clean(&self) -> bool {
        self.dropped_rows.is_empty() && self.defaulted_quantities == 0 && self.defaulted_prices == 0
    }
}

/// Strips every non-digit and reads what is left. "Rp 30.000" is 30000.
pub fn coerce_price(value: &str) -> Option<u64> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Reads a non-negative quantity. Decimals such as the "3.0" a spreadsheet
/// produces are truncated toward zero.
pub fn coerce_quantity(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(quantity) = value.parse::<u64>() {
        return Some(quantity);
    }

    let float = value.parse::<f64>().ok()?;
    if float.is_finite() && float >= 0.0 && float <= u64::MAX as f64 {
        Some(float.trunc() as u64)
    } else {
        None
    }
}

pub fn coerce_row(row: &NormalizedRow) -> Option<(TransactionRecord, bool, bool)> {
    let date = parse_date_flexible(&row.date)?;
    let quantity = coerce_quantity(&row.quantity);
    let total_price = coerce_price(&row.total_price);

    let record = TransactionRecord {
        row_number: row.number,
        date,
        item_type: row.item_type.clone(),
        quantity: quantity.unwrap_or(0),
        total_price: total_price.unwrap_or(0),
        status: row.status.clone(),
        location: row.location.clone(),
        day_of_week: weekday_name(date),
        month: month_key(date),
    };

    Some((record, quantity.is_none(), total_price.is_none()))
}

/// Turns the validated table into the canonical one. Rows with an unreadable
/// date are the only rows removed.
pub fn coerce_table(table: &NormalizedTable) -> (CanonicalTable, CoercionReport) {
    let mut report = CoercionReport {
        input_rows: table.len(),
        ..CoercionReport::default()
    };
    let mut records = Vec::with_capacity(table.len());

    for row in &table.rows {
        match coerce_row(row) {
            Some((record, quantity_defaulted, price_defaulted)) => {
                if quantity_defaulted {
                    debug!(
                        "Row {}: quantity '{}' defaulted to 0",
                        row.number, row.quantity
                    );
                    report.defaulted_quantities += 1;
                }
                if price_defaulted {
                    debug!(
                        "Row {}: total_price '{}' defaulted to 0",
                        row.number, row.total_price
                    );
                    report.defaulted_prices += 1;
                }
                records.push(record);
            }
            None => {
                warn!("Row {}: unreadable date '{}', row dropped", row.number, row.date);
                report.dropped_rows.push(row.number);
            }
        }
    }

    report.output_rows = records.len();
    info!(
        "Coerced {} row(s) into {} transaction(s) ({} dropped)",
        report.input_rows,
        report.output_rows,
        report.dropped_count()
    );

    (CanonicalTable::new(records), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(number: usize, date: &str, quantity: &str, total_price: &str) -> NormalizedRow {
        NormalizedRow {
            number,
            date: date.to_string(),
            item_type: "Mango".to_string(),
            quantity: quantity.to_string(),
            total_price: total_price.to_string(),
            status: "online".to_string(),
            location: "Tuban".to_string(),
        }
    }

    #[test]
    fn test_price_strips_non_digits() {
        assert_eq!(coerce_price("Rp 30.000"), Some(30_000));
        assert_eq!(coerce_price("15,500"), Some(15_500));
        assert_eq!(coerce_price("12000.0"), Some(120_000));
        assert_eq!(coerce_price("-250"), Some(250));
        assert_eq!(coerce_price("free"), None);
        assert_eq!(coerce_price(""), None);
        assert_eq!(coerce_price("99999999999999999999999"), None);
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(coerce_quantity(" 4 "), Some(4));
        assert_eq!(coerce_quantity("3.0"), Some(3));
        assert_eq!(coerce_quantity("2.5"), Some(2));
        assert_eq!(coerce_quantity("0.9"), Some(0));
        assert_eq!(coerce_quantity("-1"), None);
        assert_eq!(coerce_quantity("two"), None);
        assert_eq!(coerce_quantity("NaN"), None);
    }

    #[test]
    fn test_coerce_table_derives_calendar_fields() {
        let table = NormalizedTable {
            rows: vec![row(1, "2024-03-04", "2", "Rp 30.000")],
        };

        let (canonical, report) = coerce_table(&table);
        let record = &canonical.records()[0];

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(record.day_of_week, "Monday");
        assert_eq!(record.month, "2024-03");
        assert_eq!(record.quantity, 2);
        assert_eq!(record.total_price, 30_000);
        assert_eq!(record.row_number, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_only_bad_dates_shrink_the_table() {
        let table = NormalizedTable {
            rows: vec![
                row(1, "2024-03-04", "x", "y"),
                row(2, "someday", "1", "1000"),
                row(3, "2024-03-05", "1", "1000"),
                row(5, "2024-13-01", "1", "1000"),
            ],
        };

        let (canonical, report) = coerce_table(&table);

        assert_eq!(canonical.len(), 2);
        assert_eq!(report.input_rows, 4);
        assert_eq!(report.output_rows, 2);
        assert_eq!(report.dropped_rows, vec![2, 5]);
        assert_eq!(report.defaulted_quantities, 1);
        assert_eq!(report.defaulted_prices, 1);

        let first = &canonical.records()[0];
        assert_eq!(first.quantity, 0);
        assert_eq!(first.total_price, 0);
    }
}
