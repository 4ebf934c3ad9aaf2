use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Recognizes the calendar date in a free-form cell.
///
/// Tries plain dates first, then datetimes (the time part is discarded) and
/// finally RFC 3339 timestamps. Ambiguous slash dates are read month-first.
pub fn parse_date_flexible(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Full English weekday name, e.g. "Monday".
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Year-month key, e.g. "2024-03".
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
