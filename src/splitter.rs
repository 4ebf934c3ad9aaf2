//! Splits a concatenated multi-table CSV export into its logical sub-tables.
//!
//! Exports from the point-of-sale database dump several tables (audit headers,
//! line items, summaries) into one stream. The only reliable boundary is the
//! recurrence of the primary-key header line, so every line that starts with
//! the header marker opens a new sub-table, except the very first line.

use crate::error::Result;
use crate::schema::RawTable;
use csv::ReaderBuilder;
use log::debug;

pub struct TableSplitter {
    header_marker: String,
}

impl TableSplitter {
    pub fn new(header_marker: impl Into<String>) -> Self {
        Self {
            header_marker: header_marker.into(),
        }
    }

    pub fn split(&self, content: &str) -> Result<Vec<RawTable>> {
        let mut tables = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in content.lines() {
            if line.starts_with(&self.header_marker) && !current.is_empty() {
                tables.push(parse_sub_table(&current)?);
                current = vec![line];
            } else {
                current.push(line);
            }
        }

        if !current.is_empty() {
            tables.push(parse_sub_table(&current)?);
        }

        debug!(
            "Split export into {} sub-table(s) on marker {}",
            tables.len(),
            self.header_marker
        );

        Ok(tables)
    }
}

/// Parses one accumulated block: the first record is the header, the rest are
/// data rows padded or truncated to the header width.
fn parse_sub_table(lines: &[&str]) -> Result<RawTable> {
    let text = lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter() -> TableSplitter {
        TableSplitter::new("\"id\"")
    }

    #[test]
    fn test_single_table_without_boundary() {
        let content = "\"id\",\"name\"\n1,Apple\n2,Mango\n";
        let tables = splitter().split(content).unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, vec!["id", "name"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].get(1, "name"), Some("Mango"));
    }

    #[test]
    fn test_first_line_never_splits() {
        let content = "\"id\",\"a\"\n1,x\n\"id\",\"b\"\n2,y\n";
        let tables = splitter().split(content).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].headers, vec!["id", "a"]);
        assert_eq!(tables[1].headers, vec!["id", "b"]);
    }

    #[test]
    fn test_k_markers_give_k_plus_one_tables() {
        let mut content = String::from("\"report\",\"generated\"\nsales,2024-03-01\n");
        let mut expected_rows = vec![vec!["sales".to_string(), "2024-03-01".to_string()]];
        for k in 0..4 {
            content.push_str("\"id\",\"value\"\n");
            content.push_str(&format!("{},v{}\n", k, k));
            content.push_str(&format!("{},w{}\n", k + 10, k));
            expected_rows.push(vec![k.to_string(), format!("v{}", k)]);
            expected_rows.push(vec![(k + 10).to_string(), format!("w{}", k)]);
        }

        let tables = splitter().split(&content).unwrap();
        assert_eq!(tables.len(), 5);

        let all_rows: Vec<Vec<String>> = tables.into_iter().flat_map(|t| t.rows).collect();
        assert_eq!(all_rows, expected_rows);
    }

    #[test]
    fn test_marker_must_start_the_line() {
        let content = "\"id\",\"note\"\n1,\"mentions \"\"id\"\" inline\"\n";
        let tables = splitter().split(content).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0][1], "mentions \"id\" inline");
    }

    #[test]
    fn test_ragged_rows_are_padded_and_truncated() {
        let content = "\"id\",\"a\",\"b\"\n1,x\n2,y,z,extra\n";
        let tables = splitter().split(content).unwrap();

        assert_eq!(tables[0].rows[0], vec!["1", "x", ""]);
        assert_eq!(tables[0].rows[1], vec!["2", "y", "z"]);
    }

    #[test]
    fn test_empty_content_has_no_tables() {
        assert!(splitter().split("").unwrap().is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let content = "\"id\",\"a\"\r\n1,x\r\n\"id\",\"b\"\r\n2,y\r\n";
        let tables = splitter().split(content).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].rows[0], vec!["2", "y"]);
    }
}
