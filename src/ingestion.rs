use crate::error::{DashboardError, Result};
use crate::schema::RawTable;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use log::debug;
use std::io::Cursor;

/// Decodes a delimited upload, dropping a leading byte-order mark.
pub fn read_delimited_text(bytes: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Reads the first worksheet of an `.xlsx`/`.xls` workbook held in memory.
/// The first row becomes the header; fully blank rows are skipped.
pub fn read_workbook(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_names = workbook.sheet_names();
    debug!("Workbook contains sheet(s): {:?}", sheet_names);

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DashboardError::EmptyWorkbook)??;

    let mut rows = range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<String>>());

    let headers = match rows.next() {
        Some(headers) => headers,
        None => return Ok(RawTable::default()),
    };
    let width = headers.len();

    let rows = rows
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect();

    Ok(RawTable::new(headers, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => match v.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => v.to_string(),
        },
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimited_text_strips_bom() {
        let bytes = "\u{feff}\"id\",\"a\"\n1,x\n".as_bytes();
        let text = read_delimited_text(bytes).unwrap();
        assert!(text.starts_with("\"id\""));
    }

    #[test]
    fn test_delimited_text_rejects_invalid_utf8() {
        let err = read_delimited_text(&[0x22, 0xff, 0xfe, 0x22]).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidEncoding(_)));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_garbage_workbook_is_a_spreadsheet_error() {
        let err = read_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, DashboardError::Spreadsheet(_)));
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::String("Mango".into())), "Mango");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
