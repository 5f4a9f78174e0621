//! CSV document → raw rows.

use common::{Error, RawRow, Restaurant};
use tracing::warn;

/// Decode a CSV document with a header line into column → cell maps.
///
/// The document must be UTF-8 and its header must name every column in
/// [`Restaurant::COLUMNS`]; anything else (an HTML error page, a renamed
/// column) fails the whole document. Rows with too few cells are kept (the
/// missing cells surface later as row parse errors); rows the reader
/// cannot split at all are skipped with a warning.
pub fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRow>, Error> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Csv(format!("document is not UTF-8: {}", e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::Csv(format!("unreadable header: {}", e)))?
        .clone();

    let missing: Vec<&str> = Restaurant::COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Csv(format!("missing columns: {}", missing.join(", "))));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let row: RawRow = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                rows.push(row);
            }
            Err(e) => warn!("Skipping undecodable CSV record {}: {}", idx, e),
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,latitude,longitude,availability_radius,open_hour,close_hour,rating";

    fn document(rows: &[&str]) -> Vec<u8> {
        let mut doc = String::from(HEADER);
        for row in rows {
            doc.push('\n');
            doc.push_str(row);
        }
        doc.push('\n');
        doc.into_bytes()
    }

    #[test]
    fn test_decode_header_and_rows() {
        let doc = document(&[
            "1,10.0,10.0,5.0,09:00:00,23:00:00,4.0",
            "2,12.0,12.5,3.0,10:00:00,14:00:00, 3.5 ",
        ]);
        let rows = decode_csv(&doc).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "1");
        assert_eq!(rows[1]["rating"], "3.5", "cells should be trimmed");
    }

    #[test]
    fn test_short_row_keeps_present_columns() {
        let rows = decode_csv(&document(&["7,1.0"])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("latitude").map(String::as_str), Some("1.0"));
        assert!(rows[0].get("longitude").is_none());
    }

    #[test]
    fn test_header_only_document_has_no_rows() {
        assert!(decode_csv(&document(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_extra_columns_and_order_are_accepted() {
        let doc = b"rating,close_hour,open_hour,availability_radius,longitude,latitude,id,name\n\
                    4.0,14:00,10:00,3.0,12.5,12.0,2,Pizzeria\n";
        let rows = decode_csv(doc).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "2");
        assert_eq!(rows[0]["name"], "Pizzeria");
    }

    #[test]
    fn test_html_page_fails_whole_document() {
        let err = decode_csv(b"<html><body>Service Unavailable</body></html>\n").unwrap_err();
        match err {
            Error::Csv(msg) => {
                assert!(msg.contains("missing columns"), "unexpected message: {}", msg);
                assert!(msg.contains("availability_radius"));
            }
            other => panic!("expected a CSV error, got {:?}", other),
        }
    }

    #[test]
    fn test_renamed_column_fails_whole_document() {
        let doc = b"id,lat,longitude,availability_radius,open_hour,close_hour,rating\n\
                    1,10.0,10.0,5.0,09:00:00,23:00:00,4.0\n";
        let err = decode_csv(doc).unwrap_err();
        assert!(err.to_string().contains("latitude"), "should name the missing column: {}", err);
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(matches!(decode_csv(b""), Err(Error::Csv(_))));
    }

    #[test]
    fn test_invalid_utf8_fails_whole_document() {
        let err = decode_csv(&[0x69, 0x64, 0x0a, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }
}
