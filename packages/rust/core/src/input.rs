//! Input table reader.
//!
//! Streams rows of a delimited file in file order and pulls out the
//! `Company` and `Type` columns by header name. Values are kept exactly as
//! written; bytes that are not valid UTF-8 are replaced rather than failing
//! the row, so the only read error left is an I/O error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use compenrich_shared::{CompenrichError, InputRow, Result};
use tracing::{debug, warn};

/// Header of the company name column.
pub const COMPANY_COLUMN: &str = "Company";

/// Header of the industry zone column.
pub const ZONE_COLUMN: &str = "Type";

/// One record of the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    /// A row with a non-empty company name.
    Row(InputRow),
    /// A row whose company field is empty or absent; it produces no output.
    Skipped { row_number: usize },
}

/// Streaming reader over the input table.
pub struct InputReader<R: Read> {
    reader: csv::Reader<R>,
    record: csv::ByteRecord,
    company_idx: Option<usize>,
    zone_idx: Option<usize>,
    source: String,
    row_number: usize,
}

impl InputReader<File> {
    /// Open a delimited file with a header row.
    pub fn open(path: &Path, delimiter: char) -> Result<Self> {
        let file = File::open(path).map_err(|e| CompenrichError::io(path, e))?;
        Self::from_reader(file, delimiter, path.display().to_string())
    }
}

impl<R: Read> InputReader<R> {
    /// Wrap any reader. `source` names the input in errors and logs.
    pub fn from_reader(rdr: R, delimiter: char, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let delimiter = delimiter_byte(delimiter)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| CompenrichError::input(format!("{source}: failed to read header: {e}")))?
            .iter()
            .map(|header| String::from_utf8_lossy(header).into_owned())
            .collect();

        let company_idx = column_index(&headers, COMPANY_COLUMN);
        let zone_idx = column_index(&headers, ZONE_COLUMN);

        if company_idx.is_none() {
            warn!(
                %source,
                column = COMPANY_COLUMN,
                "input has no company column, every row will be skipped"
            );
        }
        debug!(%source, ?company_idx, ?zone_idx, "opened input table");

        Ok(Self {
            reader,
            record: csv::ByteRecord::new(),
            company_idx,
            zone_idx,
            source,
            row_number: 0,
        })
    }

    /// Field value as written. Only a zero-length field counts as missing.
    fn field(&self, idx: Option<usize>) -> Option<String> {
        let bytes = idx.and_then(|i| self.record.get(i))?;
        if bytes.is_empty() {
            return None;
        }
        let value = String::from_utf8_lossy(bytes);
        if matches!(value, std::borrow::Cow::Owned(_)) {
            warn!(
                source = %self.source,
                row_number = self.row_number,
                "field is not valid UTF-8, invalid bytes replaced"
            );
        }
        Some(value.into_owned())
    }
}

impl<R: Read> Iterator for InputReader<R> {
    type Item = Result<ParsedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                self.row_number += 1;
                let row_number = self.row_number;
                let parsed = match self.field(self.company_idx) {
                    Some(company_name) => ParsedRow::Row(InputRow {
                        row_number,
                        company_name,
                        zone: self.field(self.zone_idx),
                    }),
                    None => ParsedRow::Skipped { row_number },
                };
                Some(Ok(parsed))
            }
            Err(e) => Some(Err(CompenrichError::input(format!(
                "{}: row {}: {e}",
                self.source,
                self.row_number + 1
            )))),
        }
    }
}

/// Locate a column by exact header name, ignoring a leading BOM and padding.
fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}').trim() == name)
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(CompenrichError::config(format!(
            "delimiter must be a single ASCII character, got {delimiter:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(csv: &str) -> Vec<ParsedRow> {
        InputReader::from_reader(csv.as_bytes(), ',', "test.csv")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn row(row_number: usize, company: &str, zone: Option<&str>) -> ParsedRow {
        ParsedRow::Row(InputRow {
            row_number,
            company_name: company.into(),
            zone: zone.map(String::from),
        })
    }

    #[test]
    fn reads_company_and_zone_in_order() {
        let parsed = rows("Company,Type,Booth\nAcme Chem,Solvents,A1\nBeta Labs,Pharma,B2\n");
        assert_eq!(
            parsed,
            vec![
                row(1, "Acme Chem", Some("Solvents")),
                row(2, "Beta Labs", Some("Pharma")),
            ]
        );
    }

    #[test]
    fn empty_company_is_skipped() {
        let parsed = rows("Company,Type\n,Solvents\nGamma Inc,\n");
        assert_eq!(
            parsed,
            vec![ParsedRow::Skipped { row_number: 1 }, row(2, "Gamma Inc", None)]
        );
    }

    #[test]
    fn values_are_kept_as_written() {
        let parsed = rows("Company,Type\n  Acme Chem ,Solvents \n   ,Pharma\n");
        assert_eq!(
            parsed,
            vec![
                row(1, "  Acme Chem ", Some("Solvents ")),
                row(2, "   ", Some("Pharma")),
            ]
        );
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let csv: &[u8] = b"Company,Type\nAc\xffme Chem,Solvents\nBeta Labs,Pharma\n";
        let parsed = InputReader::from_reader(csv, ',', "test.csv")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            parsed,
            vec![
                row(1, "Ac\u{fffd}me Chem", Some("Solvents")),
                row(2, "Beta Labs", Some("Pharma")),
            ]
        );
    }

    #[test]
    fn columns_found_by_name_not_position() {
        let parsed = rows("Type,Company\nSolvents,Acme Chem\n");
        assert_eq!(parsed, vec![row(1, "Acme Chem", Some("Solvents"))]);
    }

    #[test]
    fn short_rows_and_missing_type_column() {
        let parsed = rows("Company\nAcme Chem\n");
        assert_eq!(parsed, vec![row(1, "Acme Chem", None)]);

        let parsed = rows("Booth,Company,Type\nA1\nB2,Beta Labs\n");
        assert_eq!(
            parsed,
            vec![ParsedRow::Skipped { row_number: 1 }, row(2, "Beta Labs", None)]
        );
    }

    #[test]
    fn missing_company_column_skips_everything() {
        let parsed = rows("Name,Type\nAcme Chem,Solvents\n");
        assert_eq!(parsed, vec![ParsedRow::Skipped { row_number: 1 }]);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let parsed = rows("\u{feff}Company,Type\nAcme Chem,Solvents\n");
        assert_eq!(parsed, vec![row(1, "Acme Chem", Some("Solvents"))]);
    }

    #[test]
    fn quoted_fields_and_custom_delimiter() {
        let csv = "Company;Type\n\"Acme; Chem\";\"Solvents, Resins\"\n";
        let parsed = InputReader::from_reader(csv.as_bytes(), ';', "test.csv")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(parsed, vec![row(1, "Acme; Chem", Some("Solvents, Resins"))]);
    }

    #[test]
    fn non_ascii_delimiter_rejected() {
        let result = InputReader::from_reader("".as_bytes(), '§', "test.csv");
        assert!(matches!(result, Err(CompenrichError::Config { .. })));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("ce-missing-{}.csv", uuid::Uuid::now_v7()));
        let result = InputReader::open(&path, ',');
        assert!(matches!(result, Err(CompenrichError::Io { .. })));
    }
}
