//! CSV record splitting and header detection

use csv::ReaderBuilder;
use tracing::debug;

use super::{ColumnLayout, HeaderDetection, IngestError};

/// Records of one table file plus the index of the first data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub records: Vec<Vec<String>>,
    pub data_start: usize,
}

impl ParsedTable {
    pub fn has_header(&self) -> bool {
        self.data_start > 0
    }

    /// Records after the header, in file order
    pub fn data_records(&self) -> &[Vec<String>] {
        &self.records[self.data_start.min(self.records.len())..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// Just saw a `"` inside a quoted field
    QuoteInQuoted,
    /// `\r` right after a closing quote
    ClosedCr,
}

/// Reject quoting the `csv` reader would otherwise accept leniently
///
/// A `"` may only open a field or be doubled inside a quoted field, and a
/// closing quote must be followed by a delimiter or a line end.
fn check_quotes(table: &[u8]) -> Result<(), IngestError> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1usize;
    let mut opened_on = line;
    let malformed = |line: usize, what: &str| {
        IngestError::Format(format!("malformed CSV on line {}: {}", line, what))
    };

    for &byte in table {
        state = match (state, byte) {
            (QuoteState::FieldStart, b'"') => {
                opened_on = line;
                QuoteState::Quoted
            },
            (QuoteState::FieldStart | QuoteState::Unquoted, b',' | b'\n') => QuoteState::FieldStart,
            (QuoteState::FieldStart | QuoteState::Unquoted, _) => QuoteState::Unquoted,
            (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted | QuoteState::ClosedCr, b',' | b'\n') => {
                QuoteState::FieldStart
            },
            (QuoteState::QuoteInQuoted, b'\r') => QuoteState::ClosedCr,
            (QuoteState::QuoteInQuoted | QuoteState::ClosedCr, _) => {
                return Err(malformed(line, "unexpected text after closing quote"));
            },
        };
        if state == QuoteState::Unquoted && byte == b'"' {
            return Err(malformed(line, "bare quote in unquoted field"));
        }
        if byte == b'\n' {
            line += 1;
        }
    }

    if state == QuoteState::Quoted {
        return Err(malformed(opened_on, "quoted field is never closed"));
    }
    Ok(())
}

/// Split `table` into records and decide whether record 0 is a header
///
/// Records may have differing widths; the validator skips short ones.
/// Malformed quoting fails the whole table.
pub fn parse(
    table: &[u8],
    layout: ColumnLayout,
    detection: HeaderDetection,
) -> Result<ParsedTable, IngestError> {
    check_quotes(table)?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(table);

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| IngestError::Format(format!("malformed CSV at record {}: {}", index, e)))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let first = records.first().ok_or(IngestError::EmptyInput)?;
    let data_start = usize::from(detection.is_header(first, layout));

    debug!(
        records = records.len(),
        header = data_start == 1,
        ?layout,
        ?detection,
        "Parsed table file"
    );

    Ok(ParsedTable { records, data_start })
}
