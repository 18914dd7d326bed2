use crate::chart::{NoteEvent, NoteKind};
use crate::constants::{EXPECTED_CHART_HEADERS, OPTIONAL_FAKE_HEADER};
use crate::error::{ParityError, Result};

use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Reads note events from a CSV file
///
/// # Arguments
/// * `path` - Path to the CSV file
///
/// # Errors
/// Returns error if file cannot be read or CSV format is invalid
pub fn read_chart_csv<P: AsRef<Path>>(path: P) -> Result<Vec<NoteEvent>> {
    let file = std::fs::File::open(path)?;
    read_chart_from_reader(file)
}

/// Read CSV with `Beat,Second,Column,Type,Hold[,Fake]` format.
/// - Blank lines are skipped
/// - `Hold` is only read for Hold/Roll notes (empty means zero length)
/// - Events are returned ordered by time
pub fn read_chart_from_reader<R: Read>(reader: R) -> Result<Vec<NoteEvent>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true) // allow additional columns
        .from_reader(reader);

    let has_fake_column = validate_csv_headers(&mut rdr)?;

    let mut notes = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let rec = result?;
        let row = i + 2; // CSV rows are 1-indexed, +1 for header

        if let Some(note) = parse_record(&rec, row, has_fake_column)? {
            notes.push(note);
        }
    }

    // stable: notes sharing a timestamp keep their file order
    notes.sort_by(|a, b| a.second.total_cmp(&b.second).then(a.beat.total_cmp(&b.beat)));
    Ok(notes)
}

/// Validates CSV headers; returns whether the optional Fake column is present
fn validate_csv_headers<R: Read>(csv_reader: &mut csv::Reader<R>) -> Result<bool> {
    let headers = csv_reader
        .headers()
        .map_err(|e| ParityError::CsvHeader(format!("Failed to read headers: {}", e)))?;

    for (idx, expected) in EXPECTED_CHART_HEADERS.iter().enumerate() {
        let found = headers.get(idx).ok_or_else(|| {
            ParityError::CsvHeader(format!("Missing '{}' column at index {}", expected, idx))
        })?;
        if !found.eq_ignore_ascii_case(expected) {
            return Err(ParityError::CsvHeader(format!(
                "Expected '{}' in column {}, found '{}'",
                expected, idx, found
            )));
        }
    }

    Ok(headers
        .get(EXPECTED_CHART_HEADERS.len())
        .is_some_and(|h| h.eq_ignore_ascii_case(OPTIONAL_FAKE_HEADER)))
}

fn parse_record(rec: &StringRecord, row: usize, has_fake_column: bool) -> Result<Option<NoteEvent>> {
    if rec.iter().all(|f| f.trim().is_empty()) {
        return Ok(None);
    }

    let beat = parse_float(get_column_value(rec, 0, row)?, "beat", row)?;
    let second = parse_float(get_column_value(rec, 1, row)?, "second", row)?;
    let column_str = get_column_value(rec, 2, row)?;
    let column = column_str
        .parse::<usize>()
        .map_err(|source| ParityError::ColumnParse {
            row,
            value: column_str.to_string(),
            source,
        })?;
    let kind_label = get_column_value(rec, 3, row)?;
    let kind = NoteKind::from_str(kind_label).map_err(|_| ParityError::UnknownNoteType {
        row,
        label: kind_label.to_string(),
    })?;

    let mut note = NoteEvent::new(beat, second, column, kind);

    if note.is_hold() {
        let hold_str = get_column_value(rec, 4, row)?;
        let length = if hold_str.is_empty() {
            0.0
        } else {
            parse_float(hold_str, "hold", row)?
        };
        note.hold_length = Some(length);
    }

    if has_fake_column {
        note.fake = rec
            .get(EXPECTED_CHART_HEADERS.len())
            .map(str::trim)
            .is_some_and(|f| matches!(f.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    }

    Ok(Some(note))
}

/// Safely extracts a column value from a CSV record
fn get_column_value(record: &StringRecord, column_index: usize, row_number: usize) -> Result<&str> {
    record
        .get(column_index)
        .map(str::trim)
        .ok_or_else(|| ParityError::CsvRow {
            row: row_number,
            expected: column_index + 1,
            got: record.len(),
        })
}

fn parse_float(value: &str, field: &'static str, row: usize) -> Result<f64> {
    value.parse().map_err(|source| ParityError::NumberParse {
        row,
        field,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_basic_chart() {
        let data = "Beat,Second,Column,Type,Hold\n\
                    0,0.5,0,Tap,\n\
                    1,1.0,3,Hold,2\n\
                    1.5,1.25,1,Mine,\n";
        let notes = read_chart_from_reader(data.as_bytes()).unwrap();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].kind, NoteKind::Tap);
        assert_eq!(notes[1].hold_length, Some(2.0));
        assert_eq!(notes[1].end_beat(), 3.0);
        assert_eq!(notes[2].kind, NoteKind::Mine);
        assert!(notes.iter().all(|n| !n.fake));
    }

    #[test]
    fn test_read_sorts_by_time() {
        let data = "Beat,Second,Column,Type,Hold\n\
                    2,1.0,1,Tap,\n\
                    0,0.0,0,Tap,\n\
                    0,0.0,3,Tap,\n";
        let notes = read_chart_from_reader(data.as_bytes()).unwrap();
        let cols: Vec<usize> = notes.iter().map(|n| n.column).collect();
        assert_eq!(cols, vec![0, 3, 1]);
    }

    #[test]
    fn test_fake_column() {
        let data = "Beat,Second,Column,Type,Hold,Fake\n\
                    0,0,0,Tap,,true\n\
                    1,0.5,1,Tap,,0\n";
        let notes = read_chart_from_reader(data.as_bytes()).unwrap();
        assert!(notes[0].fake);
        assert!(!notes[1].fake);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let data = "Beat,Second,Column,Type,Hold\n,,,,\n0,0,2,tap,\n";
        let notes = read_chart_from_reader(data.as_bytes()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].column, 2);
    }

    #[test]
    fn test_invalid_header() {
        let data = "Time,Second,Column,Type,Hold\n0,0,0,Tap,\n";
        let err = read_chart_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ParityError::CsvHeader(_)));
    }

    #[test]
    fn test_unknown_note_type() {
        let data = "Beat,Second,Column,Type,Hold\n0,0,0,Keysound,\n";
        let err = read_chart_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ParityError::UnknownNoteType { row: 2, .. }));
    }

    #[test]
    fn test_invalid_number() {
        let data = "Beat,Second,Column,Type,Hold\nabc,0,0,Tap,\n";
        let err = read_chart_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ParityError::NumberParse { field: "beat", .. }));
    }

    #[test]
    fn test_read_chart_csv_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Beat,Second,Column,Type,Hold").unwrap();
        writeln!(file, "0,0,0,Tap,").unwrap();
        writeln!(file, "0,0,3,Tap,").unwrap();
        let notes = read_chart_csv(file.path()).unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn test_read_chart_csv_missing_file() {
        assert!(read_chart_csv("nonexistent_chart.csv").is_err());
    }
}
