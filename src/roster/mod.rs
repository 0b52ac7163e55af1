//! Roster parsing - turns an uploaded `Name, Lodge, Role` CSV into validated
//! attendee records.
//!
//! Parsing is fail-fast: the first bad row rejects the whole roster so that no
//! attendee is ever silently dropped from a certificate run. Blank rows
//! (spreadsheet exports often end with one) are skipped.

pub mod role;
pub mod sample;

pub use role::Role;

use csv::StringRecord;
use log::debug;
use serde::Serialize;
use std::fmt;

use crate::generation::GenerationError;

/// Columns every roster must carry, in this order.
pub const ROSTER_HEADER: [RosterField; 3] = [RosterField::Name, RosterField::Lodge, RosterField::Role];

/// A roster column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RosterField {
    Name,
    Lodge,
    Role,
}

impl RosterField {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Lodge => "Lodge",
            Self::Role => "Role",
        }
    }
}

impl fmt::Display for RosterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// What was wrong with a single roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssue {
    MissingField(RosterField),
    UnrecognizedRole(String),
    UnexpectedFields(usize),
    Malformed(String),
}

impl RowIssue {
    /// The column the issue points at, if any.
    pub fn field(&self) -> Option<RosterField> {
        match self {
            Self::MissingField(field) => Some(*field),
            Self::UnrecognizedRole(_) => Some(RosterField::Role),
            Self::UnexpectedFields(_) | Self::Malformed(_) => None,
        }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing value for '{}'", field),
            Self::UnrecognizedRole(value) => write!(
                f,
                "unrecognized role '{}' (expected 'Participant' or 'Staff')",
                value
            ),
            Self::UnexpectedFields(count) => {
                write!(f, "{} value(s) beyond the 'Role' column", count)
            }
            Self::Malformed(reason) => write!(f, "malformed row: {}", reason),
        }
    }
}

/// One validated roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendeeRecord {
    /// 1-based line of the source file (the header is row 1).
    pub row: usize,
    pub name: String,
    pub lodge: String,
    pub role: Role,
}

/// Decode an uploaded roster and parse it.
///
/// A leading UTF-8 byte order mark is ignored.
pub fn parse_roster_bytes(bytes: &[u8]) -> Result<Vec<AttendeeRecord>, GenerationError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| GenerationError::Schema(format!("roster is not valid UTF-8 text: {}", e)))?;
    parse_roster(text)
}

/// Parse roster CSV text into records, preserving file order.
pub fn parse_roster(text: &str) -> Result<Vec<AttendeeRecord>, GenerationError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(text.as_bytes());

    let mut header_seen = false;
    let mut records = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            let row = e.position().map(|p| p.line() as usize).unwrap_or(index + 1);
            if header_seen {
                GenerationError::RowValidation {
                    row,
                    issue: RowIssue::Malformed(e.to_string()),
                }
            } else {
                GenerationError::Schema(format!("unreadable header row: {}", e))
            }
        })?;

        if is_blank(&record) {
            continue;
        }

        if !header_seen {
            check_header(&record)?;
            header_seen = true;
            continue;
        }

        let row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        records.push(parse_row(&record, row)?);
    }

    if !header_seen {
        return Err(GenerationError::Schema(format!(
            "missing header row; expected '{}'",
            expected_header()
        )));
    }

    if records.is_empty() {
        return Err(GenerationError::EmptyRoster);
    }

    debug!("Parsed roster with {} attendee(s)", records.len());
    Ok(records)
}

fn expected_header() -> String {
    ROSTER_HEADER
        .iter()
        .map(RosterField::header)
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|value| value.trim().is_empty())
}

/// Trailing empty cells are tolerated; everything else must match exactly.
fn check_header(record: &StringRecord) -> Result<(), GenerationError> {
    let mut columns: Vec<&str> = record.iter().map(str::trim).collect();
    while columns.last().is_some_and(|c| c.is_empty()) {
        columns.pop();
    }

    let matches = columns.len() == ROSTER_HEADER.len()
        && columns
            .iter()
            .zip(ROSTER_HEADER.iter())
            .all(|(found, expected)| found.eq_ignore_ascii_case(expected.header()));

    if matches {
        Ok(())
    } else {
        Err(GenerationError::Schema(format!(
            "expected header '{}', found '{}'",
            expected_header(),
            columns.join(", ")
        )))
    }
}

fn parse_row(record: &StringRecord, row: usize) -> Result<AttendeeRecord, GenerationError> {
    let row_error = |issue| GenerationError::RowValidation { row, issue };

    let extra = record
        .iter()
        .skip(ROSTER_HEADER.len())
        .filter(|value| !value.trim().is_empty())
        .count();
    if extra > 0 {
        return Err(row_error(RowIssue::UnexpectedFields(extra)));
    }

    let cell = |field: RosterField, index: usize| {
        record
            .get(index)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| row_error(RowIssue::MissingField(field)))
    };

    let name = cell(RosterField::Name, 0)?;
    let lodge = cell(RosterField::Lodge, 1)?;
    let raw_role = cell(RosterField::Role, 2)?;

    let role = Role::classify(raw_role).ok_or_else(|| {
        row_error(RowIssue::UnrecognizedRole(
            record.get(2).unwrap_or_default().to_string(),
        ))
    })?;

    Ok(AttendeeRecord {
        row,
        name: name.to_string(),
        lodge: lodge.to_string(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_file_order() {
        let csv = "Name,Lodge,Role\n\
                   Christopher Grove,Tipisa Lodge,Participant\n\
                   Cortland Bolles,Wewikit Lodge,Staff\n\
                   Brea Baygents,Wewikit Lodge,Participant\n";

        let records = parse_roster(csv).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Christopher Grove", "Cortland Bolles", "Brea Baygents"]
        );
        assert_eq!(records[1].role, Role::Staff);
        assert_eq!(records[0].row, 2);
        assert_eq!(records[2].row, 4);
    }

    #[test]
    fn test_values_trimmed_only_at_edges() {
        let csv = "Name,Lodge,Role\n  Mary  Ann  Smith , Tipisa   Lodge ,participant\n";
        let records = parse_roster(csv).unwrap();
        assert_eq!(records[0].name, "Mary  Ann  Smith");
        assert_eq!(records[0].lodge, "Tipisa   Lodge");
    }

    #[test]
    fn test_header_tolerates_whitespace_and_bom() {
        let csv = "\u{feff} Name , Lodge ,Role \nA,B,Staff\n";
        assert_eq!(parse_roster(csv).unwrap().len(), 1);
    }

    #[test]
    fn test_quoted_values_with_commas() {
        let csv = "Name,Lodge,Role\n\"Grove, Christopher\",\"Tipisa Lodge, #3\",Staff\n";
        let records = parse_roster(csv).unwrap();
        assert_eq!(records[0].name, "Grove, Christopher");
        assert_eq!(records[0].lodge, "Tipisa Lodge, #3");
    }

    #[test]
    fn test_wrong_header_is_schema_error() {
        let err = parse_roster("Name,Lodge\nA,B\n").unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)));

        let err = parse_roster("Lodge,Name,Role\nA,B,Staff\n").unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)));
    }

    #[test]
    fn test_missing_header_is_schema_error() {
        let err = parse_roster("").unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)));
    }

    #[test]
    fn test_header_only_is_empty_roster() {
        let err = parse_roster("Name,Lodge,Role\n\n").unwrap_err();
        assert!(matches!(err, GenerationError::EmptyRoster));
    }

    #[test]
    fn test_short_row_reports_missing_field() {
        let err = parse_roster("Name,Lodge,Role\nA,B,Staff\nC,D\n").unwrap_err();
        match err {
            GenerationError::RowValidation { row, issue } => {
                assert_eq!(row, 3);
                assert_eq!(issue, RowIssue::MissingField(RosterField::Role));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extra_values_rejected() {
        let err = parse_roster("Name,Lodge,Role\nA,B,Staff,oops\n").unwrap_err();
        assert!(matches!(
            err,
            GenerationError::RowValidation {
                row: 2,
                issue: RowIssue::UnexpectedFields(1)
            }
        ));
    }

    #[test]
    fn test_unknown_role_rejects_roster() {
        let err = parse_roster("Name,Lodge,Role\nA,B,Staff\nC,D,Advisor\n").unwrap_err();
        match err {
            GenerationError::RowValidation { row, issue } => {
                assert_eq!(row, 3);
                assert_eq!(issue, RowIssue::UnrecognizedRole("Advisor".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_only_trailing_rows_ignored() {
        let csv = "Name,Lodge,Role\r\nA,B,Staff\r\n   \r\n , , \r\n";
        let records = parse_roster(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "A");
    }

    #[test]
    fn test_trailing_empty_cells_allowed() {
        let records = parse_roster("Name,Lodge,Role,,\nA,B,Staff,,\n").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_schema_error() {
        let err = parse_roster_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)));
    }

    #[test]
    fn test_issue_field_mapping() {
        assert_eq!(
            RowIssue::UnrecognizedRole("x".into()).field(),
            Some(RosterField::Role)
        );
        assert_eq!(
            RowIssue::MissingField(RosterField::Lodge).field(),
            Some(RosterField::Lodge)
        );
        assert_eq!(RowIssue::UnexpectedFields(2).field(), None);
    }
}
