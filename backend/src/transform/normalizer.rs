//! Roster normalizer: raw per-test result text → student × test table.
//!
//! Each non-blank result line holds a student name and the student's answer
//! string for one test:
//!
//! ```text
//! ASMITH JOHN     1101101   5
//! ABROWN ANNE     0111111   6
//! ```
//!
//! The identifier is every ASCII letter of the line joined together, minus
//! any leading `A` marker (`SMITHJOHN`). The score token is the
//! second-to-last whitespace-separated field (`1101101`).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{NormalizeError, NormalizeResult};
use crate::models::{IntermediateTable, LoKey, StudentId, StudentRow, TestSubmission};

static NON_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-zA-Z]+").expect("static regex is valid"));

/// What a single result line contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLine<'a> {
    /// No letters on the line; ignored.
    Blank,
    Entry { student: StudentId, score: &'a str },
    /// The line has letters but fewer than two fields.
    TooFewFields(usize),
}

/// Letters of the line with leading `A` markers removed, or `None` if it has no letters.
pub fn extract_identifier(line: &str) -> Option<StudentId> {
    let letters = NON_LETTERS.replace_all(line, "");
    if letters.is_empty() {
        return None;
    }
    Some(StudentId::new(letters.trim_start_matches('A')))
}

pub fn parse_line(line: &str) -> ResultLine<'_> {
    let Some(student) = extract_identifier(line) else {
        return ResultLine::Blank;
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.len().checked_sub(2).map(|i| fields[i]) {
        Some(score) => ResultLine::Entry { student, score },
        None => ResultLine::TooFewFields(fields.len()),
    }
}

/// Merge all tests into one table, students sorted by identifier.
///
/// A student seen again in the same test overwrites that test's slot.
pub fn normalize(tests: &[TestSubmission]) -> NormalizeResult<IntermediateTable> {
    let width = tests.len();
    let mut keys = Vec::with_capacity(width);
    let mut students: BTreeMap<StudentId, Vec<String>> = BTreeMap::new();

    for (index, test) in tests.iter().enumerate() {
        let position = index + 1;
        let name = test.display_name();

        let key = LoKey::parse(test.lo_coding_key()).map_err(|source| {
            NormalizeError::InvalidLoKey {
                test: position,
                name: name.to_string(),
                source,
            }
        })?;

        if test.raw_text().trim().is_empty() {
            return Err(NormalizeError::EmptyRawText {
                test: position,
                name: name.to_string(),
            });
        }

        for (line_index, line) in test.raw_text().lines().enumerate() {
            match parse_line(line) {
                ResultLine::Blank => continue,
                ResultLine::TooFewFields(found) => {
                    return Err(NormalizeError::MalformedLine {
                        test: position,
                        name: name.to_string(),
                        line: line_index + 1,
                        found,
                        content: line.trim().to_string(),
                    });
                }
                ResultLine::Entry { student, score } => {
                    let slots = students
                        .entry(student)
                        .or_insert_with(|| vec![String::new(); width]);
                    slots[index] = score.to_string();
                }
            }
        }

        keys.push(key);
    }

    let rows = students
        .into_iter()
        .map(|(id, scores)| StudentRow::new(id, scores))
        .collect();

    Ok(IntermediateTable::new(keys, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test(raw: &str, key: &str) -> TestSubmission {
        TestSubmission::new("t", raw, key)
    }

    #[test]
    fn test_identifier_strips_marker_and_digits() {
        assert_eq!(extract_identifier("ASMITH J 1101 3"), Some(StudentId::new("SMITHJ")));
        assert_eq!(extract_identifier("AAKERS 11 2"), Some(StudentId::new("KERS")));
        assert_eq!(extract_identifier("Brown, Anne 10 1"), Some(StudentId::new("BrownAnne")));
        assert_eq!(extract_identifier("  12 34 \t"), None);
    }

    #[test]
    fn test_marker_only_line_yields_empty_identifier() {
        assert_eq!(extract_identifier("A001 1 11"), Some(StudentId::new("")));
    }

    #[test]
    fn test_score_is_second_to_last_field() {
        match parse_line("ASMITH JOHN   1101101   5\r") {
            ResultLine::Entry { student, score } => {
                assert_eq!(student.as_str(), "SMITHJOHN");
                assert_eq!(score, "1101101");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_field_line() {
        assert_eq!(parse_line("ASMITH"), ResultLine::TooFewFields(1));
        assert_eq!(parse_line(""), ResultLine::Blank);
    }

    #[test]
    fn test_rows_sorted_and_key_rows_first() {
        let table = normalize(&[test("AZED 11 0\nAAMY 01 1\n\nABOB 10 1\n", "12")]).unwrap();
        let grid = table.to_grid();
        assert_eq!(grid[0], vec!["12"]);
        let ids: Vec<&str> = table.students.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["BOB", "MY", "ZED"]);
    }

    #[test]
    fn test_width_invariant_and_absent_tests() {
        let tests = [test("ASMITH 11 2\n", "11"), test("AJONES 101 2\n", "123")];
        let table = normalize(&tests).unwrap();
        for row in &table.students {
            assert_eq!(row.to_cells().len(), tests.len() + 1);
        }
        let grid = table.to_grid();
        assert_eq!(grid[2], vec!["JONES", "", "101"]);
        assert_eq!(grid[3], vec!["SMITH", "11", ""]);
    }

    #[test]
    fn test_repeated_student_overwrites_slot() {
        let table = normalize(&[test("ASMITH 10 1\nASMITH 11 2\n", "12")]).unwrap();
        assert_eq!(table.students.len(), 1);
        assert_eq!(table.students[0].scores, vec!["11"]);
    }

    #[test]
    fn test_student_across_tests_shares_row() {
        let table = normalize(&[test("ASMITH 10 1", "12"), test("ASMITH 011 2", "111")]).unwrap();
        assert_eq!(table.students.len(), 1);
        assert_eq!(table.students[0].scores, vec!["10", "011"]);
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let err = normalize(&[test("ASMITH 11 2", "11"), test("AJONES 11 2\nABROWN\n", "11")])
            .unwrap_err();
        match err {
            NormalizeError::MalformedLine { test, line, found, .. } => {
                assert_eq!(test, 2);
                assert_eq!(line, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_raw_text_rejected() {
        let err = normalize(&[test("\n\n", "11")]).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyRawText { test: 1, .. }));
    }

    #[test]
    fn test_non_digit_key_rejected() {
        let err = normalize(&[test("ASMITH 11 2", "1b")]).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidLoKey { test: 1, .. }));
    }

    #[test]
    fn test_empty_key_allowed() {
        let table = normalize(&[test("ASMITH 11 2", "")]).unwrap();
        assert_eq!(table.to_grid()[0], vec![""]);
    }
}
