//! Learning objective aggregator: intermediate table → mastery report.
//!
//! For every student, each `'1'` in a test's score token is credited to the
//! learning objective named by the same position of that test's LO key.
//! The percentage for LO `d` is the credited count over the number of
//! questions coded `d` across all keys.

use std::collections::BTreeMap;

use super::keys::{detect_num_tests, LearningObjectiveMap};
use crate::error::{AggregateError, AggregateResult};
use crate::models::{
    FinalReport, IntermediateTable, LoId, LoKey, Percentage, ReportRow, StudentId, StudentRow,
};

/// Marker for a correctly answered question in a score token.
const CORRECT: char = '1';

/// Rebuild the tagged table from a spreadsheet grid.
///
/// `num_tests` overrides the digit-leading key row detection. Rows with no
/// content at all are skipped.
pub fn parse_intermediate(
    grid: &[Vec<String>],
    num_tests: Option<usize>,
) -> AggregateResult<IntermediateTable> {
    if grid.is_empty() {
        return Err(AggregateError::EmptySheet);
    }

    let num_tests = num_tests.unwrap_or_else(|| detect_num_tests(grid));
    if num_tests > grid.len() {
        return Err(AggregateError::NotEnoughRows {
            expected: num_tests,
            found: grid.len(),
        });
    }

    let (key_rows, student_rows) = grid.split_at(num_tests);

    let keys = key_rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let raw = row.first().map(String::as_str).unwrap_or("");
            LoKey::parse(raw).map_err(|source| AggregateError::InvalidLoKey {
                test: index + 1,
                source,
            })
        })
        .collect::<AggregateResult<Vec<_>>>()?;

    let students = student_rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            let id = StudentId::new(row.first().map(|c| c.trim()).unwrap_or(""));
            let scores = row.iter().skip(1).map(|c| c.trim().to_string()).collect();
            StudentRow::new(id, scores)
        })
        .collect();

    Ok(IntermediateTable::new(keys, students))
}

/// Correct answers per learning objective for one student.
fn credit_student(row: &StudentRow, keys: &[LoKey]) -> AggregateResult<BTreeMap<LoId, usize>> {
    let mut credited = BTreeMap::new();

    for (index, token) in row.scores.iter().enumerate() {
        if token.is_empty() {
            continue;
        }

        let key = keys.get(index).ok_or_else(|| AggregateError::UnkeyedColumn {
            student: row.id.to_string(),
            column: index + 1,
        })?;

        let answers = token.chars().count();
        if answers != key.len() {
            return Err(AggregateError::MisalignedScore {
                student: row.id.to_string(),
                test: index + 1,
                token: token.clone(),
                expected: key.len(),
                found: answers,
            });
        }

        for (answer, lo) in token.chars().zip(key.ids()) {
            if answer == CORRECT {
                *credited.entry(*lo).or_insert(0) += 1;
            }
        }
    }

    Ok(credited)
}

/// Compute every student's percentage for each reported learning objective.
pub fn aggregate(table: &IntermediateTable) -> AggregateResult<FinalReport> {
    let lo_map = LearningObjectiveMap::from_keys(&table.keys);

    let rows = table
        .students
        .iter()
        .map(|student| {
            let credited = credit_student(student, &table.keys)?;
            let percentages = lo_map
                .reported()
                .map(|lo| {
                    let correct = credited.get(&lo).copied().unwrap_or(0);
                    Percentage::of(correct, lo_map.questions_for(lo))
                })
                .collect();

            Ok(ReportRow {
                student: student.id.to_string(),
                percentages,
            })
        })
        .collect::<AggregateResult<Vec<_>>>()?;

    Ok(FinalReport {
        num_learning_objectives: lo_map.num_learning_objectives(),
        rows,
    })
}

/// [`parse_intermediate`] then [`aggregate`].
pub fn aggregate_grid(grid: &[Vec<String>], num_tests: Option<usize>) -> AggregateResult<FinalReport> {
    let table = parse_intermediate(grid, num_tests)?;
    aggregate(&table)
}
