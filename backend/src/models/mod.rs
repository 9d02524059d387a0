//! Domain models shared by both pipelines.
//!
//! - [`TestSubmission`] - One test's raw result text and LO-coding key
//! - [`LoId`] - A validated single-digit learning objective id
//! - [`LoKey`] - An LO-coding key: question position → learning objective
//! - [`StudentId`] - A normalized student identifier
//! - [`StudentRow`] - One student's raw score tokens, one slot per test
//! - [`IntermediateTable`] - The spreadsheet hand-off between the pipelines
//! - [`Percentage`] / [`FinalReport`] - Aggregated mastery output

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::KeyError;

/// A positional table of string cells, as exchanged with clients and spreadsheets.
pub type Grid = Vec<Vec<String>>;

// =============================================================================
// Test Submission
// =============================================================================

/// One test as submitted to the Normalize operation.
///
/// Field names follow the client payload (`datFile` is the raw result text,
/// `loFile` the LO-coding key). PascalCase names are accepted as well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSubmission {
    #[serde(default, alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Identifier")]
    pub identifier: String,

    #[serde(alias = "DatFile")]
    pub dat_file: String,

    #[serde(default, alias = "DatFileName")]
    pub dat_file_name: String,

    #[serde(default, alias = "LOFile", alias = "LoFile")]
    pub lo_file: String,

    #[serde(default, alias = "LOFileName", alias = "LoFileName")]
    pub lo_file_name: String,
}

impl TestSubmission {
    pub fn new(name: impl Into<String>, raw_text: impl Into<String>, lo_coding_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dat_file: raw_text.into(),
            lo_file: lo_coding_key.into(),
            ..Self::default()
        }
    }

    /// Multi-line raw result text.
    pub fn raw_text(&self) -> &str {
        &self.dat_file
    }

    /// LO-coding key, one digit per graded question.
    pub fn lo_coding_key(&self) -> &str {
        &self.lo_file
    }

    /// Name used in logs and errors: the test name, else the result file name.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.dat_file_name.is_empty() {
            &self.dat_file_name
        } else {
            &self.identifier
        }
    }
}

// =============================================================================
// Learning Objectives
// =============================================================================

/// Learning objective id, a single decimal digit (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoId(u8);

impl LoId {
    pub fn new(value: u8) -> Option<Self> {
        (value <= 9).then_some(Self(value))
    }

    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(10).map(|d| Self(d as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An LO-coding key. Character `i` names the learning objective of question `i`.
///
/// Surrounding whitespace (a trailing newline from an uploaded key file) is
/// dropped; any other non-digit character is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoKey {
    raw: String,
    ids: Vec<LoId>,
}

impl LoKey {
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let raw = raw.trim();
        let ids = raw
            .chars()
            .enumerate()
            .map(|(position, character)| {
                LoId::from_char(character).ok_or_else(|| KeyError {
                    key: raw.to_string(),
                    character,
                    position,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            ids,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn ids(&self) -> &[LoId] {
        &self.ids
    }

    /// Number of graded questions.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// =============================================================================
// Students
// =============================================================================

/// Normalized student identifier. Ordering is plain byte-wise string order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A student's raw score tokens, indexed by test position. Absent tests are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub id: StudentId,
    pub scores: Vec<String>,
}

impl StudentRow {
    pub fn new(id: StudentId, scores: Vec<String>) -> Self {
        Self { id, scores }
    }

    /// Identifier cell followed by one cell per test.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(self.scores.len() + 1);
        cells.push(self.id.to_string());
        cells.extend(self.scores.iter().cloned());
        cells
    }
}

// =============================================================================
// Intermediate Table
// =============================================================================

/// Hand-off artifact between the Normalizer and the Aggregator.
///
/// Serialized as one single-cell row per LO key, then the student rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateTable {
    pub keys: Vec<LoKey>,
    pub students: Vec<StudentRow>,
}

impl IntermediateTable {
    pub fn new(keys: Vec<LoKey>, students: Vec<StudentRow>) -> Self {
        Self { keys, students }
    }

    pub fn num_tests(&self) -> usize {
        self.keys.len()
    }

    pub fn to_grid(&self) -> Grid {
        self.keys
            .iter()
            .map(|key| vec![key.as_str().to_string()])
            .chain(self.students.iter().map(StudentRow::to_cells))
            .collect()
    }
}

// =============================================================================
// Final Report
// =============================================================================

/// A mastery percentage for one learning objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    Value(f64),
    /// The learning objective has no questions at all.
    NotAssessed,
}

impl Percentage {
    pub fn of(correct: usize, total: usize) -> Self {
        if total == 0 {
            Self::NotAssessed
        } else {
            Self::Value(100.0 * correct as f64 / total as f64)
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{:.2}", v),
            Self::NotAssessed => f.write_str("NaN"),
        }
    }
}

/// Per-student percentages for learning objectives `1..=num_learning_objectives`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub student: String,
    pub percentages: Vec<Percentage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub num_learning_objectives: u8,
    pub rows: Vec<ReportRow>,
}

impl FinalReport {
    /// Header row (`"", "Learning Objective 1", ...`) followed by one row per student.
    pub fn to_grid(&self) -> Grid {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(crate::transform::keys::header_row(self.num_learning_objectives));
        grid.extend(self.rows.iter().map(|row| {
            std::iter::once(row.student.clone())
                .chain(row.percentages.iter().map(Percentage::to_string))
                .collect()
        }));
        grid
    }
}
