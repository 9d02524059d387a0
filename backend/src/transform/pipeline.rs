//! Byte-level entry points combining parsing, the core transforms and logging.
//!
//! ```text
//! Normalize:  JSON body ──▶ schema check ──▶ TestSubmission[] ──▶ normalizer ──▶ IntermediateTable
//! Aggregate:  upload ──▶ temp file / CSV decode ──▶ grid ──▶ aggregator ──▶ FinalReport
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lomastery::transform::pipeline::{normalize_json, aggregate_file};
//!
//! let table = normalize_json(br#"[{"name":"Unit 1","datFile":"ASMITH 1101 3","loFile":"1122"}]"#)?;
//! let report = aggregate_file(Path::new("intermediate.xlsx"), None)?;
//! ```

use serde_json::Value;
use std::path::{Path, PathBuf};

use super::aggregator::{aggregate, parse_intermediate};
use super::keys::LearningObjectiveMap;
use super::normalizer::normalize;
use crate::api::logs::{Operation, OperationLog};
use crate::error::{NormalizeError, NormalizeResult, PipelineResult};
use crate::models::{FinalReport, Grid, IntermediateTable, TestSubmission};
use crate::sheet::{self, SheetFormat};
use crate::validation::validate_test_submissions;

/// Directory for temporary upload files, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "uploaded";

/// Options for the Aggregate operation
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Number of LO key rows. `None` detects them from digit-leading rows.
    pub num_tests: Option<usize>,

    /// Where uploaded workbooks are staged while being read.
    pub upload_dir: PathBuf,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            num_tests: None,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

/// Parse and validate a Normalize request body.
pub fn parse_submissions(body: &[u8]) -> NormalizeResult<Vec<TestSubmission>> {
    let value: Value = serde_json::from_slice(body)?;
    validate_test_submissions(&value).map_err(NormalizeError::Schema)?;
    Ok(serde_json::from_value(value)?)
}

/// Normalize operation: JSON test submissions → intermediate table.
pub fn normalize_json(body: &[u8]) -> PipelineResult<IntermediateTable> {
    let log = OperationLog::new(Operation::Normalize);
    let tests = parse_submissions(body)?;

    log.info(format!("📥 Normalizing {} tests...", tests.len()));
    for (index, test) in tests.iter().enumerate() {
        log.detail(format!(
            "[{}] {} ({} questions)",
            index + 1,
            test.display_name(),
            test.lo_coding_key().trim().len()
        ));
    }

    let table = normalize(&tests)?;

    if table.students.iter().any(|row| row.id.as_str().is_empty()) {
        log.warning("A result line had no letters besides the 'A' marker; it is listed with an empty identifier");
    }
    log.success(format!(
        "{} students across {} tests",
        table.students.len(),
        table.num_tests()
    ));

    Ok(table)
}

/// Aggregate a spreadsheet grid, logging what was detected.
pub fn aggregate_sheet(grid: &[Vec<String>], num_tests: Option<usize>) -> PipelineResult<FinalReport> {
    let log = OperationLog::new(Operation::Aggregate);
    let table = parse_intermediate(grid, num_tests)?;
    match num_tests {
        Some(n) => log.info(format!("Using {} LO key rows as requested", n)),
        None => log.info(format!("Detected {} LO key rows", table.num_tests())),
    }

    let lo_map = LearningObjectiveMap::from_keys(&table.keys);
    for lo in lo_map.reported() {
        let questions = lo_map.questions_for(lo);
        if questions == 0 {
            log.warning(format!("Learning Objective {} has no questions; reported as NaN", lo));
        } else {
            log.detail(format!("Learning Objective {}: {} questions", lo, questions));
        }
    }

    let report = aggregate(&table)?;
    log.success(format!(
        "{} students, {} learning objectives",
        report.rows.len(),
        report.num_learning_objectives
    ));

    Ok(report)
}

/// Aggregate operation: uploaded spreadsheet bytes → final report.
///
/// Workbooks are staged in a temporary file under `options.upload_dir`
/// that is removed before returning, whatever the outcome.
pub fn aggregate_upload(
    bytes: &[u8],
    file_name: Option<&str>,
    options: &AggregateOptions,
) -> PipelineResult<FinalReport> {
    let format = SheetFormat::from_file_name(file_name);
    OperationLog::new(Operation::Aggregate).info(format!(
        "📊 Reading {} ({} bytes, {})",
        file_name.unwrap_or("upload"),
        bytes.len(),
        format.extension()
    ));

    let grid = read_upload(bytes, format, &options.upload_dir)?;
    aggregate_sheet(&grid, options.num_tests)
}

fn read_upload(bytes: &[u8], format: SheetFormat, upload_dir: &Path) -> PipelineResult<Grid> {
    let grid = match format {
        SheetFormat::Csv => sheet::read_csv_bytes(bytes)?,
        _ => sheet::read_workbook_bytes(bytes, format, upload_dir)?,
    };
    Ok(grid)
}

/// Aggregate a spreadsheet already on disk.
pub fn aggregate_file(path: &Path, num_tests: Option<usize>) -> PipelineResult<FinalReport> {
    OperationLog::new(Operation::Aggregate).info(format!("📊 Reading {}", path.display()));
    let grid = sheet::read_path(path)?;
    aggregate_sheet(&grid, num_tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AggregateError, PipelineError};
    use crate::sheet::{write_xlsx, DEFAULT_SHEET_NAME};
    use serde_json::json;
    use tempfile::tempdir;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_normalize_json() {
        let table = normalize_json(&body(json!([
            { "name": "Unit 1", "datFile": "ASMITH 1101 3\nABROWN 0111 3\n", "loFile": "1122\n" },
            { "name": "Unit 2", "datFile": "ASMITH 10 1\n", "loFile": "33" }
        ])))
        .unwrap();

        assert_eq!(
            table.to_grid(),
            vec![
                vec!["1122"],
                vec!["33"],
                vec!["BROWN", "0111", ""],
                vec!["SMITH", "1101", "10"],
            ]
        );
    }

    #[test]
    fn test_invalid_json() {
        let err = normalize_json(b"[{").unwrap_err();
        assert!(matches!(err, PipelineError::Normalize(NormalizeError::InvalidJson(_))));
    }

    #[test]
    fn test_schema_violation() {
        let err = normalize_json(&body(json!([{ "name": "Unit 1" }]))).unwrap_err();
        assert!(matches!(err, PipelineError::Normalize(NormalizeError::Schema(_))));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_wrong_typed_key_alias_is_schema_error() {
        let err = normalize_json(&body(json!([{ "DatFile": "ASMITH 11 2", "LoFile": 11 }]))).unwrap_err();
        assert!(matches!(err, PipelineError::Normalize(NormalizeError::Schema(_))));
    }

    #[test]
    fn test_round_trip_perfect_student() {
        let table = normalize_json(&body(json!([
            { "name": "Unit 1", "datFile": "ASMITH 1111 4\nAJONES 1010 2\n", "loFile": "1123" },
            { "name": "Unit 2", "datFile": "ASMITH 111 3\n", "loFile": "335" }
        ])))
        .unwrap();

        let bytes = write_xlsx(&table.to_grid(), DEFAULT_SHEET_NAME).unwrap();
        let dir = tempdir().unwrap();
        let options = AggregateOptions {
            num_tests: None,
            upload_dir: dir.path().join("uploaded"),
        };

        let report = aggregate_upload(&bytes, Some("intermediate.xlsx"), &options)
            .unwrap()
            .to_grid();

        assert_eq!(report[0].len(), 6);
        assert_eq!(report[1][0], "JONES");
        assert_eq!(report[2], vec!["SMITH", "100.00", "100.00", "100.00", "NaN", "100.00"]);
        assert_eq!(std::fs::read_dir(&options.upload_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_xlsx_upload_with_empty_first_key() {
        let grid: Grid = vec![
            vec![String::new()],
            vec!["12".to_string()],
            vec!["SMITH".to_string(), String::new(), "10".to_string()],
        ];
        let bytes = write_xlsx(&grid, DEFAULT_SHEET_NAME).unwrap();
        let dir = tempdir().unwrap();
        let options = AggregateOptions {
            num_tests: Some(2),
            upload_dir: dir.path().to_path_buf(),
        };

        let report = aggregate_upload(&bytes, Some("intermediate.xlsx"), &options)
            .unwrap()
            .to_grid();
        assert_eq!(report[1], vec!["SMITH", "100.00", "0.00"]);
    }

    #[test]
    fn test_csv_upload_with_explicit_num_tests() {
        let csv = b"11\n\"\"\n7JONES,10,\n";
        let options = AggregateOptions {
            num_tests: Some(2),
            ..AggregateOptions::default()
        };
        let report = aggregate_upload(csv, Some("sheet.csv"), &options).unwrap();
        assert_eq!(report.rows[0].student, "7JONES");
        assert_eq!(report.rows[0].percentages[0].to_string(), "50.00");
    }

    #[test]
    fn test_misaligned_upload_reported() {
        let csv = b"111\nSMITH,10\n";
        let err = aggregate_upload(csv, Some("sheet.csv"), &AggregateOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Aggregate(AggregateError::MisalignedScore { .. })
        ));
    }

    #[test]
    fn test_aggregate_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("intermediate.csv");
        std::fs::write(&path, "12\nSMITH,11\n").unwrap();
        let report = aggregate_file(&path, None).unwrap();
        assert_eq!(report.num_learning_objectives, 2);
        assert_eq!(report.rows[0].percentages.len(), 2);
    }
}
