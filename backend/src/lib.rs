//! # LO Mastery - exam results to learning objective mastery
//!
//! Two independent pipelines connected by a spreadsheet the instructor edits
//! and re-uploads in between:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Raw results  │────▶│  Normalizer  │────▶│ Intermediate │────▶│  Aggregator  │──▶ % per LO
//! │ + LO keys    │     │ (per student)│     │ spreadsheet  │     │ (per LO)     │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lomastery::{normalize, aggregate, TestSubmission};
//!
//! let table = normalize(&[TestSubmission::new("Unit 1", "ASMITH 1101 3\n", "1122")])?;
//! let report = aggregate(&table)?;
//! println!("{:?}", report.to_grid());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (TestSubmission, LoKey, IntermediateTable, FinalReport)
//! - [`transform`] - Normalizer, LO key decoding, aggregator and pipeline
//! - [`sheet`] - Spreadsheet grid I/O (XLSX, CSV, temporary uploads)
//! - [`validation`] - Request body schema validation
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Transformation
pub mod transform;

// Spreadsheet I/O
pub mod sheet;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregateError,
    KeyError,
    NormalizeError,
    PipelineError,
    ServerError,
    SheetError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    FinalReport,
    Grid,
    IntermediateTable,
    LoId,
    LoKey,
    Percentage,
    ReportRow,
    StudentId,
    StudentRow,
    TestSubmission,
};

// =============================================================================
// Re-exports - Core transforms
// =============================================================================

pub use transform::{
    aggregate,
    aggregate_grid,
    detect_num_tests,
    normalize,
    parse_intermediate,
    LearningObjectiveMap,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    aggregate_file,
    aggregate_upload,
    normalize_json,
    parse_submissions,
    AggregateOptions,
};

// =============================================================================
// Re-exports - Spreadsheets
// =============================================================================

pub use sheet::{read_path, write_csv, write_xlsx, SheetFormat, TempUpload};

// Server
pub mod server {
    pub use crate::api::server::{build_router, start_server, ServerConfig};
}
