//! Transformation module.
//!
//! - Normalizer: raw per-test result text → intermediate table
//! - Keys: LO-coding key decoding shared by both stages
//! - Aggregator: intermediate table → per-LO mastery report
//! - Pipeline: byte-level entry points with logging

pub mod aggregator;
pub mod keys;
pub mod normalizer;
pub mod pipeline;

pub use aggregator::{aggregate, aggregate_grid, parse_intermediate};
pub use keys::{detect_num_tests, header_row, LearningObjectiveMap};
pub use normalizer::{extract_identifier, normalize, parse_line, ResultLine};
pub use pipeline::*;
