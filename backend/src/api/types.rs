//! REST API types.
//!
//! Successful responses are bare positional tables (`[["11"], ["SMITH", "10"]]`)
//! so existing spreadsheet front-ends keep working; only errors carry field names.

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::logs::Operation;
use crate::error::{ServerError, ServerResult};

/// Rows of string cells, as returned by both operations.
pub type TableResponse = Vec<Vec<String>>;

/// Multipart field holding the spreadsheet.
pub const FILE_FIELD: &str = "file";

/// Optional multipart field overriding LO key row detection.
pub const NUM_TESTS_FIELD: &str = "numTests";

/// Query string of `/api/logs`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LogFilter {
    /// Only stream entries of this operation
    pub operation: Option<Operation>,
}

/// Spreadsheet upload sent to the Aggregate operation
#[derive(Debug, Clone, Default)]
pub struct SheetUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub num_tests: Option<usize>,
}

impl SheetUpload {
    pub async fn from_multipart(mut multipart: Multipart) -> ServerResult<Self> {
        let mut upload = SheetUpload::default();
        let mut has_file = false;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                FILE_FIELD => {
                    upload.file_name = field.file_name().map(str::to_string);
                    upload.bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec();
                    has_file = true;
                }
                NUM_TESTS_FIELD => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                    upload.num_tests = parse_num_tests(&text)?;
                }
                _ => {}
            }
        }

        if !has_file {
            return Err(ServerError::BadRequest("No file provided".to_string()));
        }
        Ok(upload)
    }
}

/// Blank means "detect"; anything else must be a non-negative integer.
pub fn parse_num_tests(raw: &str) -> ServerResult<Option<usize>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| ServerError::BadRequest(format!("{} must be a whole number, got '{}'", NUM_TESTS_FIELD, raw)))
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AggregateError, PipelineError, SheetError};

    #[test]
    fn test_parse_num_tests() {
        assert_eq!(parse_num_tests("").unwrap(), None);
        assert_eq!(parse_num_tests(" 3 ").unwrap(), Some(3));
        assert!(parse_num_tests("three").is_err());
        assert!(parse_num_tests("-1").is_err());
    }

    #[test]
    fn test_status_codes() {
        let bad = ServerError::from(PipelineError::from(AggregateError::EmptySheet));
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let internal = ServerError::from(PipelineError::from(SheetError::from(io)));
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_log_filter_query() {
        let filter: LogFilter = serde_json::from_value(json!({ "operation": "aggregate" })).unwrap();
        assert_eq!(filter.operation, Some(Operation::Aggregate));

        let all: LogFilter = serde_json::from_value(json!({})).unwrap();
        assert_eq!(all.operation, None);
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Spreadsheet is empty");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Spreadsheet is empty");
        assert!(body["requestId"].is_string());
    }
}
