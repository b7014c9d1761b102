//! Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Per-file failure in a bulk upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadError {
    /// Offending filename; `None` when the part carried no name
    pub file: Option<String>,
    /// Human readable reason
    pub error: String,
}

/// Body of `POST /upload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Files that made it into the vector index
    pub processed_files: Vec<String>,
    /// Files that did not
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UploadError>,
}

impl UploadResponse {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Body of `POST /ask`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

/// Successful answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Error body shared by all routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
