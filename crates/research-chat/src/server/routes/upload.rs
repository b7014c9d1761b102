//! Bulk PDF upload endpoint

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use crate::error::{Error, Result};
use crate::ingestion::Upload;
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field names that carry files
const FILE_FIELDS: [&str; 2] = ["files", "file"];

/// POST /upload - ingest one or more PDFs
///
/// 200 when every file was processed, 207 with itemized `errors` otherwise.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Error during bulk upload: {}", e);
        Error::Internal(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or_default();
        if !FILE_FIELDS.contains(&name) {
            tracing::debug!("Ignoring multipart field '{}'", name);
            continue;
        }

        // Plain form values sent under a file field name
        let Some(filename) = field.file_name().map(str::to_string) else {
            tracing::debug!("Ignoring non-file part in field '{}'", name);
            continue;
        };
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Error during bulk upload: {}", e);
            Error::Internal(format!("Failed to read file: {}", e))
        })?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        uploads.push(Upload::new(Some(filename), data));
    }

    if uploads.is_empty() {
        tracing::error!("No files provided for bulk upload.");
        return Err(Error::validation("No files provided"));
    }

    let report = state.pipeline().ingest_many(uploads).await;
    let status = if report.is_partial() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };

    Ok((status, Json(report)))
}
