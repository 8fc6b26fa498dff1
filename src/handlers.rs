use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::storage;

static INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared handler state: the configuration resolved at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// One stored file, reported back to the client with its final on-disk name.
#[derive(Debug, Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no files")]
    NoFiles,

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NoFiles => (StatusCode::BAD_REQUEST, "no files".to_string()),
            Self::Multipart(err) => (err.status(), err.body_text()),
            Self::Storage(err) => {
                tracing::error!("upload failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };
        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

/// `GET /` — the static upload page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /healthz` — liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

/// `POST /upload` — stores every part of the repeatable `files` field and
/// reports the final names and sizes in submission order.
///
/// Fails fast on the first storage error; files already written stay on disk.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError> {
    let upload_dir = &state.config.upload_dir;
    storage::ensure_upload_dir(upload_dir).await?;

    let mut saved = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_owned();
        let data: Bytes = field.bytes().await?;

        let name = storage::sanitize_filename(&original)
            .unwrap_or_else(|| format!("upload_{}", Utc::now().timestamp()));
        let (path, mut file) = storage::create_unique(upload_dir, &name).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(name);
        tracing::info!(filename = %filename, size = data.len(), "stored upload");
        saved.push(StoredFile {
            filename,
            size: data.len() as u64,
        });
    }

    if saved.is_empty() {
        return Err(UploadError::NoFiles);
    }
    Ok(Json(UploadResponse { ok: true, files: saved }))
}
