use crate::{app::AppState, models::{ErrorResponse, UploadResponse}};
use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Multipart fields accepted as the document
const FILE_FIELDS: [&str; 2] = ["pdf", "file"];

/// Store an uploaded document and return the URL it is served under.
///
/// The relay never sees file contents; the uploader announces the returned
/// URL to its room with a `documentUploaded` event.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), (StatusCode, Json<ErrorResponse>)> {

    // 1. Find the file part
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read multipart body: {}", e);
                return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, e.body_text()));
            }
        };
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }
        let original = field.file_name().unwrap_or("document").to_string();
        match field.bytes().await {
            Ok(bytes) => {
                upload = Some((original, bytes));
                break;
            }
            Err(e) => {
                warn!("Failed to read uploaded file: {}", e);
                return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, e.body_text()));
            }
        }
    }

    let Some((original, bytes)) = upload else {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "No file uploaded!"));
    };

    // 2. Write it under a collision-free name
    let stored = stored_file_name(&original);
    let dir = Path::new(&state.config.upload_dir);
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!("Failed to create upload dir {}: {}", dir.display(), e);
        return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file"));
    }
    if let Err(e) = tokio::fs::write(dir.join(&stored), &bytes).await {
        error!("Failed to write upload {}: {}", stored, e);
        return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file"));
    }

    // 3. Build the public URL
    let base = match &state.config.public_base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
                .unwrap_or_else(|| state.config.server_address());
            format!("http://{}", host)
        }
    };
    let url = format!("{}/uploads/{}", base, stored);

    info!("Stored upload '{}' ({} bytes) as {}", original, bytes.len(), stored);
    Ok((StatusCode::OK, Json(UploadResponse { url })))
}

/// `<millis>-<uuid>-<name>` with the client name reduced to safe characters
fn stored_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let mut safe: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if safe.trim_matches('.').is_empty() {
        safe = "document".to_string();
    }
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        safe
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_strips_paths_and_odd_characters() {
        let name = stored_file_name("../../etc/my report (1).pdf");
        assert!(name.ends_with("-my_report__1_.pdf"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn stored_names_do_not_collide() {
        assert_ne!(stored_file_name("a.pdf"), stored_file_name("a.pdf"));
    }

    #[test]
    fn empty_name_falls_back() {
        assert!(stored_file_name("..").ends_with("-document"));
    }
}
