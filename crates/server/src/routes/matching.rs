use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Multipart field carrying the reference photo.
pub const REFERENCE_FIELD: &str = "reference_image";

/// Optional multipart field naming the group to search.
pub const GROUP_FIELD: &str = "group_id";

const ALLOWED_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Match response
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub matching_images: Vec<String>,
}

struct Upload {
    bytes: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

#[derive(Default)]
struct MatchForm {
    reference: Option<Upload>,
    group_id: Option<String>,
}

/// Match a reference face against every photo of a group.
///
/// Expects `multipart/form-data` with a `reference_image` file part (JPEG or
/// PNG) and an optional `group_id` text part. The content type is checked
/// before the image is decoded or the record store is contacted.
///
/// # Response
///
/// ```json
/// { "matching_images": ["https://.../a.jpg", "https://.../c.jpg"] }
/// ```
pub async fn match_images(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<MatchResponse>> {
    let form = read_form(multipart).await?;
    let upload = form.reference.ok_or(ServerError::MissingFile)?;
    if !is_supported_content_type(upload.content_type.as_deref()) {
        return Err(ServerError::InvalidFormat);
    }

    let group_id = form
        .group_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.config.default_group_id.clone());
    let file_name = upload.file_name.clone().unwrap_or_default();

    // The scratch copy lives until the end of this request, whatever the outcome.
    let upload_dir = state.config.upload_dir().map(Path::to_path_buf);
    let (_scratch, reference) =
        tokio::task::spawn_blocking(move || prepare_upload(upload, upload_dir)).await??;

    let matching_images = state.pipeline.match_group(&reference, &group_id).await?;

    tracing::info!(
        group_id = %group_id,
        file_name = %file_name,
        matches = matching_images.len(),
        "match request served"
    );
    Ok(Json(MatchResponse { matching_images }))
}

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> ServerResult<MatchForm> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "request body is not multipart");
            return Err(ServerError::MissingFile);
        }
    };

    let mut form = MatchForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(REFERENCE_FIELD) if form.reference.is_none() => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                form.reference = Some(Upload {
                    bytes,
                    content_type,
                    file_name,
                });
            }
            Some(GROUP_FIELD) => {
                form.group_id = Some(field.text().await.map_err(malformed)?);
            }
            _ => {}
        }
    }
    Ok(form)
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ServerError {
    ServerError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
}

/// `image/jpeg` or `image/png`, ignoring case and parameters.
fn is_supported_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Spool the upload to the scratch dir (when enabled) and decode it.
fn prepare_upload(
    upload: Upload,
    upload_dir: Option<PathBuf>,
) -> ServerResult<(Option<NamedTempFile>, RgbImage)> {
    let scratch = match upload_dir {
        Some(dir) => Some(spool(&dir, &upload)?),
        None => None,
    };
    let image = facematch::decode_rgb(&upload.bytes).map_err(ServerError::InvalidImage)?;
    Ok((scratch, image))
}

fn spool(dir: &Path, upload: &Upload) -> ServerResult<NamedTempFile> {
    let suffix = match upload.content_type.as_deref() {
        Some(ct) if ct.to_ascii_lowercase().starts_with("image/png") => ".png",
        _ => ".jpg",
    };
    let mut file = tempfile::Builder::new()
        .prefix("reference-")
        .suffix(suffix)
        .tempfile_in(dir)?;
    file.write_all(&upload.bytes)?;
    tracing::debug!(path = %file.path().display(), bytes = upload.bytes.len(), "upload spooled");
    Ok(file)
}
