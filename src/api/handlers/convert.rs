use crate::AppState;
use crate::api::error::AppError;
use crate::models::{FileType, SubmissionInput, SubmitOutcome, UploadedFile};
use crate::utils::validation::policy_for;
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct GenerateResponse {
    pub result: bool,
    pub message: String,
    pub download_url: String,
}

impl From<SubmitOutcome> for GenerateResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            result: outcome.success,
            message: outcome.message,
            download_url: outcome.download_url,
        }
    }
}

/// Multipart form accepted by `/generate`
#[derive(Deserialize, ToSchema)]
pub struct GenerateForm {
    #[serde(rename = "type")]
    pub file_type: String,
    /// Required for `type=text`
    pub text: Option<String>,
    /// Required for `type=image` and `type=doc`
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadRequirements {
    pub file_type: FileType,
    /// Form field carrying the content
    pub field: String,
    pub extensions: Vec<String>,
    pub mime_types: Vec<String>,
}

/// The `type` field decides which part is read: `text` for text, `file`
/// for every other type. The other part is ignored whatever the field order.
fn select_input(
    file_type: &str,
    text: Option<String>,
    file: Option<UploadedFile>,
) -> SubmissionInput {
    let input = if file_type == FileType::Text.as_str() {
        text.map(SubmissionInput::Text)
    } else {
        file.map(SubmissionInput::File)
    };
    input.unwrap_or(SubmissionInput::Missing)
}

#[utoipa::path(
    post,
    path = "/generate",
    request_body(content = GenerateForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Conversion attempted, see `result`", body = GenerateResponse),
        (status = 400, description = "Malformed form data"),
        (status = 413, description = "Upload too large")
    ),
    tag = "convert"
)]
pub async fn generate_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let mut file_type = String::new();
    let mut text = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "type" {
            file_type = field.text().await?;
        } else if name == "text" {
            text = Some(field.text().await?);
        } else if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field.bytes().await?;

            // Browsers send an empty, nameless part when no file was picked
            if filename.is_empty() && data.is_empty() {
                continue;
            }

            file = Some(UploadedFile {
                filename,
                content_type,
                data,
            });
        }
    }

    let input = select_input(&file_type, text, file);
    info!("📝 PDF requested for type '{}'", file_type);
    let outcome = state.dispatcher.submit(&file_type, input).await;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/upload/{file_type}",
    params(
        ("file_type" = String, Path, description = "One of text, image, doc")
    ),
    responses(
        (status = 200, description = "What the category accepts", body = UploadRequirements),
        (status = 404, description = "Unknown file type")
    ),
    tag = "convert"
)]
pub async fn upload_requirements(
    Path(file_type): Path<String>,
) -> Result<Json<UploadRequirements>, AppError> {
    let file_type: FileType = file_type
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown file type '{}'", file_type)))?;

    let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let requirements = match policy_for(file_type) {
        Some(policy) => UploadRequirements {
            file_type,
            field: "file".to_string(),
            extensions: to_vec(policy.extensions),
            mime_types: to_vec(policy.mime_types),
        },
        None => UploadRequirements {
            file_type,
            field: "text".to_string(),
            extensions: Vec::new(),
            mime_types: Vec::new(),
        },
    };

    Ok(Json(requirements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn png() -> UploadedFile {
        UploadedFile {
            filename: "photo.png".to_string(),
            content_type: Some("image/png".to_string()),
            data: Bytes::from_static(b"png"),
        }
    }

    #[test]
    fn test_select_input_follows_type() {
        let input = select_input("image", Some(String::new()), Some(png()));
        assert!(matches!(input, SubmissionInput::File(f) if f.filename == "photo.png"));

        let input = select_input("text", Some("Hello".into()), Some(png()));
        assert!(matches!(input, SubmissionInput::Text(t) if t == "Hello"));
    }

    #[test]
    fn test_select_input_missing_part() {
        assert!(matches!(
            select_input("text", None, Some(png())),
            SubmissionInput::Missing
        ));
        assert!(matches!(
            select_input("doc", Some("x".into()), None),
            SubmissionInput::Missing
        ));
    }
}
