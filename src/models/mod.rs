use crate::utils::validation::ValidationError;
use anyhow::{Context, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use utoipa::ToSchema;

pub const CONVERTED_MESSAGE: &str = "PDF generated and stored in S3";

/// Input category. Decides validation rules, renderer and storage prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Image,
    Doc,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Text, FileType::Image, FileType::Doc];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Image => "image",
            FileType::Doc => "doc",
        }
    }

    /// Object-store prefix for PDFs produced from this category
    pub fn storage_prefix(&self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Image => "images",
            FileType::Doc => "docs",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(FileType::Text),
            "image" => Ok(FileType::Image),
            "doc" => Ok(FileType::Doc),
            _ => Err(ValidationError::InvalidFileType),
        }
    }
}

/// Payload sent from the dispatcher to the converter.
///
/// `file_content` is raw text for [`FileType::Text`] and base64 for the binary
/// categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub file_type: FileType,
    pub file_content: String,
}

/// Untyped form of [`ConversionRequest`] as it arrives on the wire, so an
/// unknown `file_type` can be answered with a structured rejection.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InvocationPayload {
    pub file_type: String,
    pub file_content: String,
}

impl From<&ConversionRequest> for InvocationPayload {
    fn from(request: &ConversionRequest) -> Self {
        Self {
            file_type: request.file_type.as_str().to_string(),
            file_content: request.file_content.clone(),
        }
    }
}

impl TryFrom<InvocationPayload> for ConversionRequest {
    type Error = ValidationError;

    fn try_from(payload: InvocationPayload) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            file_type: payload.file_type.parse()?,
            file_content: payload.file_content,
        })
    }
}

/// Outcome of a single conversion. `storage_key` is set iff `success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub success: bool,
    pub message: String,
    pub storage_key: Option<String>,
}

impl ConversionResult {
    pub fn stored(storage_key: String) -> Self {
        Self {
            success: true,
            message: CONVERTED_MESSAGE.to_string(),
            storage_key: Some(storage_key),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            storage_key: None,
        }
    }
}

/// JSON body carried inside an [`InvocationEnvelope`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConverterBody {
    Stored { message: String, s3_key: String },
    Failed { error: String },
}

/// Wrapper around the converter's answer: a status code plus the JSON body
/// encoded as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvocationEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationEnvelope {
    pub fn new(status_code: u16, body: &ConverterBody) -> Self {
        // Serializing a two-string enum cannot fail.
        let body = serde_json::to_string(body).unwrap_or_default();
        Self { status_code, body }
    }

    /// Envelope for a request rejected before any conversion was attempted
    pub fn rejected(error: impl Into<String>) -> Self {
        Self::new(
            400,
            &ConverterBody::Failed {
                error: error.into(),
            },
        )
    }

    pub fn from_result(result: &ConversionResult) -> Self {
        match (&result.storage_key, result.success) {
            (Some(key), true) => Self::new(
                200,
                &ConverterBody::Stored {
                    message: result.message.clone(),
                    s3_key: key.clone(),
                },
            ),
            _ => Self::new(
                500,
                &ConverterBody::Failed {
                    error: result.message.clone(),
                },
            ),
        }
    }

    /// Decodes the nested body back into a [`ConversionResult`].
    ///
    /// Fails only when the body is not one of the two known shapes.
    pub fn into_result(self) -> Result<ConversionResult> {
        let body: ConverterBody = serde_json::from_str(&self.body)
            .with_context(|| format!("Malformed converter response body: {}", self.body))?;

        Ok(match body {
            ConverterBody::Stored { message, s3_key } if self.status_code == 200 => {
                ConversionResult {
                    success: true,
                    message,
                    storage_key: Some(s3_key),
                }
            }
            ConverterBody::Stored { .. } => ConversionResult::failed(format!(
                "Converter returned status {} without an error message",
                self.status_code
            )),
            ConverterBody::Failed { error } => ConversionResult::failed(error),
        })
    }
}

/// Time-limited download link for a stored PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadGrant {
    pub url: String,
    pub expires_in: Duration,
}

/// A file part taken from an upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw user input handed to the dispatcher together with the type tag
#[derive(Debug, Clone)]
pub enum SubmissionInput {
    Text(String),
    File(UploadedFile),
    Missing,
}

/// What the caller of the dispatcher gets back, whatever happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub success: bool,
    pub message: String,
    pub download_url: String,
}

impl SubmitOutcome {
    pub fn ready(grant: DownloadGrant) -> Self {
        Self {
            success: true,
            message: "Your PDF is ready".to_string(),
            download_url: grant.url,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            download_url: String::new(),
        }
    }
}
