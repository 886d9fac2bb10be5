use crate::models::{FileType, UploadedFile};
use thiserror::Error;

/// Rejections raised before anything is sent to the converter.
///
/// The display strings are shown to the end user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid file type")]
    InvalidFileType,

    #[error("Only JPG and PNG images are allowed")]
    ImageExtension,

    #[error("Invalid image file type")]
    ImageMimeType,

    #[error("Only DOC and DOCX files are allowed")]
    DocExtension,

    #[error("Invalid document file type")]
    DocMimeType,

    #[error("Uploaded document is empty")]
    EmptyDocument,

    #[error("No text provided")]
    MissingText,

    #[error("No file uploaded")]
    MissingFile,
}

/// Accepted extensions and declared content types for one upload category
#[derive(Debug)]
pub struct UploadPolicy {
    pub extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    extension_error: ValidationError,
    mime_error: ValidationError,
    reject_empty: bool,
}

pub static IMAGE_POLICY: UploadPolicy = UploadPolicy {
    extensions: &[".jpg", ".jpeg", ".png"],
    mime_types: &["image/jpeg", "image/png"],
    extension_error: ValidationError::ImageExtension,
    mime_error: ValidationError::ImageMimeType,
    reject_empty: false,
};

pub static DOC_POLICY: UploadPolicy = UploadPolicy {
    extensions: &[".doc", ".docx"],
    mime_types: &[
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ],
    extension_error: ValidationError::DocExtension,
    mime_error: ValidationError::DocMimeType,
    reject_empty: true,
};

/// Upload policy for a category. Text has none: its content is taken as-is.
pub fn policy_for(file_type: FileType) -> Option<&'static UploadPolicy> {
    match file_type {
        FileType::Text => None,
        FileType::Image => Some(&IMAGE_POLICY),
        FileType::Doc => Some(&DOC_POLICY),
    }
}

/// Strips parameters and case from a declared content type
pub fn normalize_mime(content_type: &str) -> String {
    match content_type.trim().parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_lowercase(),
        Err(_) => content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase(),
    }
}

impl UploadPolicy {
    pub fn check_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let filename = filename.to_lowercase();
        if self.extensions.iter().any(|ext| filename.ends_with(ext)) {
            Ok(())
        } else {
            Err(self.extension_error.clone())
        }
    }

    pub fn check_mime_type(&self, content_type: Option<&str>) -> Result<(), ValidationError> {
        let normalized = content_type.map(normalize_mime).unwrap_or_default();
        if self.mime_types.iter().any(|&allowed| allowed == normalized) {
            Ok(())
        } else {
            Err(self.mime_error.clone())
        }
    }

    /// Runs on the base64 form, after the file has been read
    pub fn check_encoded(&self, encoded: &str) -> Result<(), ValidationError> {
        if self.reject_empty && encoded.is_empty() {
            return Err(ValidationError::EmptyDocument);
        }
        Ok(())
    }
}

/// Extension then declared type; the first failing check wins
pub fn validate_upload(file_type: FileType, file: &UploadedFile) -> Result<(), ValidationError> {
    let Some(policy) = policy_for(file_type) else {
        return Ok(());
    };

    policy.check_extension(&file.filename)?;
    policy.check_mime_type(file.content_type.as_deref())?;
    Ok(())
}
