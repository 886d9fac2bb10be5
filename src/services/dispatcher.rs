use crate::models::{
    ConversionRequest, DownloadGrant, FileType, SubmissionInput, SubmitOutcome,
};
use crate::services::invoker::ConverterInvoker;
use crate::services::storage::StorageService;
use crate::utils::validation::{ValidationError, policy_for, validate_upload};
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const INVOCATION_FAILED: &str = "Failed to reach the PDF converter";
pub const DOWNLOAD_URL_FAILED: &str = "Failed to generate download URL";

/// Front tier: validates a submission, forwards it to the converter and
/// turns the stored key into a download link.
pub struct Dispatcher {
    invoker: Arc<dyn ConverterInvoker>,
    storage: Arc<dyn StorageService>,
    download_ttl: Duration,
}

impl Dispatcher {
    pub fn new(
        invoker: Arc<dyn ConverterInvoker>,
        storage: Arc<dyn StorageService>,
        download_ttl: Duration,
    ) -> Self {
        Self {
            invoker,
            storage,
            download_ttl,
        }
    }

    /// Never fails: every outcome, including transport errors, is reported
    /// in the returned [`SubmitOutcome`].
    pub async fn submit(&self, file_type: &str, input: SubmissionInput) -> SubmitOutcome {
        let request = match file_type
            .parse::<FileType>()
            .and_then(|file_type| prepare(file_type, input))
        {
            Ok(request) => request,
            Err(e) => {
                warn!("🚫 Rejected {} submission: {}", file_type, e);
                return SubmitOutcome::failed(e.to_string());
            }
        };

        let envelope = match self.invoker.invoke(&request).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Converter invocation failed: {:#}", e);
                return SubmitOutcome::failed(INVOCATION_FAILED);
            }
        };

        let result = match envelope.into_result() {
            Ok(result) => result,
            Err(e) => {
                error!("Converter invocation failed: {:#}", e);
                return SubmitOutcome::failed(INVOCATION_FAILED);
            }
        };

        let key = match (result.success, result.storage_key) {
            (true, Some(key)) => key,
            _ => return SubmitOutcome::failed(result.message),
        };

        match self.issue_download(&key).await {
            Ok(grant) => {
                info!("🔗 Issued download link for {}", key);
                SubmitOutcome::ready(grant)
            }
            Err(e) => {
                error!("Presigning {} failed: {:#}", key, e);
                SubmitOutcome::failed(DOWNLOAD_URL_FAILED)
            }
        }
    }

    /// Presigned GET for an already stored object. Read-only on the store.
    pub async fn issue_download(&self, key: &str) -> Result<DownloadGrant> {
        let url = self
            .storage
            .generate_presigned_url(key, self.download_ttl)
            .await?;
        Ok(DownloadGrant {
            url,
            expires_in: self.download_ttl,
        })
    }
}

/// Checks the input against the category's policy and builds the payload.
/// Binary content is base64-encoded for the JSON transport.
pub fn prepare(
    file_type: FileType,
    input: SubmissionInput,
) -> Result<ConversionRequest, ValidationError> {
    let file_content = match (file_type, input) {
        (FileType::Text, SubmissionInput::Text(text)) => text,
        (FileType::Text, _) => return Err(ValidationError::MissingText),
        (_, SubmissionInput::File(file)) => {
            validate_upload(file_type, &file)?;
            let encoded = STANDARD.encode(&file.data);
            if let Some(policy) = policy_for(file_type) {
                policy.check_encoded(&encoded)?;
            }
            encoded
        }
        (_, _) => return Err(ValidationError::MissingFile),
    };

    Ok(ConversionRequest {
        file_type,
        file_content,
    })
}
