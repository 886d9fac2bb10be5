use crate::models::{
    ConversionRequest, ConversionResult, FileType, InvocationEnvelope, InvocationPayload,
};
use crate::services::render;
use crate::services::storage::{PDF_CONTENT_TYPE, StorageService};
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Fresh object key under the category prefix. Never derived from content.
pub fn storage_key(file_type: FileType) -> String {
    format!("{}/{}.pdf", file_type.storage_prefix(), Uuid::new_v4())
}

fn decode_base64(content: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(content.trim())
        .context("File content is not valid base64")
}

async fn render_blocking<F>(render: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| anyhow!("Rendering task failed: {}", e))?
}

/// Back-tier converter: decode, render, store.
///
/// Every call is independent. Failures are reported in the returned
/// [`ConversionResult`]; nothing is written unless rendering succeeded.
pub struct Converter {
    storage: Arc<dyn StorageService>,
}

impl Converter {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    pub async fn convert(&self, file_type: FileType, file_content: &str) -> ConversionResult {
        match self.convert_and_store(file_type, file_content).await {
            Ok(key) => {
                info!("📄 Converted {} input to {}", file_type, key);
                ConversionResult::stored(key)
            }
            Err(e) => {
                error!("❌ {} conversion failed: {:#}", file_type, e);
                ConversionResult::failed(format!("{:#}", e))
            }
        }
    }

    async fn convert_and_store(&self, file_type: FileType, file_content: &str) -> Result<String> {
        let pdf = match file_type {
            FileType::Text => {
                let text = file_content.to_string();
                render_blocking(move || render::text::render_text(&text)).await?
            }
            FileType::Image => {
                let bytes = decode_base64(file_content)?;
                render_blocking(move || render::image::render_image(&bytes)).await?
            }
            FileType::Doc => {
                let bytes = decode_base64(file_content)?;
                render_blocking(move || render::doc::render_doc(&bytes)).await?
            }
        };

        let key = storage_key(file_type);
        self.storage
            .upload_file(&key, pdf, PDF_CONTENT_TYPE)
            .await
            .context("Failed to store generated PDF")?;
        Ok(key)
    }

    /// Entry point for remote invocations: an unknown type is rejected with
    /// status 400 before any work is done.
    pub async fn handle(&self, payload: InvocationPayload) -> InvocationEnvelope {
        let request = match ConversionRequest::try_from(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected invocation: {}", e);
                return InvocationEnvelope::rejected(e.to_string());
            }
        };

        let result = self
            .convert(request.file_type, &request.file_content)
            .await;
        InvocationEnvelope::from_result(&result)
    }

    /// Same as [`Converter::handle`] but starting from the raw JSON body
    pub async fn handle_json(&self, body: &[u8]) -> InvocationEnvelope {
        match serde_json::from_slice::<InvocationPayload>(body) {
            Ok(payload) => self.handle(payload).await,
            Err(e) => {
                warn!("Malformed invocation payload: {}", e);
                InvocationEnvelope::rejected(format!("Malformed invocation payload: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_shape() {
        for file_type in FileType::ALL {
            let key = storage_key(file_type);
            let prefix = format!("{}/", file_type.storage_prefix());
            assert!(key.starts_with(&prefix));
            assert!(key.ends_with(".pdf"));

            let id = &key[prefix.len()..key.len() - 4];
            assert!(Uuid::parse_str(id).is_ok());
        }
    }

    #[test]
    fn test_storage_keys_are_unique() {
        assert_ne!(storage_key(FileType::Text), storage_key(FileType::Text));
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("aGk=").unwrap(), b"hi");
        assert!(decode_base64("***").is_err());
    }
}
