use crate::models::{ConversionRequest, InvocationEnvelope, InvocationPayload};
use crate::services::converter::Converter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Transport between the dispatcher and the converter.
///
/// `Err` means the converter could not be reached or answered with something
/// that is not an envelope. Conversion failures travel inside the envelope.
#[async_trait]
pub trait ConverterInvoker: Send + Sync {
    async fn invoke(&self, request: &ConversionRequest) -> Result<InvocationEnvelope>;
}

/// Calls a converter living in the same process
pub struct LocalInvoker {
    converter: Arc<Converter>,
}

impl LocalInvoker {
    pub fn new(converter: Arc<Converter>) -> Self {
        Self { converter }
    }
}

#[async_trait]
impl ConverterInvoker for LocalInvoker {
    async fn invoke(&self, request: &ConversionRequest) -> Result<InvocationEnvelope> {
        Ok(self
            .converter
            .handle(InvocationPayload::from(request))
            .await)
    }
}

/// Posts the JSON payload to a remote converter worker's `/invoke` route
pub struct HttpInvoker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInvoker {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/invoke", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConverterInvoker for HttpInvoker {
    async fn invoke(&self, request: &ConversionRequest) -> Result<InvocationEnvelope> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Converter at {} is unreachable", self.endpoint))?
            .error_for_status()?;

        let envelope = response
            .json::<InvocationEnvelope>()
            .await
            .context("Converter returned a malformed response")?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileType;

    #[test]
    fn test_http_endpoint() {
        assert_eq!(
            HttpInvoker::new("http://worker:3001/").endpoint(),
            "http://worker:3001/invoke"
        );
        assert_eq!(
            HttpInvoker::new("http://worker:3001").endpoint(),
            "http://worker:3001/invoke"
        );
    }

    #[tokio::test]
    async fn test_unreachable_converter_is_an_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let invoker = HttpInvoker::new("http://127.0.0.1:9");
        let request = ConversionRequest {
            file_type: FileType::Text,
            file_content: "hi".to_string(),
        };
        assert!(invoker.invoke(&request).await.is_err());
    }
}
