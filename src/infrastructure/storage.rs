use crate::config::AppConfig;
use crate::services::storage::S3StorageService;
use aws_sdk_s3::config::Region;
use std::env;
use std::sync::Arc;
use tracing::info;

/// Builds the S3 client once at startup.
///
/// `S3_ENDPOINT` switches to a MinIO-style endpoint with path-style addressing.
/// Static credentials are used when `S3_ACCESS_KEY`/`S3_SECRET_KEY` are both
/// set, otherwise the default AWS provider chain applies.
pub async fn setup_storage(config: &AppConfig) -> Arc<S3StorageService> {
    let endpoint_url = env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty());
    let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    let bucket = config.bucket.clone();

    info!(
        "☁️  S3 Storage: {} (Bucket: {})",
        endpoint_url.as_deref().unwrap_or("aws default"),
        bucket
    );

    let mut loader = aws_config::from_env().region(Region::new(region));
    if let Some(endpoint) = &endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    if let (Ok(access_key), Ok(secret_key)) =
        (env::var("S3_ACCESS_KEY"), env::var("S3_SECRET_KEY"))
    {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ));
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3StorageService::new(s3_client, bucket))
}
