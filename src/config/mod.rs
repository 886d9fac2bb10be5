use std::env;
use std::time::Duration;

/// Runtime configuration shared by the dispatcher and the converter
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bucket that receives every generated PDF (default: "pdfy-it")
    pub bucket: String,

    /// Lifetime of issued download links in seconds (default: 300)
    pub download_url_ttl_secs: u64,

    /// Maximum accepted upload size in bytes (default: 25 MB)
    pub max_file_size: usize,

    /// Base URL of a remote converter worker. `None` converts in-process.
    pub converter_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bucket: "pdfy-it".to_string(),
            download_url_ttl_secs: 300,
            max_file_size: 25 * 1024 * 1024, // 25 MB
            converter_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket: env::var("S3_BUCKET").unwrap_or(default.bucket),

            download_url_ttl_secs: env::var("DOWNLOAD_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.download_url_ttl_secs),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            converter_url: env::var("CONVERTER_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    /// Create config for local development (in-process converter, local bucket)
    pub fn development() -> Self {
        Self {
            bucket: "pdfy-dev".to_string(),
            converter_url: None,
            ..Self::default()
        }
    }

    pub fn download_url_ttl(&self) -> Duration {
        Duration::from_secs(self.download_url_ttl_secs)
    }
}
