#![allow(dead_code)]

use anyhow::{Result, anyhow};
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use pdfy::config::AppConfig;
use pdfy::services::converter::Converter;
use pdfy::services::dispatcher::Dispatcher;
use pdfy::services::invoker::{ConverterInvoker, LocalInvoker};
use pdfy::services::storage::StorageService;
use pdfy::{AppState, create_app};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store
#[derive(Default)]
pub struct MockStorageService {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_presign: bool,
}

impl MockStorageService {
    pub fn failing_presign() -> Self {
        Self {
            fail_presign: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn page_count(&self, key: &str) -> usize {
        let object = self.get(key).expect("object not stored");
        lopdf::Document::load_mem(&object.data)
            .expect("stored object is not a PDF")
            .get_pages()
            .len()
    }
}

#[async_trait::async_trait]
impl StorageService for MockStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn generate_presigned_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        if self.fail_presign {
            return Err(anyhow!("presign disabled"));
        }
        Ok(format!(
            "https://mock-s3.local/pdfy-test/{}?X-Amz-Expires={}",
            key,
            expires_in.as_secs()
        ))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bucket: "pdfy-test".to_string(),
        ..AppConfig::development()
    }
}

pub fn dispatcher_with(
    invoker: Arc<dyn ConverterInvoker>,
    storage: Arc<MockStorageService>,
) -> Dispatcher {
    Dispatcher::new(invoker, storage, test_config().download_url_ttl())
}

/// Front app wired to an in-process converter over the given store
pub fn setup_app(storage: Arc<MockStorageService>) -> Router {
    let converter = Arc::new(Converter::new(storage.clone()));
    let invoker = Arc::new(LocalInvoker::new(converter));
    app_with_invoker(invoker, storage)
}

pub fn app_with_invoker(
    invoker: Arc<dyn ConverterInvoker>,
    storage: Arc<MockStorageService>,
) -> Router {
    let dispatcher = Arc::new(dispatcher_with(invoker, storage.clone()));
    create_app(AppState {
        dispatcher,
        storage,
        config: test_config(),
    })
}

pub enum Part<'a> {
    Field(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Binary-safe multipart/form-data body
pub fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    let boundary = "---------------------------123456789012345678901234567";
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match part {
            Part::Field(name, value) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
        width,
        height,
        Rgba([30u8, 144, 255, 200]),
    ));
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
    out
}

/// Minimal DOCX with one run per paragraph
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}
