//! Upload of stamped documents to a remote object store.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::error::{Error, Result};

/// Where an uploaded document ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Publicly reachable URL of the stored document
    pub url: String,
    /// Full response body from the store
    pub raw: Value,
}

/// Destination for finished documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `pdf` under `filename` and return its public location.
    async fn upload(&self, pdf: Vec<u8>, filename: &str) -> Result<UploadResult>;
}

/// Pick the public URL out of an upload response, preferring `secure_url`.
pub fn extract_url(raw: &Value) -> Option<String> {
    ["secure_url", "url"]
        .iter()
        .filter_map(|key| raw.get(key).and_then(Value::as_str))
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

/// Unsigned multipart uploads to Cloudinary (or any endpoint speaking the
/// same protocol).
#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    client: Client,
    endpoint: String,
    preset: Option<String>,
}

impl CloudinaryUploader {
    /// Build an uploader from configuration.
    ///
    /// Fails with [`Error::ConfigMissing`] when neither an upload URL nor a
    /// cloud name is configured.
    pub fn new(config: &UploadConfig) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint()?,
            preset: config.preset().map(str::to_string),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(&self, pdf: Vec<u8>, filename: &str) -> Result<Form> {
        let file = Part::bytes(pdf)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| Error::UploadRequest(e.to_string()))?;

        let mut form = Form::new().part("file", file);
        if let Some(preset) = &self.preset {
            form = form.text("upload_preset", preset.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl ObjectStore for CloudinaryUploader {
    async fn upload(&self, pdf: Vec<u8>, filename: &str) -> Result<UploadResult> {
        info!("Uploading {} ({} bytes) to {}", filename, pdf.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(self.form(pdf, filename)?)
            .send()
            .await
            .map_err(|e| Error::UploadRequest(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::UploadRequest(e.to_string()))?;

        if !status.is_success() {
            warn!("Upload rejected: {} - {}", status, body);
            return Err(Error::Upload {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| Error::UploadResponseShape(format!("response is not JSON: {e}")))?;

        let url = extract_url(&raw).ok_or_else(|| {
            Error::UploadResponseShape("response has neither secure_url nor url".to_string())
        })?;

        debug!("Uploaded to {}", url);
        Ok(UploadResult { url, raw })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_prefers_secure_url() {
        let raw = json!({"url": "http://res/x.pdf", "secure_url": "https://res/x.pdf"});
        assert_eq!(extract_url(&raw).unwrap(), "https://res/x.pdf");
    }

    #[test]
    fn test_extract_falls_back_to_url() {
        let raw = json!({"url": "http://res/x.pdf"});
        assert_eq!(extract_url(&raw).unwrap(), "http://res/x.pdf");

        let raw = json!({"secure_url": "", "url": "http://res/y.pdf"});
        assert_eq!(extract_url(&raw).unwrap(), "http://res/y.pdf");
    }

    #[test]
    fn test_extract_missing() {
        assert!(extract_url(&json!({"public_id": "abc"})).is_none());
        assert!(extract_url(&json!("not an object")).is_none());
    }

    #[test]
    fn test_new_requires_endpoint() {
        let err = CloudinaryUploader::new(&UploadConfig::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }

    #[test]
    fn test_new_composes_endpoint_from_cloud_name() {
        let config = UploadConfig {
            cloud_name: Some("demo".to_string()),
            upload_preset: Some("unsigned".to_string()),
            ..Default::default()
        };
        let uploader = CloudinaryUploader::new(&config).unwrap();
        assert_eq!(
            uploader.endpoint(),
            "https://api.cloudinary.com/v1_1/demo/auto/upload"
        );
        assert_eq!(uploader.preset.as_deref(), Some("unsigned"));
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = UploadConfig {
            upload_url: Some("https://upload.example/api".to_string()),
            cloud_name: Some("demo".to_string()),
            ..Default::default()
        };
        let uploader = CloudinaryUploader::new(&config).unwrap();
        assert_eq!(uploader.endpoint(), "https://upload.example/api");
    }
}
