use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::StorageSettings;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage rejected object {key}: {status}")]
    Rejected { key: String, status: StatusCode },
}

/// Out-of-band blob store for report evidence. `store` returns the public URL
/// that gets persisted on the upload row.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Object key for one evidence file: `{reportId}/{timestamp}-{originalFilename}`.
/// The original name is sanitized so a hostile filename cannot escape the
/// report's prefix.
pub fn object_key(report_id: Uuid, uploaded_at: OffsetDateTime, original_name: &str) -> String {
    let millis = uploaded_at.unix_timestamp_nanos() / 1_000_000;
    format!("{}/{}-{}", report_id, millis, sanitize_filename(original_name))
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

/// Supabase-style bucket client: one POST per object, bearer-key auth,
/// deterministic public URL.
pub struct BucketStorage {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl BucketStorage {
    pub fn new(client: Client, settings: &StorageSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            bucket: settings.bucket.clone(),
        }
    }

    fn upload_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                status,
            });
        }

        Ok(self.public_url(key))
    }
}

#[cfg(test)]
pub struct MockStorage {
    pub stored: std::sync::Mutex<Vec<(String, usize, String)>>,
    pub should_fail: bool,
}

#[cfg(test)]
impl Default for MockStorage {
    fn default() -> Self {
        Self {
            stored: std::sync::Mutex::new(Vec::new()),
            should_fail: false,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStorage for MockStorage {
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        self.stored
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.len(), content_type.to_string()));
        Ok(format!("http://storage.local/public/{key}"))
    }
}
