use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::Error;
use crate::types::UserId;

/// Bucket the portal provisions for client uploads.
pub const DEFAULT_BUCKET: &str = "user_uploads";

/// A file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub bucket: String,
    pub is_public: bool,
    /// Overrides the backend's generated object key when set.
    pub custom_path: Option<String>,
    pub content_type: Option<String>,
}

impl UploadRequest {
    /// Queue a file for the default bucket as a public object.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            bucket: DEFAULT_BUCKET.to_string(),
            is_public: true,
            custom_path: None,
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    #[must_use]
    pub fn with_custom_path(mut self, path: impl Into<String>) -> Self {
        self.custom_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Acknowledgement of a stored object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Upload {
    /// Object key within the bucket. Assessments reference this, not the
    /// public URL.
    pub path: String,
    #[serde(default)]
    pub public_url: Option<String>,
}

/// Outcome of bucket provisioning.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct StorageInfo {
    #[serde(default)]
    pub success: bool,
    pub bucket: String,
}

/// Make a file name safe for an object key. Slashes and spaces become
/// underscores, mirroring what the backend does when it generates keys.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.replace(['/', ' '], "_")
}

/// Object key for a user's upload: `{user}/{stamp}_{name}`.
#[must_use]
pub fn object_path(user_id: &UserId, file_name: &str, stamp: u64) -> String {
    format!("{user_id}/{stamp}_{}", sanitize_file_name(file_name))
}

impl ApiClient {
    /// Ensure the portal's upload bucket exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the backend could not provision the bucket.
    pub async fn initialize_storage(&self) -> Result<StorageInfo, Error> {
        let response = self
            .request(reqwest::Method::POST, "storage/initialize")?
            .send()
            .await?;

        let response = Self::ensure_success(
            response,
            "initialize storage",
            "could not prepare file storage",
        )
        .await?;
        response.json().await.map_err(Into::into)
    }

    /// Upload one file through the portal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the backend rejects the file.
    pub async fn upload_file(
        &self,
        user_id: &UserId,
        request: UploadRequest,
    ) -> Result<Upload, Error> {
        let mut part = Part::bytes(request.bytes).file_name(request.file_name);
        if let Some(content_type) = &request.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = Form::new()
            .text("bucket_id", request.bucket)
            .text("user_id", user_id.to_string())
            .text("is_public", if request.is_public { "true" } else { "false" });
        if let Some(custom_path) = request.custom_path {
            form = form.text("custom_path", custom_path);
        }
        form = form.part("file", part);

        let response = self
            .request(reqwest::Method::POST, "storage/upload")?
            .multipart(form)
            .send()
            .await?;

        let response =
            Self::ensure_success(response, "upload file", "file upload failed").await?;
        response.json().await.map_err(Into::into)
    }
}
