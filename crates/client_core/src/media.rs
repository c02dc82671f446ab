//! Unsigned uploads to a Cloudinary-compatible media service.

use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{domain::PublicId, protocol::MediaUploadResponse};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::config::{ClientSettings, SettingsError};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media service returned an empty public id")]
    EmptyPublicId,
}

/// A file picked into one of the editor's photo slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = guess_image_mime(&filename).map(str::to_string);
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, bytes))
    }
}

fn guess_image_mime(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, file: &SelectedFile) -> Result<PublicId>;

    /// Delivery URL of `public_id` fill-cropped to `height` pixels.
    fn delivery_url(&self, _public_id: &PublicId, _height: u32) -> Option<String> {
        None
    }
}

pub struct MissingMediaUploader;

#[async_trait]
impl MediaUploader for MissingMediaUploader {
    async fn upload(&self, _file: &SelectedFile) -> Result<PublicId> {
        Err(anyhow!("media service is unavailable"))
    }
}

pub struct CloudinaryUploader {
    http: Client,
    upload_url: Url,
    delivery_base: Url,
    upload_preset: String,
}

impl CloudinaryUploader {
    pub fn new(
        http: Client,
        api_url: Url,
        delivery_url: Url,
        cloud_name: &str,
        upload_preset: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let upload_url = api_url.join(&format!("{cloud_name}/image/upload"))?;
        let delivery_base = delivery_url.join(&format!("{cloud_name}/image/upload/"))?;
        Ok(Self {
            http,
            upload_url,
            delivery_base,
            upload_preset: upload_preset.into(),
        })
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, file: &SelectedFile) -> Result<PublicId> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
        if let Some(mime_type) = &file.mime_type {
            part = part.mime_str(mime_type)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response: MediaUploadResponse = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let public_id = PublicId::parse(&response.public_id).ok_or(MediaError::EmptyPublicId)?;
        info!(
            "media: uploaded filename={} size_bytes={} public_id={}",
            file.filename,
            file.bytes.len(),
            public_id
        );
        Ok(public_id)
    }

    fn delivery_url(&self, public_id: &PublicId, height: u32) -> Option<String> {
        self.delivery_base
            .join(&format!("c_fill,h_{height}/{public_id}"))
            .ok()
            .map(String::from)
    }
}

/// Picks the Cloudinary uploader when a cloud name is configured.
pub fn media_uploader_from_settings(
    settings: &ClientSettings,
    http: Client,
) -> Result<Arc<dyn MediaUploader>, SettingsError> {
    let Some(cloud_name) = settings.media_cloud_name.as_deref() else {
        return Ok(Arc::new(MissingMediaUploader));
    };
    let uploader = CloudinaryUploader::new(
        http,
        settings.media_api_url()?,
        settings.media_delivery_url()?,
        cloud_name,
        settings.media_upload_preset.clone(),
    )
    .map_err(|source| SettingsError::InvalidUrl {
        key: "media_cloud_name",
        value: cloud_name.to_string(),
        source,
    })?;
    Ok(Arc::new(uploader))
}
