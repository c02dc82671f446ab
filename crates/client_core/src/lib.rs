use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use card_store::{ErrorAction, Store};
use reqwest::{Client, Method};
use serde::Serialize;
use shared::{
    error::{ApiError, ApiException},
    protocol::{
        AddPhotoRequest, CacheTag, ChangePhotoRequest, DeletePhotoRequest, EditFieldRequest,
    },
};
use tracing::info;
use url::Url;

pub mod config;
pub mod editor;
pub mod media;

pub use config::{load_settings, ClientSettings, SettingsError};
pub use editor::{
    CardLocks, EditorError, EditorOperation, EditorProps, EditorStatus, FieldPhotoEditor,
    FormSlot, OperationState, PhotoOutcome,
};
pub use media::{
    media_uploader_from_settings, CloudinaryUploader, MediaError, MediaUploader,
    MissingMediaUploader, SelectedFile,
};

const EDIT_FIELD_PATH: &str = "card/field";
const PHOTO_PATH: &str = "card/photo";

/// Mutation endpoints of the card backend.
#[async_trait]
pub trait CardBackend: Send + Sync {
    async fn edit_field(&self, request: EditFieldRequest) -> Result<()>;
    async fn add_photo(&self, request: AddPhotoRequest) -> Result<()>;
    async fn change_photo(&self, request: ChangePhotoRequest) -> Result<()>;
    async fn delete_photo(&self, request: DeletePhotoRequest) -> Result<()>;
}

/// Capabilities the editor needs from the surrounding application: the global
/// error channel and cache invalidation.
pub trait Dispatcher: Send + Sync {
    fn report_error(&self, message: String);
    fn invalidate(&self, tag: CacheTag);
}

impl Dispatcher for Store {
    fn report_error(&self, message: String) {
        self.dispatch(ErrorAction::SetError(message));
    }

    fn invalidate(&self, tag: CacheTag) {
        Store::invalidate(self, tag);
    }
}

pub struct HttpCardBackend {
    http: Client,
    base_url: Url,
}

impl HttpCardBackend {
    /// `base_url` must end with `/` so endpoint paths are appended to it.
    pub fn new(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, SettingsError> {
        Ok(Self::new(
            settings.build_http_client()?,
            settings.api_base_url()?,
        ))
    }

    async fn send_json<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<()> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid card endpoint '{path}'"))?;
        let response = self
            .http
            .request(method.clone(), url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;

        let status = response.status();
        if status.is_success() {
            info!("backend: {method} {url} status={}", status.as_u16());
            return Ok(());
        }

        let raw = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&raw) {
            Ok(api_error) => Err(anyhow::Error::new(ApiException::from(api_error))
                .context(format!("{method} {url} returned {status}"))),
            Err(_) if raw.trim().is_empty() => Err(anyhow!("{method} {url} returned {status}")),
            Err(_) => Err(anyhow!("{method} {url} returned {status}: {}", raw.trim())),
        }
    }
}

#[async_trait]
impl CardBackend for HttpCardBackend {
    async fn edit_field(&self, request: EditFieldRequest) -> Result<()> {
        self.send_json(Method::PATCH, EDIT_FIELD_PATH, &request).await
    }

    async fn add_photo(&self, request: AddPhotoRequest) -> Result<()> {
        self.send_json(Method::POST, PHOTO_PATH, &request).await
    }

    async fn change_photo(&self, request: ChangePhotoRequest) -> Result<()> {
        self.send_json(Method::PUT, PHOTO_PATH, &request).await
    }

    async fn delete_photo(&self, request: DeletePhotoRequest) -> Result<()> {
        self.send_json(Method::DELETE, PHOTO_PATH, &request).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
