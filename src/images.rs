use crate::persistence::{BlobStore, IMAGES_KEY};
use crate::store::generate_id;
use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub filename: String,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum UploadRejection {
    NotAnImage,
    TooLarge,
}

impl UploadRejection {
    pub fn message_key(&self) -> &'static str {
        match self {
            UploadRejection::NotAnImage => "api.image_invalid_type",
            UploadRejection::TooLarge => "api.image_too_large",
        }
    }
}

pub struct NewImage<'a> {
    pub filename: &'a str,
    pub mime: &'a str,
    pub bytes: &'a [u8],
    pub description: &'a str,
    pub category: Option<&'a str>,
}

pub fn check_upload(mime: &str, size: usize) -> Result<(), UploadRejection> {
    if !mime.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(UploadRejection::NotAnImage);
    }
    if size > MAX_IMAGE_BYTES {
        return Err(UploadRejection::TooLarge);
    }
    Ok(())
}

/**
 * ImageLibrary
 * 上传图片的元数据列表，整体序列化保存在 uploaded_images 键下。
 * 图片内容以 base64 data URI 形式内嵌在 url 字段中。
 */
pub struct ImageLibrary {
    port: Arc<dyn BlobStore>,
}

impl ImageLibrary {
    pub fn new(port: Arc<dyn BlobStore>) -> Self {
        Self { port }
    }

    pub async fn list(&self) -> Vec<UploadedImage> {
        match self.port.get(IMAGES_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::error!("Error loading images: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("Error loading images: {:?}", e);
                Vec::new()
            }
        }
    }

    async fn save(&self, images: &[UploadedImage]) -> Result<()> {
        let raw = serde_json::to_string(images)?;
        self.port.set(IMAGES_KEY, &raw).await
    }

    pub async fn upload(
        &self,
        image: NewImage<'_>,
    ) -> Result<std::result::Result<UploadedImage, UploadRejection>> {
        if let Err(rejection) = check_upload(image.mime, image.bytes.len()) {
            return Ok(Err(rejection));
        }

        let uploaded = UploadedImage {
            id: generate_id(),
            url: format!(
                "data:{};base64,{}",
                image.mime.trim(),
                general_purpose::STANDARD.encode(image.bytes)
            ),
            description: image.description.trim().to_string(),
            filename: image.filename.to_string(),
            size: image.bytes.len() as u64,
            upload_date: Utc::now(),
            category: image
                .category
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        };

        let mut images = self.list().await;
        images.insert(0, uploaded.clone());
        self.save(&images).await?;
        log::info!("Image {} uploaded ({} bytes)", uploaded.id, uploaded.size);
        Ok(Ok(uploaded))
    }

    pub async fn update_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<Option<UploadedImage>> {
        let mut images = self.list().await;
        let Some(image) = images.iter_mut().find(|img| img.id == id) else {
            return Ok(None);
        };
        image.description = description.trim().to_string();
        let updated = image.clone();
        self.save(&images).await?;
        Ok(Some(updated))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut images = self.list().await;
        let before = images.len();
        images.retain(|img| img.id != id);
        if images.len() == before {
            return Ok(false);
        }
        self.save(&images).await?;
        Ok(true)
    }
}
