use async_trait::async_trait;

use super::error::MediaError;

/// Result of a successful image upload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Stable delivery URL for the stored image.
    pub url: String,
    /// Opaque handle used for deletion and transformation.
    pub public_id: String,
}

/// URL-parameterized transformation of an already-uploaded image.
///
/// All fields are optional except the target box; the host applies them
/// without a re-upload.
#[derive(Debug, Clone, Default)]
pub struct Transform {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: Option<String>,
    pub angle: Option<i32>,
    pub effect: Option<String>,
    pub quality: Option<u8>,
    pub format: Option<String>,
}

/// Remote host for user-uploaded images.
///
/// Implementations are constructed once at startup and shared behind
/// `Arc<dyn MediaHost>`; no implicit global configuration.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload raw image bytes. Only `image/jpeg` and `image/png` are accepted.
    async fn upload_image(
        &self,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedImage, MediaError>;

    /// Delete a previously uploaded image by its opaque handle.
    ///
    /// `MediaError::NotFound` is distinguishable from transport failures.
    async fn delete_image(&self, public_id: &str) -> Result<(), MediaError>;

    /// Build the delivery URL of a transformed variant. Pure URL
    /// construction; never contacts the host.
    fn transformed_url(&self, public_id: &str, transform: &Transform) -> String;

    /// Render a QR code for `link_url` and store it as an image, returning
    /// the stored image's URL. Called at most once per transfer record.
    async fn upload_qr(&self, link_url: &str) -> Result<String, MediaError>;
}
