use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::error::MediaError;
use super::traits::{MediaHost, Transform, UploadedImage};
use async_trait::async_trait;

/// Credentials and addressing for a Cloudinary-style media host.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// HTTP client for the media host. Constructed once at startup and handed
/// to the server inside `AppState`.
pub struct CloudinaryClient {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// External QR rendering endpoint; the media host fetches and stores the
/// rendered image so only the stored copy is ever served.
const QR_RENDER_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{action}",
            self.config.cloud_name
        )
    }

    /// Sign a request: SHA-256 over the sorted `key=value` pairs joined
    /// with `&`, with the API secret appended.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<(&str, &str)> = params.to_vec();
        sorted.sort();
        let to_sign: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let payload = format!("{}{}", to_sign.join("&"), self.config.api_secret);
        hex::encode(Sha256::digest(payload.as_bytes()))
    }

    async fn upload_form(&self, form: Form) -> Result<UploadedImage, MediaError> {
        let response = self
            .client
            .post(self.api_url("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Protocol(format!("upload failed ({status}): {body}")));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Protocol(format!("malformed upload response: {e}")))?;

        let url = parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| MediaError::Protocol("upload response missing URL".into()))?;

        Ok(UploadedImage {
            url,
            public_id: parsed.public_id,
        })
    }

    fn signed_base_params(&self, extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut to_sign: Vec<(&str, &str)> = vec![("timestamp", &timestamp)];
        to_sign.extend_from_slice(extra);
        let signature = self.sign(&to_sign);

        let mut params = vec![
            ("api_key".to_string(), self.config.api_key.clone()),
            ("timestamp".to_string(), timestamp),
            ("signature".to_string(), signature),
            ("signature_algorithm".to_string(), "sha256".to_string()),
        ];
        for (k, v) in extra {
            params.push((k.to_string(), v.to_string()));
        }
        params
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload_image(
        &self,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedImage, MediaError> {
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            return Err(MediaError::Unsupported(format!(
                "content type {content_type}; only JPEG and PNG are allowed"
            )));
        }
        if data.is_empty() {
            return Err(MediaError::Unsupported("empty file".into()));
        }

        let mut form = Form::new();
        for (k, v) in self.signed_base_params(&[]) {
            form = form.text(k, v);
        }
        let part = Part::bytes(data)
            .file_name("upload")
            .mime_str(content_type)
            .map_err(|e| MediaError::Unsupported(e.to_string()))?;
        form = form.part("file", part);

        self.upload_form(form).await
    }

    async fn delete_image(&self, public_id: &str) -> Result<(), MediaError> {
        let mut form = Form::new();
        for (k, v) in self.signed_base_params(&[("public_id", public_id)]) {
            form = form.text(k, v);
        }

        let response = self
            .client
            .post(self.api_url("destroy"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MediaError::Protocol(format!("destroy failed ({status})")));
        }

        let parsed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Protocol(format!("malformed destroy response: {e}")))?;

        match parsed.result.as_str() {
            "ok" => Ok(()),
            "not found" => Err(MediaError::NotFound(public_id.to_string())),
            other => Err(MediaError::Protocol(format!("destroy returned '{other}'"))),
        }
    }

    fn transformed_url(&self, public_id: &str, transform: &Transform) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(w) = transform.width {
            parts.push(format!("w_{w}"));
        }
        if let Some(h) = transform.height {
            parts.push(format!("h_{h}"));
        }
        if let Some(ref crop) = transform.crop {
            parts.push(format!("c_{crop}"));
        }
        if let Some(angle) = transform.angle
            && angle != 0
        {
            parts.push(format!("a_{angle}"));
        }
        if let Some(ref effect) = transform.effect {
            parts.push(format!("e_{effect}"));
        }
        if let Some(q) = transform.quality {
            parts.push(format!("q_{q}"));
        }
        if let Some(ref format) = transform.format {
            parts.push(format!("f_{format}"));
        }

        let base = format!("https://res.cloudinary.com/{}/image/upload", self.config.cloud_name);
        if parts.is_empty() {
            format!("{base}/{public_id}")
        } else {
            format!("{base}/{}/{public_id}", parts.join(","))
        }
    }

    async fn upload_qr(&self, link_url: &str) -> Result<String, MediaError> {
        // The host ingests the rendered QR image by URL, so no image bytes
        // pass through this process.
        let render_url = reqwest::Url::parse_with_params(
            QR_RENDER_ENDPOINT,
            &[("size", "300x300"), ("data", link_url)],
        )
        .map_err(|e| MediaError::Protocol(format!("invalid QR render URL: {e}")))?;

        let mut form = Form::new();
        for (k, v) in self.signed_base_params(&[("folder", "qr_codes")]) {
            form = form.text(k, v);
        }
        form = form.text("file", render_url.to_string());

        let uploaded = self.upload_form(form).await?;
        Ok(uploaded.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CloudinaryClient {
        CloudinaryClient::new(CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
        })
    }

    #[test]
    fn transformed_url_includes_only_requested_parameters() {
        let transform = Transform {
            width: Some(300),
            height: Some(200),
            crop: Some("fill".into()),
            ..Default::default()
        };

        assert_eq!(
            client().transformed_url("abc123", &transform),
            "https://res.cloudinary.com/demo/image/upload/w_300,h_200,c_fill/abc123"
        );
    }

    #[test]
    fn transformed_url_without_parameters_is_the_plain_delivery_url() {
        assert_eq!(
            client().transformed_url("abc123", &Transform::default()),
            "https://res.cloudinary.com/demo/image/upload/abc123"
        );
    }

    #[test]
    fn transformed_url_skips_zero_angle_and_appends_effect_and_format() {
        let transform = Transform {
            width: Some(100),
            height: Some(100),
            crop: Some("scale".into()),
            angle: Some(0),
            effect: Some("grayscale".into()),
            quality: Some(80),
            format: Some("png".into()),
        };

        assert_eq!(
            client().transformed_url("p1", &transform),
            "https://res.cloudinary.com/demo/image/upload/w_100,h_100,c_scale,e_grayscale,q_80,f_png/p1"
        );
    }

    #[test]
    fn signature_hashes_sorted_parameters_with_secret_appended() {
        let c = client();
        let signature = c.sign(&[("timestamp", "1700000000"), ("folder", "qr_codes")]);

        let expected = hex::encode(Sha256::digest(
            b"folder=qr_codes&timestamp=1700000000secret",
        ));
        assert_eq!(signature, expected);
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_content_types() {
        let err = client()
            .upload_image(vec![1, 2, 3], "image/gif")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Unsupported(_)));
    }

    #[tokio::test]
    async fn upload_rejects_empty_payloads() {
        let err = client().upload_image(Vec::new(), "image/png").await.unwrap_err();
        assert!(matches!(err, MediaError::Unsupported(_)));
    }
}
