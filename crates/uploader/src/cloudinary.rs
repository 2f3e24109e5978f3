//! Cloudinary-compatible upload client.
//!
//! Posters are posted to `{endpoint}/{cloud_name}/image/upload` as a
//! multipart form: the binary `file` part (media type sniffed from the
//! payload), the target `folder`, the account's `api_key`, a `timestamp`,
//! and a SHA-256 request signature over the signed parameters. The provider
//! answers with JSON carrying `secure_url` on success or
//! `{"error": {"message": ...}}` on rejection; that message is surfaced to
//! the caller verbatim.

use crate::{MediaUploader, UploadError, UploadResult, UploadedMedia};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

/// Default Cloudinary API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.cloudinary.com/v1_1";

/// Uploader configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct UploaderConfig {
    endpoint: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl UploaderConfig {
    /// Create a new `UploaderConfig` against the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidConfig` if any credential is empty.
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> UploadResult<Self> {
        let cloud_name = cloud_name.into();
        let api_key = api_key.into();
        let api_secret = api_secret.into();

        for (name, value) in [
            ("cloud name", &cloud_name),
            ("API key", &api_key),
            ("API secret", &api_secret),
        ] {
            if value.trim().is_empty() {
                return Err(UploadError::InvalidConfig(format!(
                    "media host {name} cannot be empty"
                )));
            }
        }

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            cloud_name,
            api_key,
            api_secret,
        })
    }

    /// Override the API endpoint (self-hosted mirrors, test doubles).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Media uploader backed by a Cloudinary-compatible upload API.
pub struct CloudinaryUploader {
    cfg: UploaderConfig,
    client: reqwest::Client,
}

impl CloudinaryUploader {
    /// Create a new `CloudinaryUploader`.
    pub fn new(cfg: UploaderConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.cfg.endpoint.trim_end_matches('/'),
            self.cfg.cloud_name
        )
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, payload: Vec<u8>, folder: &str) -> UploadResult<UploadedMedia> {
        let timestamp = Utc::now().timestamp();
        let signature = request_signature(folder, timestamp, &self.cfg.api_secret);

        // Best-effort media-type sniff; the provider re-detects on its side.
        let media_type = infer::get(&payload)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");

        let part = reqwest::multipart::Part::bytes(payload)
            .file_name("poster")
            .mime_str(media_type)
            .map_err(UploadError::Transport)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.cfg.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder.to_owned())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        tracing::debug!("uploading poster to folder '{folder}'");
        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(UploadError::Transport)?;

        if !status.is_success() {
            return Err(UploadError::Provider(provider_message(
                status.as_u16(),
                &body,
            )));
        }

        parse_uploaded(&body)
    }
}

/// SHA-256 request signature over the signed parameters.
///
/// The signed string is the alphabetically ordered parameter list
/// (`folder`, `timestamp`) with the API secret appended.
fn request_signature(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let payload = format!("folder={folder}&timestamp={timestamp}{api_secret}");
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(serde::Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: String,
}

fn parse_uploaded(body: &str) -> UploadResult<UploadedMedia> {
    let parsed: UploadResponse =
        serde_json::from_str(body).map_err(UploadError::ResponseParse)?;
    Ok(UploadedMedia {
        url: parsed.secure_url,
        public_id: parsed.public_id,
    })
}

/// The provider's error message, falling back to the HTTP status when the
/// body is not the expected error document.
fn provider_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| format!("media host returned status {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_empty_credentials() {
        assert!(matches!(
            UploaderConfig::new("", "key", "secret"),
            Err(UploadError::InvalidConfig(_))
        ));
        assert!(matches!(
            UploaderConfig::new("cloud", " ", "secret"),
            Err(UploadError::InvalidConfig(_))
        ));
        assert!(matches!(
            UploaderConfig::new("cloud", "key", ""),
            Err(UploadError::InvalidConfig(_))
        ));
    }

    #[test]
    fn upload_url_joins_endpoint_and_cloud_name() {
        let cfg = UploaderConfig::new("demo", "key", "secret")
            .unwrap()
            .with_endpoint("https://media.example/v1_1/");
        let uploader = CloudinaryUploader::new(cfg);
        assert_eq!(
            uploader.upload_url(),
            "https://media.example/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn signature_is_hex_sha256_and_deterministic() {
        let a = request_signature("posters", 1_700_000_000, "secret");
        let b = request_signature("posters", 1_700_000_000, "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_varies_with_every_signed_input() {
        let base = request_signature("posters", 1_700_000_000, "secret");
        assert_ne!(base, request_signature("other", 1_700_000_000, "secret"));
        assert_ne!(base, request_signature("posters", 1_700_000_001, "secret"));
        assert_ne!(base, request_signature("posters", 1_700_000_000, "other"));
    }

    #[test]
    fn parses_successful_upload_response() {
        let media = parse_uploaded(
            "{\"secure_url\": \"https://media.example/p.jpg\", \"public_id\": \"posters/p\"}",
        )
        .unwrap();
        assert_eq!(
            media,
            UploadedMedia {
                url: "https://media.example/p.jpg".into(),
                public_id: Some("posters/p".into()),
            }
        );
    }

    #[test]
    fn response_without_secure_url_is_a_parse_error() {
        let err = parse_uploaded("{\"public_id\": \"posters/p\"}").unwrap_err();
        assert!(matches!(err, UploadError::ResponseParse(_)));
    }

    #[test]
    fn surfaces_the_providers_error_message() {
        let message =
            provider_message(401, "{\"error\": {\"message\": \"Invalid Signature\"}}");
        assert_eq!(message, "Invalid Signature");
    }

    #[test]
    fn falls_back_to_status_for_unexpected_error_bodies() {
        let message = provider_message(502, "<html>bad gateway</html>");
        assert_eq!(message, "media host returned status 502");
    }
}
