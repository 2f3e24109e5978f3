//! # Posterbox Uploader
//!
//! Media-host upload collaborator for Posterbox.
//!
//! The service treats the media host as an opaque network call behind the
//! [`MediaUploader`] trait: binary image bytes and a target folder hint go
//! in, a durable public URL comes out. The production implementation
//! ([`CloudinaryUploader`]) talks to a Cloudinary-compatible upload API;
//! handler tests substitute a stub.
//!
//! There are no retries and nothing is buffered to disk: the payload is
//! forwarded exactly once, straight from memory.

mod cloudinary;

pub use cloudinary::{CloudinaryUploader, UploaderConfig};

use async_trait::async_trait;

/// Errors that can occur while uploading to the media host.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid uploader configuration: {0}")]
    InvalidConfig(String),
    /// The media host rejected the upload; carries the provider's message.
    #[error("media host rejected the upload: {0}")]
    Provider(String),
    #[error("failed to reach media host: {0}")]
    Transport(reqwest::Error),
    #[error("failed to parse media host response: {0}")]
    ResponseParse(serde_json::Error),
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// A successfully uploaded media asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Durable public URL of the asset.
    pub url: String,
    /// Provider-assigned asset identifier, if reported.
    pub public_id: Option<String>,
}

/// Collaborator contract for the media host.
///
/// Given a binary payload and a target folder hint, returns a durable
/// public URL on success or an error carrying the provider's message.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, payload: Vec<u8>, folder: &str) -> UploadResult<UploadedMedia>;
}
