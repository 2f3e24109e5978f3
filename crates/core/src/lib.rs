//! # Posterbox Core
//!
//! Core business logic for the Posterbox poster catalogue service.
//!
//! This crate contains pure data operations and file management:
//! - The in-memory poster catalogue mirrored to a single JSON file
//! - Best-effort persistence after every mutation
//! - Backup/restore of the persisted file via a remote Git repository
//!
//! **No API concerns**: HTTP servers, request validation and media-host
//! calls belong in `api-rest` and `posterbox-uploader`.

pub mod backup;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;

pub use backup::BackupService;
pub use catalog::{CatalogStore, PosterCatalog, StoredLink, UserPosters};
pub use config::{BackupConfig, CoreConfig};
pub use error::{BackupError, BackupResult, CatalogError, CatalogResult};
