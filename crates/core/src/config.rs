//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process
//! startup and then passed into core services. The intent is to avoid reading
//! process-wide environment variables during request handling, which can lead
//! to inconsistent behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::{
    DEFAULT_BACKUP_AUTHOR_EMAIL, DEFAULT_BACKUP_AUTHOR_NAME, DEFAULT_BACKUP_BRANCH,
    DEFAULT_POSTER_FILE,
};
use crate::error::{BackupError, BackupResult, CatalogError, CatalogResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
///
/// Holds the location of the persisted poster catalogue. Services receive
/// this via `Arc<CoreConfig>` rather than reading the environment themselves.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    poster_file: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` if `poster_file` is empty.
    pub fn new(poster_file: PathBuf) -> CatalogResult<Self> {
        if poster_file.as_os_str().is_empty() {
            return Err(CatalogError::InvalidInput(
                "poster file path cannot be empty".into(),
            ));
        }

        Ok(Self { poster_file })
    }

    /// Path of the persisted poster catalogue.
    pub fn poster_file(&self) -> &Path {
        &self.poster_file
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poster_file: PathBuf::from(DEFAULT_POSTER_FILE),
        }
    }
}

/// Configuration for the backup repository.
///
/// The remote URL and working-copy directory are mandatory; branch, in-repo
/// file name and commit author fall back to the crate defaults and can be
/// overridden with the `with_*` methods.
#[derive(Clone, Debug)]
pub struct BackupConfig {
    remote_url: String,
    branch: String,
    file_name: String,
    workdir: PathBuf,
    token: Option<String>,
    author_name: String,
    author_email: String,
}

impl BackupConfig {
    /// Create a new `BackupConfig` with default branch, file name and author.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::InvalidConfig` if the remote URL or working-copy
    /// directory is empty.
    pub fn new(remote_url: impl Into<String>, workdir: PathBuf) -> BackupResult<Self> {
        let remote_url = remote_url.into();
        if remote_url.trim().is_empty() {
            return Err(BackupError::InvalidConfig(
                "backup remote URL cannot be empty".into(),
            ));
        }
        if workdir.as_os_str().is_empty() {
            return Err(BackupError::InvalidConfig(
                "backup working-copy directory cannot be empty".into(),
            ));
        }

        Ok(Self {
            remote_url,
            branch: DEFAULT_BACKUP_BRANCH.to_owned(),
            file_name: DEFAULT_POSTER_FILE.to_owned(),
            workdir,
            token: None,
            author_name: DEFAULT_BACKUP_AUTHOR_NAME.to_owned(),
            author_email: DEFAULT_BACKUP_AUTHOR_EMAIL.to_owned(),
        })
    }

    /// Override the branch the backup repository standardises on.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::InvalidConfig` if `branch` is empty.
    pub fn with_branch(mut self, branch: impl Into<String>) -> BackupResult<Self> {
        let branch = branch.into();
        if branch.trim().is_empty() {
            return Err(BackupError::InvalidConfig(
                "backup branch cannot be empty".into(),
            ));
        }
        self.branch = branch;
        Ok(self)
    }

    /// Override the in-repo file name the catalogue is staged under.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::InvalidConfig` if `file_name` is empty or
    /// contains a path separator (the snapshot lives at the repository root).
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> BackupResult<Self> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() || file_name.contains(['/', '\\']) {
            return Err(BackupError::InvalidConfig(
                "backup file name must be a bare file name".into(),
            ));
        }
        self.file_name = file_name;
        Ok(self)
    }

    /// Supply an access token for the remote.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the commit author.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }
}
