//! Constants used throughout the Posterbox core crate.
//!
//! This module contains path, filename and backup defaults to ensure
//! consistency across the codebase and make maintenance easier.

/// Default path of the persisted poster catalogue when no explicit file is configured.
pub const DEFAULT_POSTER_FILE: &str = "poster.json";

/// Default working-copy directory used to stage the catalogue for backup.
pub const DEFAULT_BACKUP_WORKDIR: &str = "tmp-backup";

/// Branch the backup repository standardises on.
pub const DEFAULT_BACKUP_BRANCH: &str = "main";

/// Commit author name used when none is configured.
pub const DEFAULT_BACKUP_AUTHOR_NAME: &str = "Posterbox Backup Bot";

/// Commit author email used when none is configured.
pub const DEFAULT_BACKUP_AUTHOR_EMAIL: &str = "backup@posterbox.dev";
