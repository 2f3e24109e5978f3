//! Backup and restore of the poster catalogue via a remote Git repository.
//!
//! The persisted catalogue file is mirrored to a fixed branch of a remote
//! repository (`git2`/libgit2). The branch carries exactly one snapshot:
//! each backup commit REPLACES the branch tip rather than appending to it,
//! and the remote branch is force-updated to match. Restore copies the
//! synchronised working copy's file back over the local catalogue,
//! last-remote-wins, no merge.
//!
//! ## Working copy
//!
//! A local working copy stages the file between the catalogue and the
//! remote. Its state machine is re-derived on every call from the directory
//! on disk:
//!
//! ```text
//! {absent} --clone--> {present, unsynced} --fetch+reset--> {present, synced}
//! ```
//!
//! After synchronisation the file is copied in (backup) or out (restore).
//! No state is tracked across invocations beyond the directory's existence.
//!
//! ## Failure policy
//!
//! Any step's failure aborts the operation with a [`BackupError`] naming
//! the step; there is no retry and no rollback. Partial state (e.g. a clone
//! that succeeded before a push that failed) is left for the next
//! invocation to reconcile.
//!
//! ## Concurrency
//!
//! Backup and restore are not synchronised with live request handling or
//! with each other. A backup concurrent with API mutations may capture an
//! older snapshot, and two concurrent backups race on the working copy with
//! the last push winning.

use crate::config::{BackupConfig, CoreConfig};
use crate::error::{BackupError, BackupResult};
use chrono::Utc;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Commit, Cred, FetchOptions, PushOptions, RemoteCallbacks, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Service for pushing the persisted catalogue to a remote repository and
/// pulling it back.
///
/// Operates only on the persisted file, never on an in-memory catalogue.
pub struct BackupService {
    core: Arc<CoreConfig>,
    cfg: BackupConfig,
}

impl BackupService {
    /// Create a new `BackupService`.
    pub fn new(core: Arc<CoreConfig>, cfg: BackupConfig) -> Self {
        Self { core, cfg }
    }

    /// Pushes the current persisted catalogue file to the remote branch,
    /// superseding the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`BackupError`] naming the failing step: clone/open of the
    /// working copy, fetch/reset synchronisation, staging the file, the
    /// snapshot commit, or the force-push.
    pub fn backup(&self) -> BackupResult<()> {
        let repo = self.ensure_working_copy()?;
        self.sync_to_remote(&repo)?;

        let staged = self.stage_catalog_file()?;
        self.commit_superseding_tip(&repo, &staged)?;
        self.force_push(&repo)?;

        tracing::info!(
            "backed up {} to {} ({})",
            self.core.poster_file().display(),
            self.cfg.remote_url(),
            self.cfg.branch()
        );
        Ok(())
    }

    /// Overwrites the local persisted catalogue file with the remote's
    /// version.
    ///
    /// # Errors
    ///
    /// Returns a [`BackupError`] if the working copy cannot be prepared or
    /// synchronised, if the synchronised working copy has no snapshot file
    /// ([`BackupError::SnapshotMissing`]), or if the copy-out fails.
    pub fn restore(&self) -> BackupResult<()> {
        let repo = self.ensure_working_copy()?;
        self.sync_to_remote(&repo)?;

        let snapshot = self.workdir_file();
        if !snapshot.is_file() {
            return Err(BackupError::SnapshotMissing(snapshot));
        }
        fs::copy(&snapshot, self.core.poster_file()).map_err(BackupError::RestoreFile)?;

        tracing::info!(
            "restored {} from {} ({})",
            self.core.poster_file().display(),
            self.cfg.remote_url(),
            self.cfg.branch()
        );
        Ok(())
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.cfg.branch())
    }

    fn remote_ref(&self) -> String {
        format!("refs/remotes/origin/{}", self.cfg.branch())
    }

    fn workdir_file(&self) -> PathBuf {
        self.cfg.workdir().join(self.cfg.file_name())
    }

    /// Opens the working copy, cloning the remote first if the directory
    /// does not hold a repository yet.
    fn ensure_working_copy(&self) -> BackupResult<Repository> {
        if self.cfg.workdir().join(".git").exists() {
            return Repository::open(self.cfg.workdir()).map_err(BackupError::GitOpen);
        }

        tracing::info!(
            "cloning backup repository into {}",
            self.cfg.workdir().display()
        );
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(self.callbacks());
        RepoBuilder::new()
            .fetch_options(fetch)
            .clone(self.cfg.remote_url(), self.cfg.workdir())
            .map_err(BackupError::GitClone)
    }

    /// Synchronises the working copy to the latest remote state of the
    /// configured branch: fetch, then hard-reset the local branch to the
    /// remote tip. Last-remote-wins; local divergence is discarded.
    ///
    /// A remote branch that does not exist yet (freshly created backup
    /// repository) leaves the local branch unborn so the first snapshot
    /// commit creates it.
    fn sync_to_remote(&self, repo: &Repository) -> BackupResult<()> {
        let mut remote = repo.find_remote("origin").map_err(BackupError::GitRemote)?;
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(self.callbacks());
        // An empty refspec list fetches the remote's configured refspecs,
        // which also succeeds against an empty repository.
        let refspecs: [&str; 0] = [];
        remote
            .fetch(&refspecs, Some(&mut fetch), None)
            .map_err(BackupError::GitFetch)?;

        match repo.find_reference(&self.remote_ref()) {
            Ok(reference) => {
                let tip = reference.peel_to_commit().map_err(BackupError::GitPeel)?;
                repo.reference(&self.branch_ref(), tip.id(), true, "sync to remote")
                    .map_err(BackupError::GitReference)?;
                repo.set_head(&self.branch_ref())
                    .map_err(BackupError::GitSetHead)?;
                repo.checkout_head(Some(CheckoutBuilder::new().force()))
                    .map_err(BackupError::GitCheckout)?;
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                repo.set_head(&self.branch_ref())
                    .map_err(BackupError::GitSetHead)?;
            }
            Err(e) => return Err(BackupError::GitReference(e)),
        }

        Ok(())
    }

    /// Copies the persisted catalogue file into the working copy under the
    /// configured in-repo file name, returning the repo-relative path.
    fn stage_catalog_file(&self) -> BackupResult<PathBuf> {
        fs::copy(self.core.poster_file(), self.workdir_file())
            .map_err(BackupError::StageFile)?;
        Ok(PathBuf::from(self.cfg.file_name()))
    }

    /// Commits the staged file, replacing the branch tip.
    ///
    /// The new commit adopts the current tip's parents, so the branch never
    /// accumulates history: each snapshot supersedes the last. On an unborn
    /// branch the snapshot becomes the root commit.
    fn commit_superseding_tip(
        &self,
        repo: &Repository,
        relative_path: &Path,
    ) -> BackupResult<git2::Oid> {
        let mut index = repo.index().map_err(BackupError::GitIndex)?;
        index.add_path(relative_path).map_err(BackupError::GitAdd)?;
        index.write().map_err(BackupError::GitIndex)?;

        let tree_id = index.write_tree().map_err(BackupError::GitWriteTree)?;
        let tree = repo.find_tree(tree_id).map_err(BackupError::GitFindTree)?;

        let sig = git2::Signature::now(self.cfg.author_name(), self.cfg.author_email())
            .map_err(BackupError::GitSignature)?;

        let parents = self.resolve_superseded_parents(repo)?;
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();

        let message = render_snapshot_message();
        let oid = repo
            .commit(None, &sig, &sig, &message, &tree, &parent_refs)
            .map_err(BackupError::GitCommit)?;

        // The commit was created without moving any ref; point the branch
        // (and HEAD) at it explicitly, discarding the superseded tip.
        repo.reference(&self.branch_ref(), oid, true, "catalogue snapshot")
            .map_err(BackupError::GitReference)?;
        repo.set_head(&self.branch_ref())
            .map_err(BackupError::GitSetHead)?;

        Ok(oid)
    }

    /// Resolve the parent list for a snapshot commit.
    ///
    /// - If `HEAD` exists, the new commit adopts the tip's OWN parents,
    ///   replacing the tip.
    /// - If the branch is unborn (`UnbornBranch`/`NotFound`), the parent
    ///   list is empty and the snapshot becomes the root commit.
    fn resolve_superseded_parents<'repo>(
        &self,
        repo: &'repo Repository,
    ) -> BackupResult<Vec<Commit<'repo>>> {
        match repo.head() {
            Ok(head) => {
                let tip = head.peel_to_commit().map_err(BackupError::GitPeel)?;
                Ok(tip.parents().collect())
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(BackupError::GitHead(e)),
        }
    }

    /// Force-updates the remote branch to the local snapshot.
    fn force_push(&self, repo: &Repository) -> BackupResult<()> {
        let mut remote = repo.find_remote("origin").map_err(BackupError::GitRemote)?;
        let mut push = PushOptions::new();
        push.remote_callbacks(self.callbacks());

        let refspec = format!("+{branch}:{branch}", branch = self.branch_ref());
        remote
            .push(&[refspec.as_str()], Some(&mut push))
            .map_err(BackupError::GitPush)
    }

    /// Remote callbacks carrying the configured access token, if any.
    ///
    /// The token is offered as a userpass credential; a token embedded in
    /// the remote URL itself also works without any callback.
    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = self.cfg.token() {
            let token = token.to_owned();
            callbacks.credentials(move |_url, username_from_url, _allowed| {
                Cred::userpass_plaintext(username_from_url.unwrap_or("x-access-token"), &token)
            });
        }
        callbacks
    }
}

/// Render the snapshot commit message.
///
/// Subject plus a `Snapshot-Time` trailer in standard Git trailer format.
fn render_snapshot_message() -> String {
    format!(
        "backup: poster catalogue snapshot\n\nSnapshot-Time: {}",
        Utc::now().to_rfc3339()
    )
}
