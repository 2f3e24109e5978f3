//! The poster catalogue store.
//!
//! Posterbox keeps the full username → film → poster-URL mapping in memory
//! and mirrors it to a single pretty-printed JSON file after every mutation.
//! The persisted document contains nothing but the mapping, so loading the
//! file reproduces the catalogue verbatim.
//!
//! ## Lifecycle
//!
//! The catalogue is loaded once at process start ([`CatalogStore::load`]):
//! a missing file yields an empty catalogue, and a file that fails to parse
//! is logged and likewise replaced by an empty catalogue; there is no
//! partial recovery. Mutations ([`CatalogStore::set_link`],
//! [`CatalogStore::delete_link`]) update memory first and then persist the
//! whole document as a full overwrite.
//!
//! ## Durability
//!
//! Persistence is best-effort: a failed write is logged and the mutation is
//! still reported as a success. The in-memory catalogue remains
//! authoritative; the file stays stale until the next successful persist.
//!
//! ## Locking
//!
//! A single mutex guards the catalogue, so each read-modify-write-persist
//! cycle is serialised within the process. Backup and restore run in a
//! separate process against the backing file and are NOT synchronised with
//! live mutations; a backup taken mid-burst may capture an older snapshot.

use crate::config::CoreConfig;
use crate::error::{CatalogError, CatalogResult};
use posterbox_types::NonEmptyText;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};

/// One user's film → poster-URL mapping.
pub type UserPosters = BTreeMap<String, String>;

/// The full username → film → poster-URL mapping.
///
/// `BTreeMap` keeps the persisted document deterministic, so an unchanged
/// catalogue always serialises to identical bytes.
pub type PosterCatalog = BTreeMap<String, UserPosters>;

/// The record returned after a successful `set_link`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredLink {
    pub username: String,
    pub film: String,
    pub url: String,
}

/// Mutex-guarded in-memory catalogue mirrored to a backing JSON file.
///
/// Handlers receive the store via `Arc<CatalogStore>`; there is no process
/// global. The store is cheap to share and all operations take `&self`.
pub struct CatalogStore {
    cfg: Arc<CoreConfig>,
    catalog: Mutex<PosterCatalog>,
}

impl CatalogStore {
    /// Loads the catalogue from the configured backing file.
    ///
    /// A missing file initialises an empty catalogue. A file that cannot be
    /// read or parsed is logged with `tracing::warn!` and also initialises
    /// an empty catalogue; the unreadable content is left untouched on disk
    /// until the next persist overwrites it.
    pub fn load(cfg: Arc<CoreConfig>) -> Self {
        let path = cfg.poster_file();
        let catalog = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<PosterCatalog>(&contents) {
                Ok(catalog) => {
                    tracing::info!("loaded poster catalogue from {}", path.display());
                    catalog
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to parse {}: {e}; starting with an empty catalogue",
                        path.display()
                    );
                    PosterCatalog::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "no catalogue file at {}; starting with an empty catalogue",
                    path.display()
                );
                PosterCatalog::new()
            }
            Err(e) => {
                tracing::warn!(
                    "failed to read {}: {e}; starting with an empty catalogue",
                    path.display()
                );
                PosterCatalog::new()
            }
        };

        Self {
            cfg,
            catalog: Mutex::new(catalog),
        }
    }

    /// Stores (or overwrites) the poster URL for a (username, film) pair.
    ///
    /// The user's sub-mapping is created if absent. The mutation triggers a
    /// full persist; a persist failure is logged and the mutation still
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` if `username`, `film` or `url`
    /// is empty or whitespace-only. Validation happens before any mutation.
    pub fn set_link(&self, username: &str, film: &str, url: &str) -> CatalogResult<StoredLink> {
        let username = NonEmptyText::new(username)
            .map_err(|_| CatalogError::InvalidInput("username cannot be empty".into()))?;
        let film = NonEmptyText::new(film)
            .map_err(|_| CatalogError::InvalidInput("film cannot be empty".into()))?;
        let url = NonEmptyText::new(url)
            .map_err(|_| CatalogError::InvalidInput("url cannot be empty".into()))?;

        tracing::info!("storing poster link for {username} - {film}");

        let mut catalog = self.lock();
        catalog
            .entry(username.as_str().to_owned())
            .or_default()
            .insert(film.as_str().to_owned(), url.as_str().to_owned());
        self.persist_locked(&catalog);

        Ok(StoredLink {
            username: username.into_inner(),
            film: film.into_inner(),
            url: url.into_inner(),
        })
    }

    /// Returns the user's film → URL mapping, empty if the user is unknown.
    ///
    /// Unknown users are not an error.
    pub fn user_posters(&self, username: &str) -> UserPosters {
        self.lock().get(username).cloned().unwrap_or_default()
    }

    /// Removes the poster link for a (username, film) pair.
    ///
    /// The removal triggers a full persist with the same best-effort rule as
    /// [`set_link`](Self::set_link). The user's sub-mapping is kept even
    /// when it becomes empty, so a subsequent lookup returns `{}`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::LinkNotFound` if the user or the film entry
    /// does not exist.
    pub fn delete_link(&self, username: &str, film: &str) -> CatalogResult<String> {
        let mut catalog = self.lock();

        let removed = catalog
            .get_mut(username)
            .and_then(|posters| posters.remove(film));
        if removed.is_none() {
            return Err(CatalogError::LinkNotFound {
                username: username.to_owned(),
                film: film.to_owned(),
            });
        }

        tracing::info!("removed poster link for {username} - {film}");
        self.persist_locked(&catalog);

        Ok(format!("Poster for '{film}' removed for '{username}'"))
    }

    /// Serialises the full catalogue to the backing file, replacing prior
    /// content entirely.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Serialization` or `CatalogError::FileWrite` if
    /// rendering or writing fails. The in-memory catalogue is unaffected.
    pub fn persist(&self) -> CatalogResult<()> {
        let catalog = self.lock();
        self.write_catalog(&catalog)
    }

    /// Returns a snapshot of the full catalogue.
    pub fn snapshot(&self) -> PosterCatalog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PosterCatalog> {
        // A poisoned lock only means another thread panicked mid-mutation;
        // the catalogue itself is still the authoritative copy.
        self.catalog
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Best-effort persist used on the mutation path: failures are logged
    /// and swallowed so the accepted mutation still succeeds.
    fn persist_locked(&self, catalog: &PosterCatalog) {
        if let Err(e) = self.write_catalog(catalog) {
            tracing::error!(
                "failed to persist poster catalogue to {}: {e}",
                self.cfg.poster_file().display()
            );
        }
    }

    fn write_catalog(&self, catalog: &PosterCatalog) -> CatalogResult<()> {
        let rendered =
            serde_json::to_string_pretty(catalog).map_err(CatalogError::Serialization)?;
        fs::write(self.cfg.poster_file(), rendered).map_err(CatalogError::FileWrite)
    }
}
