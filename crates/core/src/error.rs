#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no poster link for user '{username}' and film '{film}'")]
    LinkNotFound { username: String, film: String },
    #[error("failed to read catalogue file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write catalogue file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialise catalogue: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialise catalogue: {0}")]
    Deserialization(serde_json::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("invalid backup configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to clone backup repository: {0}")]
    GitClone(git2::Error),
    #[error("failed to open backup working copy: {0}")]
    GitOpen(git2::Error),
    #[error("failed to look up remote: {0}")]
    GitRemote(git2::Error),
    #[error("failed to fetch from remote: {0}")]
    GitFetch(git2::Error),
    #[error("failed to create/update git reference: {0}")]
    GitReference(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to check out working copy: {0}")]
    GitCheckout(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create snapshot commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to resolve branch tip: {0}")]
    GitHead(git2::Error),
    #[error("failed to peel git reference: {0}")]
    GitPeel(git2::Error),
    #[error("failed to push to remote: {0}")]
    GitPush(git2::Error),
    #[error("failed to copy catalogue file into working copy: {0}")]
    StageFile(std::io::Error),
    #[error("failed to copy catalogue file out of working copy: {0}")]
    RestoreFile(std::io::Error),
    #[error("working copy has no catalogue snapshot at {}", .0.display())]
    SnapshotMissing(std::path::PathBuf),
}

pub type BackupResult<T> = std::result::Result<T, BackupError>;
