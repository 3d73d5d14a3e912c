use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error(
        "Refusing to modify {dir} in place without --i-have-a-backup (or use --dry-run)"
    )]
    BackupNotAcknowledged { dir: String },

    #[error("Cluster count must be greater than 0, got: {clusters}")]
    ZeroClusters { clusters: usize },

    #[error("Input directory does not exist: {dir}")]
    MissingInput { dir: String },

    #[error(transparent)]
    Library(#[from] gridnorm::Error),
}
