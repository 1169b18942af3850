use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("no entry '{task}' on {date}")]
    EntryNotFound { date: String, task: String },

    #[error("refusing to clear {0} without --yes")]
    ClearNotConfirmed(String),

    #[error("unsupported shell: {0}. Use bash, zsh, or fish.")]
    UnsupportedShell(String),
}
