use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a session or reject a request outright.
///
/// Per-file read failures are not represented here: the loader recovers from
/// them and lists them in its report instead.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("no data could be loaded from '{}' ({skipped} file(s) failed)", .dir.display())]
    NoData { dir: PathBuf, skipped: usize },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("required column '{0}' is not present")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
