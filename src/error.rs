use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QcError>;

#[derive(Debug, Error)]
pub enum QcError {
    /// Malformed limits/adapters/contaminants file or out-of-range option.
    #[error("config error in {path}: {msg}")]
    Config { path: String, msg: String },

    /// Open/map/decompress/read/write failure.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Truncated record, sequence/quality length mismatch or bad quality byte.
    #[error("malformed record #{record}: {msg}")]
    MalformedRecord { record: u64, msg: String },

    /// Internal consistency failure; never fires in a correct build.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl QcError {
    pub fn config(path: impl Into<String>, msg: impl Into<String>) -> Self {
        QcError::Config {
            path: path.into(),
            msg: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QcError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(record: u64, msg: impl Into<String>) -> Self {
        QcError::MalformedRecord {
            record,
            msg: msg.into(),
        }
    }
}
