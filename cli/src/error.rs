use std::path::PathBuf;
use thiserror::Error;
use tonelink_core::ModemError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid config file: {0}")]
    ConfigFile(#[from] serde_json::Error),

    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Usage(String),

    #[error("No packet decoded")]
    NothingDecoded,

    #[error(transparent)]
    Modem(#[from] ModemError),
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }
}
