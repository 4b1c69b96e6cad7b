use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperimentError {
    /// A configured stimulus folder is absent or holds no images. Fatal
    /// before the first trial.
    #[error("no stimuli for category `{category}` in {}", folder.display())]
    MissingAsset { category: String, folder: PathBuf },

    #[error("cannot read stimulus folder {}: {source}", folder.display())]
    Catalog {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot write results to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("display surface failed: {0}")]
    Surface(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExperimentError {
    pub fn surface<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ExperimentError::Surface(err.into())
    }
}
