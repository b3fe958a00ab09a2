use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{name} is not set in the environment")]
    MissingSetting { name: &'static str },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Missing assetUrl or blockId")]
    MissingAssetParams,
}

impl Error {
    /// HTTP status a front end should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingAssetParams => 400,
            _ => 500,
        }
    }
}
