use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: lopdf::Error,
    },
    #[error("no schedule rows found in {}", .0.display())]
    Empty(PathBuf),
    #[error("exchange file: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("client credentials: {0}")]
    Credentials(String),
    #[error("invalid client config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("google api {status}: {body}")]
    Api { status: u16, body: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cache encoding: {0}")]
    Json(#[from] serde_json::Error),
}
