use api_client::error::RequestError;
use browser::StorageError;
use configuration::error::ConfigError;
use core_types::error::CoreError;
use router::RouterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Navigation failed: {0}")]
    Router(#[from] RouterError),

    #[error(transparent)]
    Input(#[from] CoreError),
}
