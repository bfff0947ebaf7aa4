use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("No route matches '{0}'")]
    NotFound(String),

    #[error("Navigation target '{0}' is not an absolute path")]
    InvalidTarget(String),

    #[error("Navigation to '{0}' was redirected too many times")]
    TooManyRedirects(String),
}
