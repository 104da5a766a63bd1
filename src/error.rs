//! Centralized error type for the timbremap umbrella crate.
//!
//! Wraps both subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] timbremap_core::Error),

    #[error("Store: {0}")]
    Store(#[from] timbremap_export::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
