//! Headless driver for `adview-core`: file-backed storage, an offline
//! transport, and a scripted clock for the watch timer.

pub mod file_store;
pub mod offline;
pub mod session;
pub mod settings;

use std::path::PathBuf;

use adview_core::error::{ClaimError, LedgerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid ads file: {0}")]
    Ads(#[from] serde_json::Error),

    #[error("no ad with id {0}")]
    UnknownAd(String),

    #[error("ad {0} is not a {1} ad")]
    WrongKind(String, &'static str),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
