mod authorizer;
mod client_secret;
mod token_provider;
mod token_store;

use std::path::PathBuf;

use thiserror::Error;

pub use authorizer::{Authorizer, DRIVE_SCOPE};
pub use client_secret::load_client_secret;
pub use token_provider::TokenProvider;
pub use token_store::{StoredToken, TokenStore};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} has neither an \"installed\" nor a \"web\" client section", path.display())]
    MissingClientSection { path: PathBuf },
    #[error("oauth error: {0}")]
    OAuth(#[from] drive_core::OAuthError),
    #[error("refresh token is missing")]
    MissingRefreshToken,
    #[error("authorization prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("authorization code is empty")]
    EmptyCode,
}

pub(crate) fn now_unix_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
