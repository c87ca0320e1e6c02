use std::path::Path;

use drive_core::InstalledApp;
use serde::Deserialize;

use super::CredentialError;

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    #[serde(default)]
    installed: Option<InstalledApp>,
    #[serde(default)]
    web: Option<InstalledApp>,
}

/// Reads a Google client secret file as downloaded from the cloud console.
pub async fn load_client_secret(path: &Path) -> Result<InstalledApp, CredentialError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let file: ClientSecretFile =
        serde_json::from_slice(&raw).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    file.installed
        .or(file.web)
        .ok_or_else(|| CredentialError::MissingClientSection {
            path: path.to_path_buf(),
        })
}
