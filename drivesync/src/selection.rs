use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use drive_core::DriveFile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The remote folder chosen as sync destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectedFolder {
    pub id: String,
    pub name: String,
}

impl From<&DriveFile> for SelectedFolder {
    fn from(file: &DriveFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
        }
    }
}

/// First folder named exactly `name`.
pub fn folder_by_name(folders: &[DriveFile], name: &str) -> Option<SelectedFolder> {
    folders
        .iter()
        .find(|folder| folder.name == name)
        .map(SelectedFolder::from)
}

pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<SelectedFolder>, SelectionError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| SelectionError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    pub async fn save(&self, folder: &SelectedFolder) -> Result<(), SelectionError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        let body = serde_json::to_vec_pretty(folder).map_err(|source| SelectionError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> SelectionError {
        SelectionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn folder(id: &str, name: &str) -> DriveFile {
        DriveFile {
            id: id.into(),
            name: name.into(),
            mime_type: drive_core::FOLDER_MIME_TYPE.into(),
            modified_time: None,
        }
    }

    #[test]
    fn folder_by_name_matches_exactly() {
        let folders = [folder("d-1", "Backups"), folder("d-2", "backups")];
        assert_eq!(
            folder_by_name(&folders, "backups"),
            Some(SelectedFolder {
                id: "d-2".into(),
                name: "backups".into(),
            })
        );
        assert_eq!(folder_by_name(&folders, "Missing"), None);
    }

    #[tokio::test]
    async fn selection_round_trips_through_file() {
        let dir = tempdir().unwrap();
        let store = SelectionStore::new(dir.path().join("state/selection.json"));
        assert!(store.load().await.unwrap().is_none());

        let selected = SelectedFolder {
            id: "d-1".into(),
            name: "Backups".into(),
        };
        store.save(&selected).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(selected));
    }
}
