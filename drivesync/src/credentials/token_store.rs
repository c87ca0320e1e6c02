use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use drive_core::OAuthToken;
use serde::{Deserialize, Serialize};

use super::CredentialError;

/// Persisted OAuth state, in the shape Google client libraries write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as unix time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl StoredToken {
    pub fn from_oauth_token(token: &OAuthToken, now_millis: i64) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            scope: token.scope.clone(),
            token_type: Some(token.token_type.clone()),
            expiry_date: token
                .expires_in
                .map(|secs| now_millis.saturating_add((secs as i64).saturating_mul(1000))),
        }
    }
}

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<StoredToken>, CredentialError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let token = serde_json::from_slice(&raw).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(token))
    }

    pub async fn save(&self, token: &StoredToken) -> Result<(), CredentialError> {
        let write_err = |source| CredentialError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let body = serde_json::to_vec(token).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, body).await.map_err(write_err)?;
        restrict_permissions(&self.path).await.map_err(write_err)?;
        Ok(())
    }

    /// Returns whether a token file was actually removed.
    pub async fn delete(&self) -> Result<bool, CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CredentialError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_token() -> StoredToken {
        StoredToken {
            access_token: "access-1".into(),
            refresh_token: Some("refresh-1".into()),
            scope: Some("https://www.googleapis.com/auth/drive".into()),
            token_type: Some("Bearer".into()),
            expiry_date: Some(1_700_000_000_000),
        }
    }

    #[tokio::test]
    async fn load_returns_none_when_file_is_absent() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_parent_and_load_reads_back() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested/token.json"));
        store.save(&sample_token()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(sample_token()));
    }

    #[tokio::test]
    async fn reads_token_written_by_google_client_libraries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"ya29.x","refresh_token":"1//r","scope":"https://www.googleapis.com/auth/drive","token_type":"Bearer","expiry_date":1700000000000}"#,
        )
        .unwrap();

        let token = TokenStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(token.access_token, "ya29.x");
        assert_eq!(token.expiry_date, Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn malformed_token_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = TokenStore::new(&path)
            .load()
            .await
            .expect_err("malformed token should fail");
        assert!(matches!(err, CredentialError::Parse { .. }));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_file_was_removed() {
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(!store.delete().await.unwrap());

        store.save(&sample_token()).await.unwrap();
        assert!(store.delete().await.unwrap());
        assert!(store.load().await.unwrap().is_none());
    }

    #[test]
    fn expiry_is_derived_from_expires_in() {
        let token = OAuthToken {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            expires_in: Some(3600),
            refresh_token: None,
            scope: None,
        };
        let stored = StoredToken::from_oauth_token(&token, 1_000);
        assert_eq!(stored.expiry_date, Some(3_601_000));
    }
}
