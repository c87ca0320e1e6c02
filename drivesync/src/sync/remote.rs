use std::path::Path;

use drive_core::{Credential, DriveClient, DriveError, DriveFile, request_error_is_retryable};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::transfer::{TransferClient, TransferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKind {
    Folder,
    File,
    /// Provider-native documents and shortcuts.
    Other,
}

impl RemoteKind {
    pub fn is_folder(self) -> bool {
        self == RemoteKind::Folder
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub kind: RemoteKind,
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transient remote failure: {0}")]
    Transient(String),
    #[error("remote failure: {0}")]
    Permanent(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

impl From<DriveError> for RemoteError {
    fn from(err: DriveError) -> Self {
        if err.is_retryable() {
            RemoteError::Transient(err.to_string())
        } else {
            RemoteError::Permanent(err.to_string())
        }
    }
}

impl From<TransferError> for RemoteError {
    fn from(err: TransferError) -> Self {
        let transient = match &err {
            TransferError::Request(inner) => request_error_is_retryable(inner),
            TransferError::Io(_) => false,
        };
        if transient {
            RemoteError::Transient(err.to_string())
        } else {
            RemoteError::Permanent(err.to_string())
        }
    }
}

/// Operations the sync engine needs from a remote store. Every call receives
/// the credential explicitly.
#[allow(async_fn_in_trait)]
pub trait RemoteTree {
    /// Returns the id of the folder `name` under `parent` (the store root when
    /// `None`), creating it on a miss.
    async fn find_or_create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, RemoteError>;

    /// Immediate children of `folder_id`, excluding trashed entries.
    async fn list_children(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<Vec<RemoteEntry>, RemoteError>;

    async fn create_file(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: &str,
        source: &Path,
    ) -> Result<RemoteEntry, RemoteError>;

    async fn update_file_content(
        &self,
        credential: &Credential,
        file_id: &str,
        source: &Path,
    ) -> Result<(), RemoteError>;

    /// Deletes a file, or a folder together with its descendants.
    async fn delete_entry(&self, credential: &Credential, id: &str) -> Result<(), RemoteError>;
}

impl<T: RemoteTree + ?Sized> RemoteTree for &T {
    async fn find_or_create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, RemoteError> {
        (**self).find_or_create_folder(credential, name, parent).await
    }

    async fn list_children(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        (**self).list_children(credential, folder_id).await
    }

    async fn create_file(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: &str,
        source: &Path,
    ) -> Result<RemoteEntry, RemoteError> {
        (**self).create_file(credential, name, parent_id, source).await
    }

    async fn update_file_content(
        &self,
        credential: &Credential,
        file_id: &str,
        source: &Path,
    ) -> Result<(), RemoteError> {
        (**self).update_file_content(credential, file_id, source).await
    }

    async fn delete_entry(&self, credential: &Credential, id: &str) -> Result<(), RemoteError> {
        (**self).delete_entry(credential, id).await
    }
}

/// [`RemoteTree`] backed by the Google Drive REST API.
#[derive(Clone)]
pub struct DriveRemote {
    client: DriveClient,
    transfer: TransferClient,
}

impl DriveRemote {
    pub fn new(client: DriveClient) -> Self {
        Self {
            client,
            transfer: TransferClient::new(),
        }
    }

    pub fn with_transfer(mut self, transfer: TransferClient) -> Self {
        self.transfer = transfer;
        self
    }
}

impl RemoteTree for DriveRemote {
    async fn find_or_create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, RemoteError> {
        if let Some(folder) = self.client.find_folder(credential, name, parent).await? {
            return Ok(folder.id);
        }
        let folder = self.client.create_folder(credential, name, parent).await?;
        tracing::info!(name, id = %folder.id, "created remote folder");
        Ok(folder.id)
    }

    async fn list_children(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.client
            .list_children(credential, folder_id)
            .await?
            .into_iter()
            .map(remote_entry_from_drive)
            .collect()
    }

    async fn create_file(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: &str,
        source: &Path,
    ) -> Result<RemoteEntry, RemoteError> {
        let session = self
            .client
            .start_upload(credential, name, parent_id)
            .await?;
        let file = self
            .transfer
            .upload_from_path(&session.href, source)
            .await?;
        remote_entry_from_drive(file)
    }

    async fn update_file_content(
        &self,
        credential: &Credential,
        file_id: &str,
        source: &Path,
    ) -> Result<(), RemoteError> {
        let session = self.client.start_update(credential, file_id).await?;
        self.transfer
            .upload_from_path(&session.href, source)
            .await?;
        Ok(())
    }

    async fn delete_entry(&self, credential: &Credential, id: &str) -> Result<(), RemoteError> {
        Ok(self.client.delete_file(credential, id).await?)
    }
}

fn remote_entry_from_drive(file: DriveFile) -> Result<RemoteEntry, RemoteError> {
    let kind = if file.is_folder() {
        RemoteKind::Folder
    } else if file.is_google_native() {
        RemoteKind::Other
    } else {
        RemoteKind::File
    };
    // A missing timestamp compares older than any local file.
    let modified_at = match file.modified_time.as_deref() {
        Some(value) => OffsetDateTime::parse(value, &Rfc3339).map_err(|err| {
            RemoteError::Permanent(format!(
                "invalid modifiedTime {value:?} on {}: {err}",
                file.id
            ))
        })?,
        None => OffsetDateTime::UNIX_EPOCH,
    };
    Ok(RemoteEntry {
        id: file.id,
        name: file.name,
        kind,
        modified_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_core::FOLDER_MIME_TYPE;
    use time::macros::datetime;

    fn drive_file(mime_type: &str, modified: Option<&str>) -> DriveFile {
        DriveFile {
            id: "id-1".into(),
            name: "entry".into(),
            mime_type: mime_type.into(),
            modified_time: modified.map(str::to_string),
        }
    }

    #[test]
    fn maps_mime_types_to_kinds() {
        let folder = remote_entry_from_drive(drive_file(FOLDER_MIME_TYPE, None)).unwrap();
        let doc = remote_entry_from_drive(drive_file(
            "application/vnd.google-apps.document",
            None,
        ))
        .unwrap();
        let file = remote_entry_from_drive(drive_file("text/plain", None)).unwrap();

        assert_eq!(folder.kind, RemoteKind::Folder);
        assert_eq!(doc.kind, RemoteKind::Other);
        assert_eq!(file.kind, RemoteKind::File);
    }

    #[test]
    fn parses_rfc3339_with_millis() {
        let entry = remote_entry_from_drive(drive_file(
            "text/plain",
            Some("2024-03-01T10:20:30.500Z"),
        ))
        .unwrap();
        assert_eq!(entry.modified_at, datetime!(2024-03-01 10:20:30.5 UTC));
    }

    #[test]
    fn missing_timestamp_is_epoch() {
        let entry = remote_entry_from_drive(drive_file("text/plain", None)).unwrap();
        assert_eq!(entry.modified_at, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn malformed_timestamp_is_permanent_error() {
        let err = remote_entry_from_drive(drive_file("text/plain", Some("yesterday")))
            .expect_err("bad timestamp should fail");
        assert!(!err.is_transient());
    }

    async fn upload_failure(response: wiremock::ResponseTemplate) -> RemoteError {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer};

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(response)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        std::fs::write(&source, b"payload").unwrap();
        let session = url::Url::parse(&format!("{}/session/1", server.uri())).unwrap();

        let err = TransferClient::new()
            .upload_from_path(&session, &source)
            .await
            .expect_err("upload should fail");
        RemoteError::from(err)
    }

    #[tokio::test]
    async fn undecodable_upload_response_is_permanent() {
        let err = upload_failure(wiremock::ResponseTemplate::new(200).set_body_string("not json"))
            .await;
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn upload_status_follows_api_classification() {
        let unavailable = upload_failure(wiremock::ResponseTemplate::new(503)).await;
        let forbidden = upload_failure(wiremock::ResponseTemplate::new(403)).await;
        assert!(unavailable.is_transient());
        assert!(!forbidden.is_transient());
    }

    #[test]
    fn drive_errors_keep_their_retry_class() {
        let transient = RemoteError::from(DriveError::Api {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        });
        let permanent = RemoteError::from(DriveError::Api {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: String::new(),
        });
        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
    }
}
