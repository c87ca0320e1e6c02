use std::fmt;

use reqwest::{Client, StatusCode, header::LOCATION};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const ROOT_FOLDER_ALIAS: &str = "root";
const FILE_FIELDS: &str = "id, name, mimeType, modifiedTime";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, modifiedTime)";
const PAGE_SIZE: u32 = 1000;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const GOOGLE_APPS_MIME_PREFIX: &str = "application/vnd.google-apps.";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("upload session response has no location header")]
    MissingUploadLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

/// OAuth access token attached to every Drive request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
}

impl DriveClient {
    pub fn new() -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    pub async fn list_files(
        &self,
        credential: &Credential,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("fields", LIST_FIELDS);
            pairs.append_pair("pageSize", &PAGE_SIZE.to_string());
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }
        let response = self
            .http
            .get(url)
            .header("Authorization", credential.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_files_all(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_files(credential, query, page_token.as_deref())
                .await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(files)
    }

    /// Immediate, non-trashed children of `folder_id`.
    pub async fn list_children(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!(
            "'{}' in parents and trashed = false",
            escape_query_literal(folder_id)
        );
        self.list_files_all(credential, &query).await
    }

    pub async fn list_folders(
        &self,
        credential: &Credential,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!("mimeType = '{FOLDER_MIME_TYPE}' and trashed = false");
        self.list_files_all(credential, &query).await
    }

    pub async fn find_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<DriveFile>, DriveError> {
        let parent = parent_id.unwrap_or(ROOT_FOLDER_ALIAS);
        let query = format!(
            "name = '{}' and mimeType = '{FOLDER_MIME_TYPE}' and '{}' in parents and trashed = false",
            escape_query_literal(name),
            escape_query_literal(parent)
        );
        let page = self.list_files(credential, &query, None).await?;
        Ok(page.files.into_iter().next())
    }

    pub async fn create_folder(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        let metadata = FileMetadata {
            name: Some(name),
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: parent_id.map(|id| vec![id]),
        };
        let response = self
            .http
            .post(url)
            .header("Authorization", credential.auth_header_value())
            .json(&metadata)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Opens a resumable upload session for a new file under `parent_id`.
    pub async fn start_upload(
        &self,
        credential: &Credential,
        name: &str,
        parent_id: &str,
    ) -> Result<UploadSession, DriveError> {
        let mut url = self.endpoint("/upload/drive/v3/files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("fields", FILE_FIELDS);
        let metadata = FileMetadata {
            name: Some(name),
            mime_type: None,
            parents: Some(vec![parent_id]),
        };
        let response = self
            .http
            .post(url)
            .header("Authorization", credential.auth_header_value())
            .header("X-Upload-Content-Type", "application/octet-stream")
            .json(&metadata)
            .send()
            .await?;
        Self::handle_session(response).await
    }

    /// Opens a resumable upload session replacing the content of `file_id`.
    pub async fn start_update(
        &self,
        credential: &Credential,
        file_id: &str,
    ) -> Result<UploadSession, DriveError> {
        let mut url = self.endpoint(&format!("/upload/drive/v3/files/{file_id}"))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("fields", FILE_FIELDS);
        let response = self
            .http
            .patch(url)
            .header("Authorization", credential.auth_header_value())
            .header("X-Upload-Content-Type", "application/octet-stream")
            .json(&FileMetadata::default())
            .send()
            .await?;
        Self::handle_session(response).await
    }

    pub async fn delete_file(
        &self,
        credential: &Credential,
        file_id: &str,
    ) -> Result<(), DriveError> {
        let url = self.endpoint(&format!("/drive/v3/files/{file_id}"))?;
        let response = self
            .http
            .delete(url)
            .header("Authorization", credential.auth_header_value())
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DriveError::Api { status, body })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api { status, body })
        }
    }

    async fn handle_session(response: reqwest::Response) -> Result<UploadSession, DriveError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Api { status, body });
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(DriveError::MissingUploadLocation)?;
        Ok(UploadSession {
            href: Url::parse(location)?,
        })
    }
}

impl DriveError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            DriveError::Api { status, .. } => Some(ApiErrorClass::from_status(*status)),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DriveError::Request(err) => request_error_is_retryable(err),
            _ => self
                .classification()
                .is_some_and(ApiErrorClass::is_retryable),
        }
    }
}

/// Retry class of a transport failure. Errors carrying an HTTP status follow
/// [`ApiErrorClass`]; body and decode failures are permanent.
pub fn request_error_is_retryable(err: &reqwest::Error) -> bool {
    match err.status() {
        Some(status) => ApiErrorClass::from_status(status).is_retryable(),
        None => err.is_timeout() || err.is_connect() || err.is_request(),
    }
}

impl ApiErrorClass {
    pub fn from_status(status: StatusCode) -> Self {
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            ApiErrorClass::Auth
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            ApiErrorClass::RateLimit
        } else if status.is_server_error()
            || matches!(
                status,
                StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
            )
        {
            ApiErrorClass::Transient
        } else {
            ApiErrorClass::Permanent
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, ApiErrorClass::RateLimit | ApiErrorClass::Transient)
    }
}

// Drive query literals are single-quoted; quotes and backslashes need escaping.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parents: Option<Vec<&'a str>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Docs, Sheets, shortcuts and other native types without raw content.
    pub fn is_google_native(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(GOOGLE_APPS_MIME_PREFIX)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    pub href: Url,
}
