use std::{io, path::Path};

use drive_core::DriveFile;
use reqwest::{Client, header::CONTENT_LENGTH};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Streams local file content into an already opened upload session.
#[derive(Clone)]
pub struct TransferClient {
    http: Client,
}

impl TransferClient {
    pub fn new() -> Self {
        Self::with_http(Client::new())
    }

    pub fn with_http(http: Client) -> Self {
        Self { http }
    }

    pub async fn upload_from_path(
        &self,
        session: &Url,
        source: &Path,
    ) -> Result<DriveFile, TransferError> {
        let file = tokio::fs::File::open(source).await?;
        let len = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .http
            .put(session.clone())
            .header(CONTENT_LENGTH, len)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<DriveFile>().await?)
    }
}

impl Default for TransferClient {
    fn default() -> Self {
        Self::new()
    }
}
