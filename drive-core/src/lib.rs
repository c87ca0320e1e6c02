mod client;
mod oauth;

pub use client::{
    ApiErrorClass, Credential, DriveClient, DriveError, DriveFile, FOLDER_MIME_TYPE, FileList,
    UploadSession, request_error_is_retryable,
};
pub use oauth::{InstalledApp, OAuthClient, OAuthError, OAuthToken};
