use std::path::PathBuf;

use drive_core::{Credential, OAuthClient};
use url::Url;

use super::{
    CredentialError, StoredToken, TokenProvider, TokenStore, load_client_secret, now_unix_millis,
};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const FALLBACK_REDIRECT_URI: &str = "http://localhost";

/// Produces a ready [`Credential`] from the persisted token, refreshing it
/// when expired, or from an interactive code exchange when none is stored.
pub struct Authorizer {
    client_secret_path: PathBuf,
    store: TokenStore,
}

impl Authorizer {
    pub fn new(client_secret_path: impl Into<PathBuf>, store: TokenStore) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            store,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub async fn credential(&self) -> Result<Credential, CredentialError> {
        self.credential_with(prompt_for_code).await
    }

    /// Same as [`Authorizer::credential`] with a caller-supplied code prompt.
    pub async fn credential_with<F>(&self, prompt: F) -> Result<Credential, CredentialError>
    where
        F: FnOnce(&Url) -> Result<String, CredentialError>,
    {
        let app = load_client_secret(&self.client_secret_path).await?;
        let client = OAuthClient::from_installed(&app)?;

        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(CredentialError::Parse { path, source }) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable token file: {source}");
                None
            }
            Err(err) => return Err(err),
        };
        let state = match stored {
            Some(state) => state,
            None => {
                let redirect_uri = app
                    .redirect_uris
                    .first()
                    .map(String::as_str)
                    .unwrap_or(FALLBACK_REDIRECT_URI);
                self.authorize_interactively(&client, redirect_uri, prompt)
                    .await?
            }
        };

        let mut provider = TokenProvider::new(state, client);
        let credential = provider.valid_credential().await?;
        if provider.was_refreshed() {
            self.store.save(provider.state()).await?;
        }
        Ok(credential)
    }

    async fn authorize_interactively<F>(
        &self,
        client: &OAuthClient,
        redirect_uri: &str,
        prompt: F,
    ) -> Result<StoredToken, CredentialError>
    where
        F: FnOnce(&Url) -> Result<String, CredentialError>,
    {
        let url = client.authorize_url(redirect_uri, DRIVE_SCOPE, None);
        let code = prompt(&url)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(CredentialError::EmptyCode);
        }
        let token = client.exchange_code(code, redirect_uri).await?;
        let state = StoredToken::from_oauth_token(&token, now_unix_millis());
        self.store.save(&state).await?;
        tracing::info!(path = %self.store.path().display(), "token stored");
        Ok(state)
    }
}

fn prompt_for_code(url: &Url) -> Result<String, CredentialError> {
    println!("Authorize this app by visiting this url:\n{url}");
    let code: String = dialoguer::Input::new()
        .with_prompt("Enter the code from that page here")
        .interact_text()?;
    Ok(code)
}
