use drive_core::{Credential, OAuthClient};

use super::{CredentialError, StoredToken, now_unix_millis};

pub struct TokenProvider {
    state: StoredToken,
    oauth_client: OAuthClient,
    refresh_skew_millis: i64,
    refreshed: bool,
}

impl TokenProvider {
    pub fn new(state: StoredToken, oauth_client: OAuthClient) -> Self {
        Self {
            state,
            oauth_client,
            refresh_skew_millis: 60_000,
            refreshed: false,
        }
    }

    pub async fn valid_credential(&mut self) -> Result<Credential, CredentialError> {
        if self.should_refresh() {
            self.refresh().await?;
        }
        Ok(Credential::new(self.state.access_token.clone()))
    }

    pub fn state(&self) -> &StoredToken {
        &self.state
    }

    /// Whether the stored state changed and should be persisted again.
    pub fn was_refreshed(&self) -> bool {
        self.refreshed
    }

    fn should_refresh(&self) -> bool {
        let Some(expiry_date) = self.state.expiry_date else {
            return false;
        };
        expiry_date <= now_unix_millis().saturating_add(self.refresh_skew_millis)
    }

    async fn refresh(&mut self) -> Result<(), CredentialError> {
        let refresh_token = self
            .state
            .refresh_token
            .clone()
            .ok_or(CredentialError::MissingRefreshToken)?;
        tracing::debug!("access token expired, refreshing");
        let token = self.oauth_client.refresh_token(&refresh_token).await?;
        let mut refreshed = StoredToken::from_oauth_token(&token, now_unix_millis());
        // Google omits the refresh token on refresh responses.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }
        if refreshed.scope.is_none() {
            refreshed.scope = self.state.scope.clone();
        }
        self.state = refreshed;
        self.refreshed = true;
        Ok(())
    }
}
