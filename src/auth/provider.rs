use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::AppResult;

use super::oauth::{self, OAuthClient};
use super::token_store::TokenStore;

/// Source of bearer tokens consumed by [`super::AuthGateway`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a usable access token for `scope`, or `None` when none can be
    /// obtained without user interaction (or the user declined).
    async fn fetch_token(&self, interactive: bool, scope: Option<&str>) -> AppResult<Option<String>>;

    /// Drops `token` from any provider-side cache so the next fetch mints a new one.
    async fn remove_cached_token(&self, token: &str) -> AppResult<()>;

    /// Invalidates `token` remotely.
    async fn revoke(&self, token: &str) -> AppResult<()>;
}

/// Provider backed by the per-profile token file and the OAuth endpoints.
#[derive(Debug)]
pub struct StoredTokenProvider<S> {
    profile: String,
    settings: Settings,
    store: S,
}

impl<S: TokenStore> StoredTokenProvider<S> {
    pub fn new(profile: impl Into<String>, settings: Settings, store: S) -> Self {
        Self {
            profile: profile.into(),
            settings,
            store,
        }
    }

    async fn login(&self) -> AppResult<Option<String>> {
        let outcome = OAuthClient::from_settings(&self.settings)?.login().await?;
        self.store.save(&self.profile, &outcome.token)?;
        Ok(Some(outcome.token.access_token))
    }
}

#[async_trait]
impl<S: TokenStore> TokenProvider for StoredTokenProvider<S> {
    async fn fetch_token(&self, interactive: bool, scope: Option<&str>) -> AppResult<Option<String>> {
        debug!(profile = %self.profile, scope = scope.unwrap_or("default"), interactive, "fetching token");

        let Some(current) = self.store.load(&self.profile)? else {
            return if interactive { self.login().await } else { Ok(None) };
        };

        if !current.is_expired(SystemTime::now()) {
            return Ok(Some(current.access_token));
        }

        let refreshed = match OAuthClient::from_settings(&self.settings) {
            Ok(client) => client.refresh(&current).await,
            Err(err) => Err(err),
        };

        match refreshed {
            Ok(token) => {
                self.store.save(&self.profile, &token)?;
                Ok(Some(token.access_token))
            }
            Err(err) if interactive => {
                warn!(error = %err, "token refresh failed, starting interactive login");
                self.login().await
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                Ok(None)
            }
        }
    }

    async fn remove_cached_token(&self, _token: &str) -> AppResult<()> {
        self.store.expire(&self.profile)?;
        Ok(())
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        let refresh_token = self
            .store
            .load(&self.profile)?
            .and_then(|stored| stored.refresh_token);
        oauth::revoke_token(refresh_token.as_deref().unwrap_or(token)).await
    }
}
