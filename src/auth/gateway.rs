use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

use super::provider::TokenProvider;

const DEFAULT_SCOPE: &str = "default";

/// Caches bearer tokens per OAuth scope and wraps network operations with a
/// single retry when the provider rejects a token.
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn TokenProvider>,
    cache: Arc<Mutex<HashMap<String, String>>>,
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("cached_scopes", &self.cached().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolves a token for `scope`.
    ///
    /// `force_new` discards any cached token for the scope before minting one.
    /// With `must_have` set, the absence of a token is an
    /// [`AppError::Authorization`] instead of `Ok(None)`.
    pub async fn get_token(
        &self,
        interactive: bool,
        scope: Option<&str>,
        must_have: bool,
        force_new: bool,
    ) -> AppResult<Option<String>> {
        let key = scope_key(scope);

        if force_new {
            let stale = self.cached().remove(&key);
            if let Some(stale) = stale {
                self.provider.remove_cached_token(&stale).await?;
            }
        } else if let Some(token) = self.cached().get(&key).cloned() {
            return Ok(Some(token));
        }

        let token = self.provider.fetch_token(interactive, scope).await?;
        match &token {
            Some(token) => {
                self.cached().insert(key, token.clone());
            }
            None if must_have => {
                return Err(AppError::Authorization(format!(
                    "unable to authorize access for scope \"{key}\""
                )));
            }
            None => {}
        }

        Ok(token)
    }

    /// Runs `operation` with a token for `scope`.
    ///
    /// When `retry_on_auth_failure` is set and the operation fails with an
    /// authorization status, the token is discarded and the operation runs
    /// exactly once more with a fresh one. Every other failure is returned
    /// untouched.
    pub async fn with_auth<T, F, Fut>(
        &self,
        scope: Option<&str>,
        retry_on_auth_failure: bool,
        operation: F,
    ) -> AppResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let token = self.require_token(scope).await?;

        match operation(token.clone()).await {
            Err(err) if retry_on_auth_failure && err.is_auth_failure() => {
                debug!(error = %err, "token rejected, retrying once with a fresh token");
                self.invalidate(scope, &token).await?;
                let fresh = self.require_token(scope).await?;
                operation(fresh).await
            }
            result => result,
        }
    }

    /// Discards the local token for `scope` and best-effort revokes it remotely.
    pub async fn revoke(&self, scope: Option<&str>) {
        let cached = self.cached().remove(&scope_key(scope));
        let token = match cached {
            Some(token) => Some(token),
            None => match self.provider.fetch_token(false, scope).await {
                Ok(token) => token,
                Err(err) => {
                    warn!(error = %err, "no token available to revoke");
                    None
                }
            },
        };

        let Some(token) = token else {
            return;
        };

        if let Err(err) = self.provider.remove_cached_token(&token).await {
            warn!(error = %err, "failed to drop cached token");
        }

        match self.provider.revoke(&token).await {
            Ok(()) => info!("remote token revoked"),
            Err(err) => info!(error = %err, "skipping server revoke error"),
        }
    }

    async fn require_token(&self, scope: Option<&str>) -> AppResult<String> {
        self.get_token(false, scope, true, false)
            .await?
            .ok_or_else(|| AppError::Authorization(format!("no token for scope \"{}\"", scope_key(scope))))
    }

    async fn invalidate(&self, scope: Option<&str>, token: &str) -> AppResult<()> {
        let key = scope_key(scope);
        {
            let mut cache = self.cached();
            if cache.get(&key).is_some_and(|cached| cached == token) {
                cache.remove(&key);
            }
        }
        self.provider.remove_cached_token(token).await
    }

    fn cached(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn scope_key(scope: Option<&str>) -> String {
    scope.unwrap_or(DEFAULT_SCOPE).to_string()
}
