use std::sync::Arc;

use crate::api::{GmailClient, HttpTransport};
use crate::auth::{AuthGateway, FileTokenStore, StoredTokenProvider, TokenStore};
use crate::config::{self, AppPaths, Settings};
use crate::contacts::ContactBook;
use crate::crypto::GpgCrypto;
use crate::error::{AppError, AppResult};
use crate::output::Output;
use crate::sync::Session;

#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub paths: AppPaths,
    pub settings: Settings,
    pub token_store: FileTokenStore,
    pub gateway: AuthGateway,
    pub contacts: Arc<ContactBook>,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(profile: String, json: bool) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile);
        let paths = AppPaths::discover()?;
        let settings = config::load_settings(&paths, &profile)?;
        let token_store = FileTokenStore::new(paths.clone());
        let provider = StoredTokenProvider::new(
            profile.clone(),
            settings.clone(),
            FileTokenStore::new(paths.clone()),
        );

        Ok(Self {
            profile,
            paths,
            settings,
            token_store,
            gateway: AuthGateway::new(Arc::new(provider)),
            contacts: Arc::new(ContactBook::new()),
            output: Output::new(json),
        })
    }

    /// Mailbox owner: the configured address, else the one recorded at login.
    pub fn owner(&self) -> AppResult<String> {
        if let Some(email) = self.settings.email.as_deref().map(str::trim) {
            if !email.is_empty() {
                return Ok(email.to_string());
            }
        }

        self.token_store
            .load(&self.profile)?
            .and_then(|token| token.email)
            .ok_or_else(|| {
                AppError::Authorization(
                    "not logged in. run `pgpmail auth login` or set `email` in the profile settings"
                        .to_string(),
                )
            })
    }

    pub fn session(&self) -> AppResult<Session> {
        let client = GmailClient::new(Arc::new(HttpTransport::new()), self.gateway.clone());
        Ok(Session::new(
            self.owner()?,
            client,
            Arc::new(GpgCrypto::new(self.settings.gpg_program())),
            self.contacts.clone(),
            self.settings.session_options(),
        ))
    }
}
