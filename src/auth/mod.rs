pub mod gateway;
pub mod oauth;
pub mod provider;
pub mod token;
pub mod token_store;

pub use gateway::AuthGateway;
pub use oauth::{AuthLoginResult, AuthStatus, OAuthClient};
pub use provider::{StoredTokenProvider, TokenProvider};
pub use token::TokenSet;
pub use token_store::{FileTokenStore, TokenStore};
