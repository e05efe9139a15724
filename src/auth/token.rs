use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at_unix: Option<u64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub email: Option<String>,
}

impl TokenSet {
    const EXPIRY_SKEW_SECS: u64 = 30;

    pub fn is_expired(&self, now: SystemTime) -> bool {
        let Some(expires_at) = self.expires_at_unix else {
            return false;
        };

        let Ok(duration) = now.duration_since(UNIX_EPOCH) else {
            return false;
        };

        duration.as_secs().saturating_add(Self::EXPIRY_SKEW_SECS) >= expires_at
    }

    pub fn expires_in_seconds(&self, now: SystemTime) -> Option<i64> {
        let expires_at = self.expires_at_unix? as i64;
        let now_secs = now.duration_since(UNIX_EPOCH).ok()?.as_secs() as i64;
        Some(expires_at - now_secs)
    }

    /// Forces the next lookup to mint a new access token.
    pub fn expire(&mut self) {
        self.expires_at_unix = Some(0);
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn token(expires_at_unix: Option<u64>) -> TokenSet {
        TokenSet {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at_unix,
            token_type: None,
            scope: None,
            email: None,
        }
    }

    #[test]
    fn token_without_expiry_never_expires() {
        assert!(!token(None).is_expired(SystemTime::now()));
    }

    #[test]
    fn expiry_accounts_for_clock_skew() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        assert!(token(Some(1_010)).is_expired(now));
        assert!(!token(Some(1_100)).is_expired(now));
    }

    #[test]
    fn expire_marks_token_stale() {
        let mut token = token(None);
        token.expire();
        assert!(token.is_expired(SystemTime::now()));
    }
}
