use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8787/callback";
const DEFAULT_REFRESH_COOLDOWN_SECS: u64 = 5 * 60;
const DEFAULT_CACHE_CAPACITY: usize = 10;
const DEFAULT_GPG_PROGRAM: &str = "gpg";

/// Inbox search that selects messages likely to carry ascii-armored
/// PGP/MIME content, restricted to the inbox and user labels.
pub const DEFAULT_SEARCH_QUERY: &str =
    "(has:pgpencrypted OR (\"BEGIN PGP MESSAGE\" has:attachment filename:asc)) (in:inbox OR has:userlabels)";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub refresh_cooldown_secs: Option<u64>,
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub gpg_program: Option<String>,
}

impl Settings {
    pub fn client_id(&self) -> AppResult<&str> {
        self.client_id.as_deref().ok_or_else(|| {
            AppError::Config(
                "missing oauth client_id in profile settings. add it to your profile json"
                    .to_string(),
            )
        })
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    pub fn gpg_program(&self) -> &str {
        self.gpg_program.as_deref().unwrap_or(DEFAULT_GPG_PROGRAM)
    }

    pub fn session_options(&self) -> SessionOptions {
        let defaults = SessionOptions::default();
        SessionOptions {
            refresh_cooldown: self
                .refresh_cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_cooldown),
            cache_capacity: self.cache_capacity.unwrap_or(defaults.cache_capacity),
            search_query: self
                .search_query
                .clone()
                .filter(|query| !query.trim().is_empty())
                .unwrap_or(defaults.search_query),
            page_size: defaults.page_size,
            sender_name: self
                .sender_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
        }
    }
}

/// Tuning knobs for a mailbox session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub refresh_cooldown: Duration,
    pub cache_capacity: usize,
    pub search_query: String,
    pub page_size: u32,
    pub sender_name: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            refresh_cooldown: Duration::from_secs(DEFAULT_REFRESH_COOLDOWN_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            page_size: 15,
            sender_name: None,
        }
    }
}

pub fn load(path: PathBuf) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

pub fn save(path: PathBuf, settings: &Settings) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&path, serde_json::to_string_pretty(settings)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_options_fall_back_to_defaults() {
        let options = Settings::default().session_options();
        assert_eq!(options.refresh_cooldown, Duration::from_secs(300));
        assert_eq!(options.cache_capacity, 10);
        assert_eq!(options.page_size, 15);
        assert_eq!(options.search_query, DEFAULT_SEARCH_QUERY);
    }

    #[test]
    fn session_options_honour_overrides() {
        let settings: Settings = serde_json::from_str(
            r#"{"refresh_cooldown_secs": 30, "cache_capacity": 3, "search_query": "in:inbox"}"#,
        )
        .expect("settings json");

        let options = settings.session_options();
        assert_eq!(options.refresh_cooldown, Duration::from_secs(30));
        assert_eq!(options.cache_capacity, 3);
        assert_eq!(options.search_query, "in:inbox");
    }
}
