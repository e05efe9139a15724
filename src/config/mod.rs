pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{SessionOptions, Settings};

use crate::error::AppResult;

const DEFAULT_PROFILE: &str = "default";

pub fn resolve_profile(requested: &str) -> String {
    match requested.trim() {
        "" => DEFAULT_PROFILE.to_string(),
        trimmed => trimmed.to_string(),
    }
}

pub fn load_settings(paths: &AppPaths, profile: &str) -> AppResult<Settings> {
    settings::load(paths.settings_file(profile))
}

pub fn save_settings(paths: &AppPaths, profile: &str, settings: &Settings) -> AppResult<()> {
    settings::save(paths.settings_file(profile), settings)
}
