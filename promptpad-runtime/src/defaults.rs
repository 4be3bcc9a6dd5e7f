use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const APP_DIR: &str = "promptpad";

/// `<config dir>/promptpad/settings.json`, or `./promptpad/settings.json` when
/// the platform has no config directory.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("settings.json")
}
