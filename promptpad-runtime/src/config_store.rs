use crate::fs_util::{read_recovering_backup, write_atomically};
use anyhow::Context;
use promptpad_core::settings::Settings;
use promptpad_engine::traits::SettingsRepository;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Settings persisted as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileSettingsRepository {
    path: PathBuf,
}

impl FileSettingsRepository {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRepository for FileSettingsRepository {
    fn load(&self) -> anyhow::Result<Option<Value>> {
        let Some(bytes) = read_recovering_backup(&self.path)
            .with_context(|| format!("read settings: {}", self.path.display()))?
        else {
            return Ok(None);
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("settings file {} is not valid JSON: {e}", self.path.display());
                Err(anyhow::Error::new(e)
                    .context(format!("decode settings JSON: {}", self.path.display())))
            }
        }
    }

    fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(settings).context("encode settings JSON")?;
        write_atomically(&self.path, &json)
            .with_context(|| format!("save settings: {}", self.path.display()))
    }
}
