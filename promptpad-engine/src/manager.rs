use crate::traits::SettingsRepository;
use anyhow::Context;
use promptpad_core::settings::Settings;
use promptpad_core::types::{CommandType, ModelId, list_models};

/// Owns the live settings and persists every mutation through `R`.
///
/// Mutators apply the change in memory first and then save. When the save
/// fails the error is returned so it can be shown to the user, but the
/// in-memory state keeps the change.
#[derive(Debug)]
pub struct SettingsManager<R> {
    repo: R,
    settings: Settings,
}

impl<R: SettingsRepository> SettingsManager<R> {
    /// Loads persisted settings merged over the defaults. Never fails: a
    /// missing or unreadable record yields the defaults.
    pub fn load(repo: R) -> Self {
        let settings = match repo.load() {
            Ok(Some(value)) => Settings::merge_over_defaults(value),
            Ok(None) => {
                log::info!("no persisted settings; using defaults");
                Settings::default()
            }
            Err(e) => {
                log::warn!("failed to load settings, using defaults: {e:#}");
                Settings::default()
            }
        };
        Self { repo, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.repo
            .save(&self.settings)
            .inspect_err(|e| log::error!("failed to save settings: {e:#}"))
            .context("save settings")
    }

    pub fn set_api_key(&mut self, key: Option<String>) -> anyhow::Result<()> {
        self.settings.api_key = key.filter(|k| !k.trim().is_empty());
        self.save()
    }

    pub fn list_models(&self) -> Vec<(ModelId, &'static str)> {
        list_models()
    }

    pub fn set_model(&mut self, model: ModelId) -> anyhow::Result<()> {
        self.settings.model = model;
        self.save()
    }

    pub fn set_model_str(&mut self, model: &str) -> anyhow::Result<()> {
        let model: ModelId = model.parse()?;
        self.set_model(model)
    }

    pub fn set_streaming(&mut self, enabled: bool) -> anyhow::Result<()> {
        self.settings.streaming = enabled;
        self.save()
    }

    pub fn set_recents_limit(&mut self, limit: usize) -> anyhow::Result<()> {
        self.settings.set_recents_limit(limit)?;
        self.save()
    }

    pub fn add_recent_prompt(&mut self, text: impl Into<String>) -> anyhow::Result<()> {
        self.settings.add_recent_prompt(text);
        self.save()
    }

    pub fn template(&self, command: CommandType) -> &str {
        self.settings.template(command)
    }

    pub fn set_template(
        &mut self,
        command: CommandType,
        value: impl Into<String>,
    ) -> anyhow::Result<()> {
        self.settings.set_template(command, value);
        self.save()
    }

    pub fn reset_template(&mut self, command: CommandType) -> anyhow::Result<String> {
        let restored = self.settings.reset_template(command).to_string();
        self.save()?;
        Ok(restored)
    }

    /// Ends the lifecycle, handing back the final in-memory state.
    pub fn teardown(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptpad_core::settings::SettingsError;
    use promptpad_core::template::default_template;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct FakeRepo {
        stored: Arc<Mutex<Option<Value>>>,
        saves: Arc<Mutex<usize>>,
        fail_load: bool,
        fail_save: bool,
    }

    impl SettingsRepository for FakeRepo {
        fn load(&self) -> anyhow::Result<Option<Value>> {
            if self.fail_load {
                anyhow::bail!("disk on fire");
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        fn save(&self, settings: &Settings) -> anyhow::Result<()> {
            if self.fail_save {
                anyhow::bail!("read-only");
            }
            *self.stored.lock().unwrap() = Some(serde_json::to_value(settings)?);
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn empty_repository_loads_defaults() {
        let m = SettingsManager::load(FakeRepo::default());
        assert_eq!(m.settings(), &Settings::default());
    }

    #[test]
    fn unreadable_repository_loads_defaults() {
        let repo = FakeRepo {
            fail_load: true,
            ..Default::default()
        };
        let m = SettingsManager::load(repo);
        assert_eq!(m.settings(), &Settings::default());
    }

    #[test]
    fn every_mutation_is_persisted_in_order() {
        let repo = FakeRepo::default();
        let mut m = SettingsManager::load(repo.clone());

        m.set_model(ModelId::Gpt4Turbo).unwrap();
        m.set_streaming(true).unwrap();
        m.set_recents_limit(3).unwrap();
        m.add_recent_prompt("a").unwrap();
        m.set_template(CommandType::Cursor, "<QUERY>!").unwrap();

        assert_eq!(*repo.saves.lock().unwrap(), 5);
        let stored = repo.stored.lock().unwrap().clone().unwrap();
        assert_eq!(stored["model"], "gpt-4-turbo");
        assert_eq!(stored["streaming"], true);
        assert_eq!(stored["recentsLimit"], 3);
        assert_eq!(stored["recentPrompts"], json!(["a"]));
        assert_eq!(stored["promptTemplates"]["cursor"], "<QUERY>!");
    }

    #[test]
    fn reload_sees_saved_state() {
        let repo = FakeRepo::default();
        let mut m = SettingsManager::load(repo.clone());
        m.set_api_key(Some("sk-1".into())).unwrap();
        m.set_template(CommandType::Selection, "mine").unwrap();
        let before = m.teardown();

        let again = SettingsManager::load(repo);
        assert_eq!(again.settings(), &before);
        assert_eq!(again.template(CommandType::Selection), "mine");
        assert_eq!(
            again.template(CommandType::Document),
            default_template(CommandType::Document)
        );
    }

    #[test]
    fn reset_returns_and_persists_default() {
        let repo = FakeRepo::default();
        let mut m = SettingsManager::load(repo.clone());
        m.set_template(CommandType::Document, "custom").unwrap();

        let restored = m.reset_template(CommandType::Document).unwrap();
        assert_eq!(restored, default_template(CommandType::Document));
        let stored = repo.stored.lock().unwrap().clone().unwrap();
        assert_eq!(
            stored["promptTemplates"]["document"],
            default_template(CommandType::Document)
        );
    }

    #[test]
    fn invalid_values_are_rejected_without_saving() {
        let repo = FakeRepo::default();
        let mut m = SettingsManager::load(repo.clone());

        let err = m.set_recents_limit(0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SettingsError>(),
            Some(&SettingsError::RecentsLimitOutOfRange(0))
        );
        assert!(m.set_model_str("gpt-9").is_err());
        assert_eq!(*repo.saves.lock().unwrap(), 0);

        m.set_model_str("gpt-4o").unwrap();
        assert_eq!(m.settings().model, ModelId::Gpt4o);
    }

    #[test]
    fn failed_save_is_reported_but_change_is_kept() {
        let repo = FakeRepo {
            fail_save: true,
            ..Default::default()
        };
        let mut m = SettingsManager::load(repo);
        assert!(m.set_streaming(true).is_err());
        assert!(m.settings().streaming);
    }

    #[test]
    fn blank_api_key_clears_it() {
        let mut m = SettingsManager::load(FakeRepo::default());
        m.set_api_key(Some("sk".into())).unwrap();
        m.set_api_key(Some("   ".into())).unwrap();
        assert_eq!(m.settings().api_key, None);
    }
}
