use promptpad_core::settings::Settings;
use promptpad_engine::traits::SettingsRepository;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Keeps the persisted record in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsRepository {
    record: Arc<Mutex<Option<Value>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: Value) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
            saves: Arc::default(),
        }
    }

    pub fn record(&self) -> Option<Value> {
        self.record.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

impl SettingsRepository for MemorySettingsRepository {
    fn load(&self) -> anyhow::Result<Option<Value>> {
        let record = self
            .record
            .lock()
            .map_err(|_| anyhow::anyhow!("settings record lock poisoned"))?;
        Ok(record.clone())
    }

    fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        // Serialize before taking the lock so a failure leaves the old record.
        let value = serde_json::to_value(settings)?;
        let mut record = self
            .record
            .lock()
            .map_err(|_| anyhow::anyhow!("settings record lock poisoned"))?;
        *record = Some(value);
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptpad_engine::manager::SettingsManager;
    use serde_json::json;

    #[test]
    fn shares_record_between_clones() {
        let repo = MemorySettingsRepository::new();
        let mut m = SettingsManager::load(repo.clone());
        m.set_recents_limit(3).unwrap();
        for p in ["a", "b", "c", "d"] {
            m.add_recent_prompt(p).unwrap();
        }

        assert_eq!(repo.save_count(), 5);
        assert_eq!(repo.record().unwrap()["recentPrompts"], json!(["b", "c", "d"]));
    }

    #[test]
    fn seeded_record_is_merged_over_defaults() {
        let repo = MemorySettingsRepository::with_record(json!({ "recentsLimit": 7 }));
        let m = SettingsManager::load(repo);
        assert_eq!(m.settings().recents_limit(), 7);
        assert!(!m.settings().streaming);
    }
}
