use promptpad_core::settings::Settings;
use std::env;

pub const API_KEY_ENV: &str = "PROMPTPAD_API_KEY";

/// Where an API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Settings,
    Environment,
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Settings => "settings",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

#[derive(Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

impl std::fmt::Debug for KeyLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLookup")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("source", &self.source)
            .finish()
    }
}

/// Settings first, then the `PROMPTPAD_API_KEY` environment variable.
pub fn resolve_api_key(settings: &Settings) -> KeyLookup {
    resolve_with(settings, env::var(API_KEY_ENV).ok())
}

fn resolve_with(settings: &Settings, from_env: Option<String>) -> KeyLookup {
    if let Some(key) = settings.api_key.clone().filter(|k| !k.trim().is_empty()) {
        return KeyLookup {
            key: Some(key),
            source: KeySource::Settings,
        };
    }

    match from_env.filter(|k| !k.trim().is_empty()) {
        Some(key) => KeyLookup {
            key: Some(key),
            source: KeySource::Environment,
        },
        None => KeyLookup {
            key: None,
            source: KeySource::None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_key_wins_over_environment() {
        let mut s = Settings::default();
        s.api_key = Some("from-settings".into());
        let l = resolve_with(&s, Some("from-env".into()));
        assert_eq!(l.key.as_deref(), Some("from-settings"));
        assert_eq!(l.source, KeySource::Settings);
    }

    #[test]
    fn falls_back_to_environment_then_none() {
        let s = Settings::default();
        let l = resolve_with(&s, Some("from-env".into()));
        assert_eq!(l.source, KeySource::Environment);

        let l = resolve_with(&s, Some("".into()));
        assert_eq!(l.key, None);
        assert_eq!(l.source.as_str(), "none");
    }

    #[test]
    fn debug_hides_key() {
        let l = KeyLookup {
            key: Some("sk-secret".into()),
            source: KeySource::Settings,
        };
        assert!(!format!("{l:?}").contains("sk-secret"));
    }
}
