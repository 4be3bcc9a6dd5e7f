use crate::template::default_template;
use crate::types::{CommandType, ModelId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const RECENTS_LIMIT_MIN: usize = 1;
pub const RECENTS_LIMIT_MAX: usize = 10;
pub const DEFAULT_RECENTS_LIMIT: usize = 5;

// Older builds persisted templates under this misspelled key.
const LEGACY_TEMPLATES_KEY: &str = "prompTemplates";

const KNOWN_KEYS: &[&str] = &[
    "apiKey",
    "model",
    "streaming",
    "recentPrompts",
    "recentsLimit",
    "promptTemplates",
    LEGACY_TEMPLATES_KEY,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("recents limit must be between 1 and 10, got {0}")]
    RecentsLimitOutOfRange(usize),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("unknown command type: {0}")]
    UnknownCommandType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub selection: String,
    pub cursor: String,
    pub document: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            selection: default_template(CommandType::Selection).to_string(),
            cursor: default_template(CommandType::Cursor).to_string(),
            document: default_template(CommandType::Document).to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn get(&self, command: CommandType) -> &str {
        match command {
            CommandType::Selection => &self.selection,
            CommandType::Cursor => &self.cursor,
            CommandType::Document => &self.document,
        }
    }

    fn slot(&mut self, command: CommandType) -> &mut String {
        match command {
            CommandType::Selection => &mut self.selection,
            CommandType::Cursor => &mut self.cursor,
            CommandType::Document => &mut self.document,
        }
    }

    fn merge_from(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else {
            log::warn!("ignoring non-object prompt templates");
            return;
        };
        for command in CommandType::all() {
            if let Some(s) = obj.get(command.as_str()).and_then(Value::as_str) {
                *self.slot(command) = s.to_string();
            }
        }
    }
}

/// The persisted plugin settings.
///
/// `recent_prompts` is ordered oldest first; the newest request is the last
/// element. Its length never exceeds `recents_limit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: ModelId,
    pub streaming: bool,
    recent_prompts: Vec<String>,
    recents_limit: usize,
    pub prompt_templates: PromptTemplates,

    // Fields written by other versions; kept so a save doesn't drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: ModelId::default(),
            streaming: false,
            recent_prompts: vec![],
            recents_limit: DEFAULT_RECENTS_LIMIT,
            prompt_templates: PromptTemplates::default(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Builds settings from a persisted record, keeping the default for any
    /// field that is missing or does not decode.
    pub fn merge_over_defaults(value: Value) -> Settings {
        let mut settings = Settings::default();

        let Value::Object(mut obj) = value else {
            log::warn!("persisted settings are not an object; using defaults");
            return settings;
        };

        if let Some(v) = field::<Option<String>>(&obj, "apiKey") {
            settings.api_key = v.filter(|k| !k.trim().is_empty());
        }
        if let Some(v) = field::<ModelId>(&obj, "model") {
            settings.model = v;
        }
        if let Some(v) = field::<bool>(&obj, "streaming") {
            settings.streaming = v;
        }
        if let Some(v) = field::<usize>(&obj, "recentsLimit") {
            settings.recents_limit = v.clamp(RECENTS_LIMIT_MIN, RECENTS_LIMIT_MAX);
        }
        if let Some(v) = field::<Vec<String>>(&obj, "recentPrompts") {
            settings.recent_prompts = v;
            settings.trim_recents();
        }

        if let Some(v) = obj.get(LEGACY_TEMPLATES_KEY) {
            settings.prompt_templates.merge_from(v);
        }
        if let Some(v) = obj.get("promptTemplates") {
            settings.prompt_templates.merge_from(v);
        }

        obj.retain(|k, _| !KNOWN_KEYS.contains(&k.as_str()));
        settings.extra = obj;
        settings
    }

    pub fn recent_prompts(&self) -> &[String] {
        &self.recent_prompts
    }

    pub fn recent_prompts_newest_first(&self) -> impl Iterator<Item = &str> {
        self.recent_prompts.iter().rev().map(String::as_str)
    }

    pub fn recents_limit(&self) -> usize {
        self.recents_limit
    }

    /// Records `text` as the newest request, dropping the oldest entries past the limit.
    pub fn add_recent_prompt(&mut self, text: impl Into<String>) {
        self.recent_prompts.push(text.into());
        self.trim_recents();
    }

    /// Changes the limit and keeps only the `limit` newest entries.
    pub fn set_recents_limit(&mut self, limit: usize) -> Result<(), SettingsError> {
        if !(RECENTS_LIMIT_MIN..=RECENTS_LIMIT_MAX).contains(&limit) {
            return Err(SettingsError::RecentsLimitOutOfRange(limit));
        }
        self.recents_limit = limit;
        self.trim_recents();
        Ok(())
    }

    fn trim_recents(&mut self) {
        if self.recent_prompts.len() > self.recents_limit {
            let start = self.recent_prompts.len() - self.recents_limit;
            self.recent_prompts.drain(..start);
        }
    }

    pub fn template(&self, command: CommandType) -> &str {
        self.prompt_templates.get(command)
    }

    pub fn set_template(&mut self, command: CommandType, value: impl Into<String>) {
        *self.prompt_templates.slot(command) = value.into();
    }

    pub fn reset_template(&mut self, command: CommandType) -> &str {
        let slot = self.prompt_templates.slot(command);
        *slot = default_template(command).to_string();
        slot
    }
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = obj.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("ignoring invalid settings field {key}: {e}");
            None
        }
    }
}
