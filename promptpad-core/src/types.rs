use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::settings::SettingsError;

/// The three user-invocable commands. Each one owns exactly one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Selection,
    Cursor,
    Document,
}

impl CommandType {
    pub fn all() -> [CommandType; 3] {
        [
            CommandType::Selection,
            CommandType::Cursor,
            CommandType::Document,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Selection => "selection",
            CommandType::Cursor => "cursor",
            CommandType::Document => "document",
        }
    }

    /// Name shown in the host's command palette.
    pub fn command_name(self) -> &'static str {
        match self {
            CommandType::Selection => "Rewrite selection",
            CommandType::Cursor => "Generate content at cursor",
            CommandType::Document => "Rewrite document",
        }
    }

    /// Placeholders the default template for this command expects to be bound.
    pub fn placeholders(self) -> &'static [Placeholder] {
        match self {
            CommandType::Selection => &[Placeholder::Selection, Placeholder::Request],
            CommandType::Cursor => &[Placeholder::Query],
            CommandType::Document => &[Placeholder::Document, Placeholder::Request],
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "selection" => Ok(CommandType::Selection),
            "cursor" => Ok(CommandType::Cursor),
            "document" => Ok(CommandType::Document),
            other => Err(SettingsError::UnknownCommandType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
}

impl ModelId {
    pub fn all() -> [ModelId; 3] {
        [ModelId::Gpt35Turbo, ModelId::Gpt4Turbo, ModelId::Gpt4o]
    }

    /// Identifier sent to the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelId::Gpt35Turbo => "gpt-3.5-turbo",
            ModelId::Gpt4Turbo => "gpt-4-turbo",
            ModelId::Gpt4o => "gpt-4o",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelId::Gpt35Turbo => "GPT-3.5 Turbo",
            ModelId::Gpt4Turbo => "GPT-4 Turbo",
            ModelId::Gpt4o => "GPT-4 Omni",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ModelId::all()
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownModel(s.to_string()))
    }
}

/// `(identifier, display name)` for every supported model, in menu order.
pub fn list_models() -> Vec<(ModelId, &'static str)> {
    ModelId::all()
        .into_iter()
        .map(|m| (m, m.display_name()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    Query,
    Selection,
    Request,
    Document,
}

impl Placeholder {
    pub fn all() -> [Placeholder; 4] {
        [
            Placeholder::Query,
            Placeholder::Selection,
            Placeholder::Request,
            Placeholder::Document,
        ]
    }

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Query => "<QUERY>",
            Placeholder::Selection => "<SELECTION>",
            Placeholder::Request => "<REQUEST>",
            Placeholder::Document => "<DOCUMENT>",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_type_serializes_lowercase() {
        let json = serde_json::to_string(&CommandType::Document).unwrap();
        assert_eq!(json, "\"document\"");
        assert_eq!("cursor".parse::<CommandType>().unwrap(), CommandType::Cursor);
        assert!("paragraph".parse::<CommandType>().is_err());
    }

    #[test]
    fn model_ids_match_provider_names() {
        let json = serde_json::to_string(&ModelId::Gpt4o).unwrap();
        assert_eq!(json, "\"gpt-4o\"");
        assert_eq!(
            "gpt-3.5-turbo".parse::<ModelId>().unwrap(),
            ModelId::Gpt35Turbo
        );
        assert!(matches!(
            "gpt-2".parse::<ModelId>(),
            Err(SettingsError::UnknownModel(_))
        ));
    }

    #[test]
    fn list_models_keeps_menu_order() {
        let names: Vec<_> = list_models().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["GPT-3.5 Turbo", "GPT-4 Turbo", "GPT-4 Omni"]);
    }
}
