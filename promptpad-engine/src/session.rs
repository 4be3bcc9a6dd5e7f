use promptpad_core::types::{CommandType, ModelId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStage {
    Composing,
    Requesting,
    Writing,
    Done,
    Failed,
}

impl CommandStage {
    // A stable label for UI display; intentionally not derived from `Debug`.
    pub fn label(self) -> &'static str {
        match self {
            CommandStage::Composing => "composing",
            CommandStage::Requesting => "requesting",
            CommandStage::Writing => "writing",
            CommandStage::Done => "done",
            CommandStage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTimings {
    pub request_ms: Option<u64>,
    pub total_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub stage: CommandStage,
    pub command: CommandType,
    pub model: ModelId,
    pub prompt: String,

    // Kept even when writing to the editor fails so the text is recoverable.
    pub reply: Option<String>,
    pub streamed: bool,
    pub chunks: usize,
    pub timings: CommandTimings,
    pub error: Option<String>,
}

impl CommandOutcome {
    pub fn started(command: CommandType, model: ModelId, streamed: bool) -> Self {
        Self {
            stage: CommandStage::Composing,
            command,
            model,
            prompt: String::new(),
            reply: None,
            streamed,
            chunks: 0,
            timings: CommandTimings::default(),
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == CommandStage::Done
    }
}

pub fn ms(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}
