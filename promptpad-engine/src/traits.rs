use async_trait::async_trait;
use futures_util::stream::BoxStream;
use promptpad_core::settings::Settings;
use promptpad_core::types::CommandType;

/// Where persisted settings live (a JSON file, memory, a remote store...).
///
/// `load` returns the raw record so the caller can merge it over defaults;
/// `Ok(None)` means nothing has been persisted yet. `save` must be
/// all-or-nothing: a failed save leaves the previous record intact.
pub trait SettingsRepository: Send {
    fn load(&self) -> anyhow::Result<Option<serde_json::Value>>;
    fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub api_key: String,
    pub streaming: bool,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("prompt_len", &self.prompt.len())
            .field("api_key", &"[REDACTED]")
            .field("streaming", &self.streaming)
            .finish()
    }
}

/// Incremental reply text, in arrival order.
pub type ReplyStream = BoxStream<'static, anyhow::Result<String>>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String>;
    async fn stream(&self, req: &CompletionRequest) -> anyhow::Result<ReplyStream>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// Replace the current selection.
    Selection,
    /// Insert at the cursor.
    Cursor,
    /// Replace the whole document.
    Document,
}

impl From<CommandType> for EditTarget {
    fn from(command: CommandType) -> Self {
        match command {
            CommandType::Selection => EditTarget::Selection,
            CommandType::Cursor => EditTarget::Cursor,
            CommandType::Document => EditTarget::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditorSnapshot {
    pub selection: Option<String>,
    pub document: String,
}

#[async_trait]
pub trait DocumentEditor: Send + Sync {
    async fn snapshot(&self) -> anyhow::Result<EditorSnapshot>;

    /// Replaces `target` with `text`.
    async fn write(&self, target: EditTarget, text: &str) -> anyhow::Result<()>;

    /// Appends a streamed chunk right after what the previous `write`/`append` produced.
    async fn append(&self, target: EditTarget, chunk: &str) -> anyhow::Result<()>;
}
