use crate::manager::SettingsManager;
use crate::session::{CommandOutcome, CommandStage, ms};
use crate::traits::{
    CompletionRequest, DocumentEditor, EditTarget, EditorSnapshot, LlmClient, SettingsRepository,
};
use anyhow::Context;
use futures_util::StreamExt;
use promptpad_core::template::{PromptInput, bindings_for, compose};
use promptpad_core::text::clean_reply;
use promptpad_core::types::CommandType;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("nothing is selected; select some text first")]
    EmptySelection,
    #[error("no API key configured; set one in the settings")]
    MissingApiKey,
    #[error("the model returned an empty reply")]
    EmptyReply,
}

/// Runs the three editor commands against the configured model.
pub struct PromptEngine<R> {
    settings: SettingsManager<R>,
    llm: Arc<dyn LlmClient>,
    editor: Arc<dyn DocumentEditor>,

    // Used when the settings carry no key (e.g. an environment variable).
    fallback_api_key: Option<String>,
}

impl<R: SettingsRepository> PromptEngine<R> {
    pub fn new(
        settings: SettingsManager<R>,
        llm: Arc<dyn LlmClient>,
        editor: Arc<dyn DocumentEditor>,
    ) -> Self {
        Self {
            settings,
            llm,
            editor,
            fallback_api_key: None,
        }
    }

    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        self.fallback_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn settings(&self) -> &SettingsManager<R> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsManager<R> {
        &mut self.settings
    }

    pub fn into_settings(self) -> SettingsManager<R> {
        self.settings
    }

    fn api_key(&self) -> Option<String> {
        self.settings
            .settings()
            .api_key
            .clone()
            .or_else(|| self.fallback_api_key.clone())
    }

    /// Composes the prompt for `command` and applies the model's reply to the editor.
    pub async fn run_command(
        &mut self,
        command: CommandType,
        request: &str,
    ) -> anyhow::Result<CommandOutcome> {
        self.run_command_with_hook(command, request, |_stage| async {})
            .await
    }

    /// Same as `run_command`, but emits a stage hook as the command progresses.
    ///
    /// The hook is intended for UI progress and must be fast.
    pub async fn run_command_with_hook<F, Fut>(
        &mut self,
        command: CommandType,
        request: &str,
        on_stage: F,
    ) -> anyhow::Result<CommandOutcome>
    where
        F: Fn(&'static str) -> Fut,
        Fut: Future<Output = ()>,
    {
        let started = Instant::now();
        let (model, streaming) = {
            let s = self.settings.settings();
            (s.model, s.streaming)
        };
        let mut outcome = CommandOutcome::started(command, model, streaming);

        on_stage(CommandStage::Composing.label()).await;
        log::info!("running {} with {}", command.command_name(), model);

        let snapshot = self.editor.snapshot().await.context("read editor state")?;
        let input = prompt_input(command, request, snapshot)?;
        let api_key = self.api_key().ok_or(EngineError::MissingApiKey)?;

        // Recorded before the request goes out so it is kept even if the reply never arrives.
        if let Err(e) = self.settings.add_recent_prompt(request) {
            log::warn!("recent prompt not persisted: {e:#}");
        }

        outcome.prompt = compose(
            self.settings.template(command),
            &bindings_for(command, &input),
        );

        let req = CompletionRequest {
            model: model.as_str().to_string(),
            prompt: outcome.prompt.clone(),
            api_key,
            streaming,
        };
        log::debug!("completion request: {req:?}");

        outcome.stage = CommandStage::Requesting;
        on_stage(CommandStage::Requesting.label()).await;

        let target = EditTarget::from(command);
        let t0 = Instant::now();
        // Streamed chunks reach the editor as they arrive, so only buffered
        // replies go through `clean_reply`.
        let written = if streaming {
            self.stream_into_editor(&req, target, &mut outcome, &on_stage)
                .await?
        } else {
            let raw = self.llm.complete(&req).await?;
            outcome.timings.request_ms = Some(ms(t0.elapsed()));

            let reply = clean_reply(&raw);
            if reply.is_empty() {
                return Err(EngineError::EmptyReply.into());
            }
            outcome.reply = Some(reply.clone());

            outcome.stage = CommandStage::Writing;
            on_stage(CommandStage::Writing.label()).await;
            outcome.chunks = 1;
            self.editor.write(target, &reply).await
        };

        outcome.timings.total_ms = Some(ms(started.elapsed()));
        if let Err(e) = written {
            log::error!("writing reply to editor failed: {e:#}");
            outcome.stage = CommandStage::Failed;
            outcome.error = Some(e.to_string());
            return Ok(outcome);
        }

        outcome.stage = CommandStage::Done;
        on_stage(CommandStage::Done.label()).await;
        log::info!(
            "{} done in {}ms ({} chunk(s))",
            command.command_name(),
            outcome.timings.total_ms.unwrap_or_default(),
            outcome.chunks
        );
        Ok(outcome)
    }

    /// Forwards streamed chunks to the editor as they arrive.
    ///
    /// Provider errors abort the command; an editor error stops forwarding but
    /// the rest of the reply is still collected into `outcome`.
    async fn stream_into_editor<F, Fut>(
        &self,
        req: &CompletionRequest,
        target: EditTarget,
        outcome: &mut CommandOutcome,
        on_stage: &F,
    ) -> anyhow::Result<anyhow::Result<()>>
    where
        F: Fn(&'static str) -> Fut,
        Fut: Future<Output = ()>,
    {
        let t0 = Instant::now();
        let mut stream = self.llm.stream(req).await?;
        let mut reply = String::new();
        let mut written = Ok(());

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }

            if outcome.chunks == 0 {
                outcome.stage = CommandStage::Writing;
                on_stage(CommandStage::Writing.label()).await;
            }
            if written.is_ok() {
                written = if outcome.chunks == 0 {
                    self.editor.write(target, &chunk).await
                } else {
                    self.editor.append(target, &chunk).await
                };
            }

            reply.push_str(&chunk);
            outcome.chunks += 1;
        }
        outcome.timings.request_ms = Some(ms(t0.elapsed()));

        if outcome.chunks == 0 {
            return Err(EngineError::EmptyReply.into());
        }
        outcome.reply = Some(reply);
        Ok(written)
    }
}

fn prompt_input(
    command: CommandType,
    request: &str,
    snapshot: EditorSnapshot,
) -> Result<PromptInput, EngineError> {
    let request = request.to_string();
    Ok(match command {
        CommandType::Selection => {
            let selection = snapshot
                .selection
                .filter(|s| !s.trim().is_empty())
                .ok_or(EngineError::EmptySelection)?;
            PromptInput {
                request,
                selection: Some(selection),
                document: None,
            }
        }
        CommandType::Cursor => PromptInput {
            request,
            ..Default::default()
        },
        CommandType::Document => PromptInput {
            request,
            selection: None,
            document: Some(snapshot.document),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_command_requires_selected_text() {
        let snap = EditorSnapshot {
            selection: Some("  \n".into()),
            document: "doc".into(),
        };
        assert_eq!(
            prompt_input(CommandType::Selection, "r", snap),
            Err(EngineError::EmptySelection)
        );
    }

    #[test]
    fn document_command_uses_whole_document() {
        let snap = EditorSnapshot {
            selection: Some("part".into()),
            document: "# Notes".into(),
        };
        let input = prompt_input(CommandType::Document, "tidy", snap).unwrap();
        assert_eq!(input.document.as_deref(), Some("# Notes"));
        assert_eq!(input.selection, None);
        assert_eq!(input.request, "tidy");
    }
}
