use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use promptpad_engine::traits::{CompletionRequest, LlmClient, ReplyStream};
use promptpad_providers::openai_compatible::{
    ChatMessage, OpenAiCompatibleChatConfig, build_chat_completions_request,
};
use promptpad_providers::parse::{
    SseDecoder, SseEvent, parse_openai_chat_completion, parse_openai_error,
    parse_openai_stream_chunk,
};
use promptpad_providers::request::HttpRequest;
use promptpad_providers::runtime::{self, HttpResponse};
use std::collections::VecDeque;

/// Talks to any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleLlmClient {
    base_url: String,
}

impl OpenAiCompatibleLlmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn http_request(&self, req: &CompletionRequest, stream: bool) -> HttpRequest {
        let cfg = OpenAiCompatibleChatConfig {
            base_url: self.base_url.clone(),
            api_key: req.api_key.clone(),
            model: req.model.clone(),
        };
        // The composed prompt already carries the instructions; it goes out as the only message.
        let messages = [ChatMessage::user(req.prompt.clone())];
        build_chat_completions_request(&cfg, &messages, stream)
    }
}

fn status_error(resp: &HttpResponse) -> anyhow::Error {
    let detail = parse_openai_error(&resp.body)
        .unwrap_or_else(|| String::from_utf8_lossy(&resp.body).into_owned());
    anyhow::anyhow!(
        "LLM request failed: status={} body={}",
        resp.status,
        detail
    )
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatibleLlmClient {
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
        let resp = runtime::execute(&self.http_request(req, false)).await?;
        if !resp.is_success() {
            return Err(status_error(&resp));
        }
        parse_openai_chat_completion(&resp.body)
    }

    async fn stream(&self, req: &CompletionRequest) -> anyhow::Result<ReplyStream> {
        let resp = runtime::execute_streaming(&self.http_request(req, true)).await?;
        if !resp.is_success() {
            let full = resp.collect().await?;
            return Err(status_error(&full));
        }

        let state = DeltaState {
            chunks: resp.chunks,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            error: None,
            finished: false,
        };
        Ok(futures_util::stream::unfold(state, DeltaState::next_delta).boxed())
    }
}

struct DeltaState {
    chunks: BoxStream<'static, anyhow::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,

    // Deltas decoded before a failure are still delivered first.
    error: Option<anyhow::Error>,
    finished: bool,
}

impl DeltaState {
    async fn next_delta(mut self) -> Option<(anyhow::Result<String>, Self)> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Some((Ok(text), self));
            }
            if let Some(e) = self.error.take() {
                return Some((Err(e), self));
            }
            if self.finished {
                return None;
            }

            let events = match self.chunks.next().await {
                Some(Ok(bytes)) => self.decoder.push(&bytes),
                Some(Err(e)) => {
                    self.finished = true;
                    self.error = Some(e);
                    continue;
                }
                None => {
                    self.finished = true;
                    self.decoder.finish().into_iter().collect()
                }
            };

            if let Err(e) = self.absorb(events) {
                self.finished = true;
                self.error = Some(e);
            }
        }
    }

    fn absorb(&mut self, events: Vec<SseEvent>) -> anyhow::Result<()> {
        for ev in events {
            match ev {
                SseEvent::Done => {
                    self.finished = true;
                    break;
                }
                SseEvent::Data(payload) => {
                    if let Some(text) = parse_openai_stream_chunk(&payload)? {
                        self.pending.push_back(text);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn req(streaming: bool) -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o".into(),
            prompt: "Request: hi".into(),
            api_key: "sk-test".into(),
            streaming,
        }
    }

    #[tokio::test]
    async fn buffered_completion_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Request: hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"choices":[{"message":{"content":"Hello!"}}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleLlmClient::new(format!("{}/v1/", server.uri()));
        assert_eq!(client.complete(&req(false)).await.unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn error_status_surfaces_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_raw(
                r#"{"error":{"message":"Incorrect API key provided"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleLlmClient::new(server.uri());
        let err = client.complete(&req(false)).await.unwrap_err().to_string();
        assert!(err.contains("status=401"));
        assert!(err.contains("Incorrect API key provided"));

        let err = match client.stream(&req(true)).await {
            Ok(_) => panic!("expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn streamed_deltas_arrive_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"# Shopping\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" list\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("accept", "text/event-stream"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleLlmClient::new(server.uri());
        let stream = client.stream(&req(true)).await.unwrap();
        let parts: Vec<String> = stream
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(parts, vec!["# Shopping".to_string(), " list".to_string()]);
    }

    #[tokio::test]
    async fn malformed_stream_chunk_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\ndata: oops\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleLlmClient::new(server.uri());
        let mut stream = client.stream(&req(true)).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "ok");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
