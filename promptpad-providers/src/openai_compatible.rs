use crate::request::HttpRequest;
use serde::Serialize;
use serde_json::json;

#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiCompatibleChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiCompatibleChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// `POST {base_url}/chat/completions`. With `stream` set the server is asked
/// for server-sent events instead of a single JSON body.
pub fn build_chat_completions_request(
    cfg: &OpenAiCompatibleChatConfig,
    messages: &[ChatMessage],
    stream: bool,
) -> HttpRequest {
    let endpoint = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
    let payload = json!({
        "model": cfg.model,
        "messages": messages,
        "stream": stream,
    });

    let req = HttpRequest::post(endpoint)
        .with_bearer(&cfg.api_key)
        .with_json(&payload);
    if stream {
        req.with_header("Accept", "text/event-stream")
    } else {
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Body;

    fn cfg(base_url: &str) -> OpenAiCompatibleChatConfig {
        OpenAiCompatibleChatConfig {
            base_url: base_url.into(),
            api_key: "k".into(),
            model: "gpt-4o".into(),
        }
    }

    fn payload(req: &HttpRequest) -> serde_json::Value {
        match &req.body {
            Body::Json(s) => serde_json::from_str(s).unwrap(),
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[test]
    fn trailing_slash_on_base_url_is_ignored() {
        let a = build_chat_completions_request(&cfg("https://api.example.com/v1/"), &[], false);
        let b = build_chat_completions_request(&cfg("https://api.example.com/v1"), &[], false);
        assert_eq!(a.url, "https://api.example.com/v1/chat/completions");
        assert_eq!(a.url, b.url);
    }

    #[test]
    fn prompt_goes_out_as_user_message() {
        let req = build_chat_completions_request(
            &cfg("https://api.example.com/v1"),
            &[ChatMessage::user("hi")],
            false,
        );

        assert_eq!(req.header("authorization"), Some("Bearer k"));
        assert_eq!(req.header("accept"), None);
        let v = payload(&req);
        assert_eq!(v["model"], "gpt-4o");
        assert_eq!(v["stream"], false);
        assert_eq!(
            v["messages"],
            serde_json::json!([{"role": "user", "content": "hi"}])
        );
    }

    #[test]
    fn streaming_request_asks_for_event_stream() {
        let req = build_chat_completions_request(
            &cfg("https://api.example.com/v1"),
            &[ChatMessage::user("hi")],
            true,
        );
        assert_eq!(req.header("Accept"), Some("text/event-stream"));
        assert_eq!(payload(&req)["stream"], true);
    }

    #[test]
    fn config_debug_hides_key() {
        let s = format!("{:?}", cfg("https://x"));
        assert!(s.contains("[REDACTED]"));
        assert!(!s.contains("\"k\""));
    }
}
