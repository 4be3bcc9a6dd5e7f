use crate::request::{Body, HttpRequest};
use anyhow::Context;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BUFFERED_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct HttpStreamResponse {
    pub status: u16,
    pub chunks: BoxStream<'static, anyhow::Result<Vec<u8>>>,
}

impl std::fmt::Debug for HttpStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HttpStreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the remaining body, e.g. to report an error payload.
    pub async fn collect(mut self) -> anyhow::Result<HttpResponse> {
        let mut body = vec![];
        while let Some(chunk) = self.chunks.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(HttpResponse {
            status: self.status,
            body,
        })
    }
}

/// Sends `req` and buffers the whole response body.
pub async fn execute(req: &HttpRequest) -> anyhow::Result<HttpResponse> {
    let resp = send(req, Some(BUFFERED_TIMEOUT)).await?;
    let status = resp.status().as_u16();
    let body = resp
        .bytes()
        .await
        .context("failed reading response body")?
        .to_vec();

    Ok(HttpResponse { status, body })
}

/// Like [`execute`], but hands back the body as it arrives.
///
/// Only the connect phase is bounded; a long answer may legitimately take
/// minutes to stream.
pub async fn execute_streaming(req: &HttpRequest) -> anyhow::Result<HttpStreamResponse> {
    let resp = send(req, None).await?;
    let status = resp.status().as_u16();
    let chunks = resp
        .bytes_stream()
        .map(|r| r.map(|b| b.to_vec()).context("failed reading response chunk"))
        .boxed();

    Ok(HttpStreamResponse { status, chunks })
}

async fn send(req: &HttpRequest, total: Option<Duration>) -> anyhow::Result<reqwest::Response> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if let Some(total) = total {
        builder = builder.timeout(total);
    }
    let client = builder.build().context("build http client")?;

    let mut headers = HeaderMap::new();
    for (k, v) in &req.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name: {k}"))?;
        let value =
            HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
        headers.insert(name, value);
    }

    let mut request = client.post(&req.url).headers(headers);
    if let Body::Json(s) = &req.body {
        request = request.body(s.clone());
    }

    log::debug!("sending {req:?}");
    request
        .send()
        .await
        .with_context(|| format!("POST {} failed", req.url))
}
