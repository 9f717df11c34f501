use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::model::{Message, ModelDescriptor};
use crate::providers::http_errors::ollama_request_error;
use crate::providers::ndjson::decode_fragments;
use crate::server::{ChatStreamRequest, FragmentStream, ModelServer, ServerFuture};

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

fn api_url(host: &str, endpoint: &str) -> String {
    format!("{}/api/{}", host.trim_end_matches('/'), endpoint)
}

fn to_ollama_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        })
        .collect()
}

/// Client shared by every Ollama call. The read timeout bounds each wait for
/// bytes, so a stalled stream fails without capping a long generation.
pub fn build_client(cfg: &Config) -> Result<Client> {
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()
        .context("Failed to initialize HTTP client")
}

/// HTTP client for a single Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaServer {
    client: Client,
    host: String,
    request_timeout_secs: u64,
}

impl OllamaServer {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            host: cfg.host.clone(),
            request_timeout_secs: cfg.request_timeout_secs,
        }
    }

    async fn send(&self, request: RequestBuilder, api_url: &str) -> Result<Response> {
        let response = request.send().await.map_err(|err| {
            warn!(api_url = %api_url, error = %err, "ollama request failed");
            ollama_request_error(err, api_url, self.request_timeout_secs)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let response_body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            warn!(
                api_url = %api_url,
                status = %status,
                response_body_len = response_body.len(),
                "ollama returned non-success status"
            );
            return Err(anyhow!(
                "Ollama request to '{}' failed with status {}: {}",
                api_url,
                status,
                response_body.trim()
            ));
        }

        Ok(response)
    }

    async fn ping_server(&self) -> Result<()> {
        let api_url = api_url(&self.host, "version");
        debug!(api_url = %api_url, "probing ollama server");
        let request = self
            .client
            .get(&api_url)
            .timeout(Duration::from_secs(self.request_timeout_secs));
        self.send(request, &api_url).await?;
        Ok(())
    }

    async fn fetch_models(&self) -> Result<Vec<ModelDescriptor>> {
        let api_url = api_url(&self.host, "tags");
        let request = self
            .client
            .get(&api_url)
            .timeout(Duration::from_secs(self.request_timeout_secs));
        let parsed: OllamaTagsResponse = self
            .send(request, &api_url)
            .await?
            .json()
            .await
            .context("Failed to parse model listing response")?;
        debug!(
            api_url = %api_url,
            model_count = parsed.models.len(),
            "received ollama model listing"
        );
        Ok(parsed.models)
    }

    /// The chat request carries no overall timeout, only the client's per-read
    /// one, so a long answer may stream for longer than the probe timeout.
    async fn open_chat_stream(&self, request: ChatStreamRequest) -> Result<FragmentStream<'static>> {
        let api_url = api_url(&self.host, "chat");
        let body = OllamaChatRequest {
            model: request.model,
            stream: true,
            messages: to_ollama_messages(&request.messages),
        };
        debug!(
            api_url = %api_url,
            model = %body.model,
            message_count = body.messages.len(),
            "sending ollama chat request"
        );

        let response = self
            .send(self.client.post(&api_url).json(&body), &api_url)
            .await?;
        Ok(Box::pin(decode_fragments(Box::pin(response.bytes_stream()))))
    }
}

impl ModelServer for OllamaServer {
    fn host(&self) -> &str {
        &self.host
    }

    fn ping<'a>(&'a self) -> ServerFuture<'a, ()> {
        Box::pin(self.ping_server())
    }

    fn list_models<'a>(&'a self) -> ServerFuture<'a, Vec<ModelDescriptor>> {
        Box::pin(self.fetch_models())
    }

    fn chat_stream<'a>(&'a self, request: ChatStreamRequest) -> ServerFuture<'a, FragmentStream<'a>> {
        Box::pin(async move {
            let stream: FragmentStream<'a> = self.open_chat_stream(request).await?;
            Ok(stream)
        })
    }
}
