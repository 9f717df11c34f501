use std::time::{Duration, Instant};

use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::config::Config;
use crate::model::correction_exchange;
use crate::server::{ChatStreamRequest, ModelServer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub text: String,
    pub fragment_count: usize,
    pub elapsed: Duration,
}

/// A request that failed to open or broke off mid-stream. `partial` holds the
/// text delivered before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StreamingFailure {
    pub message: String,
    pub partial: String,
}

/// Sends the system prompt and `user_text` to the configured model and
/// streams the answer. `on_fragment` receives the full accumulated text after
/// every non-empty fragment. Empty fragments, including the one flagged
/// `done`, do not end the stream; only exhaustion or an error does.
pub async fn execute<S, F>(
    server: &S,
    cfg: &Config,
    user_text: &str,
    mut on_fragment: F,
) -> Result<StreamOutcome, StreamingFailure>
where
    S: ModelServer + ?Sized,
    F: FnMut(&str),
{
    let started = Instant::now();
    let request = ChatStreamRequest {
        model: cfg.model.clone(),
        messages: correction_exchange(&cfg.system_prompt, user_text),
    };
    debug!(
        model = %cfg.model,
        input_len = user_text.len(),
        "starting correction request"
    );

    let mut fragments = match server.chat_stream(request).await {
        Ok(fragments) => fragments,
        Err(err) => return Err(streaming_failure(cfg, err, String::new())),
    };

    let mut accumulated = String::new();
    let mut fragment_count = 0usize;
    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) if fragment.content.is_empty() => {
                trace!(done = fragment.done, "skipping empty fragment");
            }
            Ok(fragment) => {
                accumulated.push_str(&fragment.content);
                fragment_count += 1;
                on_fragment(&accumulated);
            }
            Err(err) => return Err(streaming_failure(cfg, err, accumulated)),
        }
    }

    let elapsed = started.elapsed();
    info!(
        model = %cfg.model,
        fragment_count,
        response_len = accumulated.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "completed correction request"
    );
    Ok(StreamOutcome {
        text: accumulated,
        fragment_count,
        elapsed,
    })
}

fn streaming_failure(cfg: &Config, err: anyhow::Error, partial: String) -> StreamingFailure {
    let message = format!("{err:#}");
    error!(
        model = %cfg.model,
        partial_len = partial.len(),
        error = %message,
        "correction request failed"
    );
    StreamingFailure { message, partial }
}

#[cfg(test)]
mod tests {
    use super::execute;
    use crate::config::Config;
    use crate::model::{ChatFragment, MessageRole};
    use crate::server::stub::{StubChunk, StubServer};

    fn test_config() -> Config {
        Config {
            model: "llama3.2".to_string(),
            system_prompt: "Correct the text.".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn delivers_cumulative_text_for_each_fragment() {
        let server = StubServer::new().with_fragments(&["He", "llo"]);
        let mut seen = Vec::new();

        let outcome = execute(&server, &test_config(), "helo", |text| seen.push(text.to_string()))
            .await
            .expect("stream should complete");

        assert_eq!(seen, vec!["He", "Hello"]);
        assert_eq!(outcome.text, "Hello");
        assert_eq!(outcome.fragment_count, 2);
    }

    #[tokio::test]
    async fn sends_system_prompt_then_user_text_to_configured_model() {
        let server = StubServer::new().with_fragments(&["ok"]);

        execute(&server, &test_config(), "teh text", |_| {})
            .await
            .expect("stream should complete");

        let requests = server.chat_requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llama3.2");
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert_eq!(requests[0].messages[0].content, "Correct the text.");
        assert_eq!(requests[0].messages[1].role, MessageRole::User);
        assert_eq!(requests[0].messages[1].content, "teh text");
    }

    #[tokio::test]
    async fn empty_and_done_fragments_do_not_end_the_stream() {
        let server = StubServer::new()
            .with_fragments(&["A", ""])
            .with_chunk(StubChunk::Fragment(ChatFragment {
                content: String::new(),
                done: true,
            }))
            .with_fragments(&["B"]);
        let mut seen = Vec::new();

        let outcome = execute(&server, &test_config(), "x", |text| seen.push(text.to_string()))
            .await
            .expect("stream should complete");

        assert_eq!(seen, vec!["A", "AB"]);
        assert_eq!(outcome.text, "AB");
        assert_eq!(outcome.fragment_count, 2);
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_partial_text_and_fails_once() {
        let server = StubServer::new()
            .with_fragments(&["Re", "vised"])
            .with_chunk(StubChunk::Error("Chat stream was interrupted: reset".to_string()))
            .with_fragments(&["never"]);
        let mut seen = Vec::new();

        let failure = execute(&server, &test_config(), "x", |text| seen.push(text.to_string()))
            .await
            .expect_err("stream should fail");

        assert_eq!(seen, vec!["Re", "Revised"]);
        assert_eq!(failure.partial, "Revised");
        assert!(failure.message.contains("interrupted"));
        assert!(!failure.partial.contains("interrupted"));
    }

    #[tokio::test]
    async fn failure_to_open_stream_delivers_nothing() {
        let server = StubServer::new().failing_chat("Ollama request failed with status 404");
        let mut calls = 0;

        let failure = execute(&server, &test_config(), "x", |_| calls += 1)
            .await
            .expect_err("stream should fail to open");

        assert_eq!(calls, 0);
        assert_eq!(failure.partial, "");
        assert!(failure.to_string().contains("404"));
    }
}
