use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::catalog::resolve_model;
use crate::config::Config;
use crate::health::check_health;
use crate::query::{self, StreamOutcome, StreamingFailure};
use crate::server::ModelServer;

/// Why requests are disabled for this session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionUnavailable {
    #[error("Ollama server at {host} is unreachable")]
    ServerUnavailable { host: String },
    #[error("no usable model is installed (requested '{requested}')")]
    NoModelAvailable { requested: String },
}

/// A session whose server answered the probe and whose model is installed.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    requested_model: String,
    checked_at: DateTime<Utc>,
}

impl Session {
    /// Runs the health probe, then model resolution. The catalog is never
    /// queried when the probe fails.
    pub async fn open<S>(server: &S, config: Config) -> Result<Self, SessionUnavailable>
    where
        S: ModelServer + ?Sized,
    {
        if check_health(server).await {
            return Err(SessionUnavailable::ServerUnavailable {
                host: server.host().to_string(),
            });
        }

        let requested_model = config.model.clone();
        let Some(model) = resolve_model(&requested_model, server).await else {
            return Err(SessionUnavailable::NoModelAvailable {
                requested: requested_model,
            });
        };

        let config = Config { model, ..config };
        info!(
            host = %config.host,
            model = %config.model,
            requested_model = %requested_model,
            "session ready"
        );
        Ok(Self {
            config,
            requested_model,
            checked_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn requested_model(&self) -> &str {
        &self.requested_model
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    pub async fn check<S, F>(
        &self,
        server: &S,
        user_text: &str,
        on_fragment: F,
    ) -> Result<StreamOutcome, StreamingFailure>
    where
        S: ModelServer + ?Sized,
        F: FnMut(&str),
    {
        query::execute(server, &self.config, user_text, on_fragment).await
    }
}
