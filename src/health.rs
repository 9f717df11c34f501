use tracing::{debug, warn};

use crate::server::ModelServer;

/// Probes the server and returns the *disabled* flag: `true` when the server
/// cannot be used this session. Failures are logged, never propagated.
pub async fn check_health<S>(server: &S) -> bool
where
    S: ModelServer + ?Sized,
{
    match server.ping().await {
        Ok(()) => {
            debug!(host = %server.host(), "ollama server is reachable");
            false
        }
        Err(err) => {
            warn!(
                host = %server.host(),
                error = %format!("{err:#}"),
                "ollama server is unreachable; disabling requests"
            );
            true
        }
    }
}
