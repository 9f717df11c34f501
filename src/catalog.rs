use tracing::{debug, warn};

use crate::model::ModelDescriptor;
use crate::server::ModelServer;

const IMPLICIT_TAG: &str = ":latest";

/// Picks the model to use this session: the requested one when installed,
/// otherwise the first installed model. `None` when the catalog could not be
/// fetched or is empty.
pub async fn resolve_model<S>(requested: &str, server: &S) -> Option<String>
where
    S: ModelServer + ?Sized,
{
    let catalog = match server.list_models().await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                host = %server.host(),
                error = %format!("{err:#}"),
                "failed to list installed models"
            );
            return None;
        }
    };

    select_model(requested, &catalog_names(&catalog))
}

/// Normalized names in server order; entries without a name are skipped.
pub fn catalog_names(entries: &[ModelDescriptor]) -> Vec<&str> {
    entries
        .iter()
        .filter_map(ModelDescriptor::model_name)
        .collect()
}

pub fn select_model(requested: &str, catalog: &[&str]) -> Option<String> {
    let Some(first) = catalog.first() else {
        warn!(requested_model = %requested, "no models are installed on the server");
        return None;
    };

    if catalog.iter().any(|name| matches_requested(requested, name)) {
        debug!(model = %requested, "requested model is installed");
        return Some(requested.to_string());
    }

    warn!(
        requested_model = %requested,
        substitute_model = %first,
        "requested model is not installed; using the first available model"
    );
    Some((*first).to_string())
}

// A bare name refers to its `:latest` tag.
fn matches_requested(requested: &str, installed: &str) -> bool {
    if installed == requested {
        return true;
    }
    !requested.contains(':') && installed.strip_suffix(IMPLICIT_TAG) == Some(requested)
}
