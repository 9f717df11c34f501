pub(crate) mod http_errors;
pub(crate) mod ndjson;
pub mod ollama;
