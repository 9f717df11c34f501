use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "tech-writer:latest";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a technical writing assistant. \
Correct the spelling, grammar and punctuation of the text you are given without changing its meaning or tone. \
Answer in markdown with exactly two sections: \
a \"Revised Text\" section containing the corrected text, \
and a \"Corrections\" section listing each change you made and why.";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const CONFIG_PATH_ENV: &str = "TECHWRITER_CONFIG";
pub const HOST_ENV: &str = "OLLAMA_HOST";
pub const MODEL_ENV: &str = "MODEL_NAME";
/// Older names, consulted only when the primary variable is unset or blank.
pub const HOST_ENV_ALIAS: &str = "OLLAMA_BASE_URL";
pub const MODEL_ENV_ALIAS: &str = "OLLAMA_MODEL";
pub const REQUEST_TIMEOUT_ENV: &str = "MODEL_TIMEOUT_SECS";

const DEFAULT_CANDIDATE_PATHS: [&str; 2] = ["techwriter.yaml", "config/techwriter.yaml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub model: String,
    pub system_prompt: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Result of [`Config::resolve`]: the effective configuration and the file
/// that supplied its file-sourced values, if any parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResolution {
    pub config: Config,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    host: Option<String>,
    model: Option<String>,
    messages: Vec<ConfigFileMessage>,
}

#[derive(Debug, Deserialize)]
struct ConfigFileMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

impl ConfigFile {
    /// Only the first message is consulted, and only when it is a non-empty
    /// system message.
    fn system_prompt(&self) -> Option<&str> {
        let first = self.messages.first()?;
        if !first.role.trim().eq_ignore_ascii_case("system") || first.content.trim().is_empty() {
            return None;
        }
        Some(first.content.as_str())
    }
}

impl Config {
    pub fn resolve(candidate_paths: &[PathBuf]) -> ConfigResolution {
        Self::resolve_with(candidate_paths, |key| env::var(key).ok())
    }

    /// Defaults, then the first candidate file that parses, then environment
    /// overrides for host and model.
    pub fn resolve_with(
        candidate_paths: &[PathBuf],
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> ConfigResolution {
        let mut config = Config::default();
        let mut source = None;
        let explicit = first_env_value(&mut get_var, &[CONFIG_PATH_ENV]).map(PathBuf::from);

        for path in candidate_paths {
            match load_config_file(path) {
                Ok(file) => {
                    config.apply_file(&file);
                    source = Some(path.clone());
                    break;
                }
                Err(err @ ConfigLoadError::Read { .. }) if is_not_found(&err) => {
                    if explicit.as_deref() == Some(path.as_path()) {
                        warn!(
                            path = %path.display(),
                            env = CONFIG_PATH_ENV,
                            "configured config file not found; trying default locations"
                        );
                    } else {
                        debug!(path = %path.display(), "config candidate not found");
                    }
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping config candidate");
                }
            }
        }

        if let Some(host) = first_env_value(&mut get_var, &[HOST_ENV, HOST_ENV_ALIAS]) {
            config.host = normalize_host(&host);
        }
        if let Some(model) = first_env_value(&mut get_var, &[MODEL_ENV, MODEL_ENV_ALIAS]) {
            config.model = model;
        }
        config.request_timeout_secs =
            parse_request_timeout_secs(get_var(REQUEST_TIMEOUT_ENV).as_deref());

        ConfigResolution { config, source }
    }

    fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(host) = non_blank(file.host.as_deref()) {
            self.host = normalize_host(host);
        }
        if let Some(model) = non_blank(file.model.as_deref()) {
            self.model = model.to_string();
        }
        if let Some(prompt) = file.system_prompt() {
            self.system_prompt = prompt.to_string();
        }
    }
}

/// Candidate config files in priority order.
pub fn candidate_paths() -> Vec<PathBuf> {
    candidate_paths_with(|key| env::var(key).ok())
}

fn candidate_paths_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(DEFAULT_CANDIDATE_PATHS.len() + 1);
    if let Some(explicit) = non_blank(get_var(CONFIG_PATH_ENV).as_deref()) {
        paths.push(PathBuf::from(explicit));
    }
    paths.extend(DEFAULT_CANDIDATE_PATHS.iter().map(PathBuf::from));
    paths
}

fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn is_not_found(err: &ConfigLoadError) -> bool {
    matches!(err, ConfigLoadError::Read { source, .. } if source.kind() == ErrorKind::NotFound)
}

/// First non-blank value among `keys`, trimmed.
fn first_env_value(
    get_var: &mut impl FnMut(&str) -> Option<String>,
    keys: &[&str],
) -> Option<String> {
    keys.iter().find_map(|key| {
        get_var(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Accepts Ollama's scheme-less `host:port` form.
fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

fn parse_request_timeout_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
}
