pub mod catalog;
pub mod config;
pub mod health;
pub mod logging;
pub mod model;
pub mod present;
pub mod providers;
pub mod query;
pub mod repl;
pub mod server;
pub mod session;

use anyhow::{Context, Result, bail};
use std::env;
use std::io::{self, IsTerminal, Read};
use tracing::{error, info};

use config::{CONFIG_PATH_ENV, Config};
use present::{Banner, report_banner};
use providers::ollama::{OllamaServer, build_client};
use repl::{check_once, run_repl};
use session::Session;

pub async fn run() -> Result<()> {
    let candidates = config::candidate_paths();
    let resolution = Config::resolve(&candidates);
    let Some(source) = resolution.source else {
        error!(
            candidates = ?candidates,
            "no configuration file found; refusing to start"
        );
        bail!(
            "No configuration file found (looked in {}). Create one or set {}.",
            candidates
                .iter()
                .map(|path| format!("'{}'", path.display()))
                .collect::<Vec<_>>()
                .join(", "),
            CONFIG_PATH_ENV
        );
    };

    let cfg = resolution.config;
    info!(
        host = %cfg.host,
        model = %cfg.model,
        source = %source.display(),
        request_timeout_secs = cfg.request_timeout_secs,
        "loaded runtime configuration"
    );

    let client = build_client(&cfg)?;
    let server = OllamaServer::new(client, &cfg);

    let session = match Session::open(&server, cfg).await {
        Ok(session) => session,
        Err(reason) => return Err(report_banner(&mut io::stderr(), Banner::from(&reason))),
    };

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        return check_once(&server, &session, &args.join(" ")).await;
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut text = String::new();
        stdin
            .lock()
            .read_to_string(&mut text)
            .context("Failed to read text from stdin")?;
        return check_once(&server, &session, &text).await;
    }

    run_repl(&server, &session, &source).await
}
