use anyhow::{Context, Result};
use chrono::SecondsFormat;
use std::io::{self, Write};
use std::path::Path;

use crate::present::{Banner, TerminalPresenter, report_banner};
use crate::server::ModelServer;
use crate::session::Session;

/// Checks one piece of text, streaming the answer to stdout.
pub async fn check_once<S>(server: &S, session: &Session, text: &str) -> Result<()>
where
    S: ModelServer + ?Sized,
{
    let text = text.trim();
    if text.is_empty() {
        return Err(report_banner(&mut io::stderr(), Banner::EmptyInput));
    }

    let mut presenter = TerminalPresenter::new(io::stdout());
    let result = session
        .check(server, text, |accumulated| presenter.render(accumulated))
        .await;
    presenter.finish().context("Failed to write response")?;

    if let Err(failure) = result {
        return Err(report_banner(
            &mut io::stderr(),
            Banner::RequestFailed {
                message: failure.message,
            },
        ));
    }
    Ok(())
}

pub async fn run_repl<S>(server: &S, session: &Session, source: &Path) -> Result<()>
where
    S: ModelServer + ?Sized,
{
    println!("techwriter grammar and spelling check");
    println!("model: {}", session.model());
    println!("enter text to check, '/status' for connection details, or 'exit' to quit");

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read stdin")?;
        if read == 0 {
            break;
        }

        let text = input.trim();
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }
        if text.eq_ignore_ascii_case("/status") {
            print_status(session, source);
            continue;
        }

        // A failed check is reported by check_once and leaves the session usable.
        if check_once(server, session, text).await.is_ok() {
            println!();
        }
    }

    Ok(())
}

fn print_status(session: &Session, source: &Path) {
    let cfg = session.config();
    println!("host: {}", cfg.host);
    if session.model() == session.requested_model() {
        println!("model: {}", session.model());
    } else {
        println!(
            "model: {} (substituted for '{}')",
            session.model(),
            session.requested_model()
        );
    }
    println!("config: {}", source.display());
    println!(
        "server checked at: {}\n",
        session
            .checked_at()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
}
