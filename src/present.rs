use std::fmt;
use std::io::{self, Write};

use anyhow::Context;
use thiserror::Error;

use crate::config::HOST_ENV;
use crate::session::SessionUnavailable;

/// User-facing error banners; each failure kind reads differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    ServerUnreachable { host: String },
    NoModelAvailable { requested: String },
    RequestFailed { message: String },
    EmptyInput,
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerUnreachable { host } => write!(
                f,
                "Ollama is not reachable at {host}. Start the server or set {HOST_ENV}; checks are disabled."
            ),
            Self::NoModelAvailable { requested } => write!(
                f,
                "No model is available. '{requested}' is not installed and the server lists no alternatives; \
                 pull a model with `ollama pull {requested}`."
            ),
            Self::RequestFailed { message } => {
                write!(f, "Failed to get a response from Ollama: {message}")
            }
            Self::EmptyInput => write!(f, "Please enter some text to check."),
        }
    }
}

impl From<&SessionUnavailable> for Banner {
    fn from(reason: &SessionUnavailable) -> Self {
        match reason {
            SessionUnavailable::ServerUnavailable { host } => {
                Self::ServerUnreachable { host: host.clone() }
            }
            SessionUnavailable::NoModelAvailable { requested } => Self::NoModelAvailable {
                requested: requested.clone(),
            },
        }
    }
}

pub fn show_banner(out: &mut impl Write, banner: &Banner) -> io::Result<()> {
    writeln!(out, "error: {banner}")?;
    out.flush()
}

/// A failure whose banner is already on the terminal. `main` exits non-zero
/// without printing it again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{banner}")]
pub struct BannerShown {
    pub banner: Banner,
}

/// Shows `banner` and returns the error to propagate.
pub fn report_banner(out: &mut impl Write, banner: Banner) -> anyhow::Error {
    match show_banner(out, &banner).context("Failed to write error banner") {
        Ok(()) => BannerShown { banner }.into(),
        Err(err) => err,
    }
}

/// Displays a growing response. Each render receives the full text so far and
/// prints only the part not yet on screen.
#[derive(Debug)]
pub struct TerminalPresenter<W: Write> {
    out: W,
    printed: usize,
    write_error: Option<io::Error>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            write_error: None,
        }
    }

    pub fn render(&mut self, accumulated: &str) {
        if self.write_error.is_some() {
            return;
        }

        let unseen = accumulated.get(self.printed..).unwrap_or_default();
        if unseen.is_empty() {
            return;
        }

        let result = self
            .out
            .write_all(unseen.as_bytes())
            .and_then(|()| self.out.flush());
        match result {
            Ok(()) => self.printed = accumulated.len(),
            Err(err) => self.write_error = Some(err),
        }
    }

    /// Ends the current response and reports the first write error, if any.
    pub fn finish(&mut self) -> io::Result<()> {
        let printed = std::mem::take(&mut self.printed);
        if let Some(err) = self.write_error.take() {
            return Err(err);
        }
        if printed > 0 {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
