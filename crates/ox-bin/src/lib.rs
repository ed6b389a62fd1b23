//! `oxvi`: load a file into the in-memory host, feed it keys, print or save
//! the result.
//!
//! Keys come either from `--keys` (replayed as one non-interactive run) or
//! from the terminal ([`interactive`]).

use anyhow::{Context, Result};
use clap::Parser;
use core_actions::{Interpreter, RunReport};
use core_model::MemoryHost;
use core_state::{BufferId, HostBuffer, NativeCommand, QuickPanelRequest};
use std::path::PathBuf;
use tracing::{info, warn};

pub mod interactive;

/// The single buffer a session edits.
pub const BUFFER: BufferId = BufferId(1);

/// CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "oxvi", version, about = "Replay vi keys against a file")]
pub struct Args {
    /// File to edit. A missing file starts empty.
    pub path: PathBuf,
    /// Keys in `<Esc>`-style notation. Without it keys are read from the terminal.
    #[arg(long, short = 'k')]
    pub keys: Option<String>,
    /// Init file of map/unmap/set lines (overrides discovery of `.oxvirc`).
    #[arg(long)]
    pub init: Option<PathBuf>,
    /// Settings file (overrides discovery of `oxvi.toml`).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the result back to the file instead of printing it.
    #[arg(long)]
    pub in_place: bool,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// One file being edited.
#[derive(Debug)]
pub struct Session {
    pub interp: Interpreter,
    pub host: MemoryHost,
    /// Malformed lines skipped in the init file.
    pub init_errors: usize,
    bells_seen: usize,
    messages_seen: usize,
    panels_seen: usize,
}

impl Session {
    pub fn open(args: &Args) -> Result<Self> {
        let config = core_config::load_from(args.config.clone())?;
        let mut interp = Interpreter::with_config(&config);
        let mut init_errors = 0;
        if let Some(path) = args.init.clone().or_else(|| config.init_path()) {
            let script = interp.load_init(&path)?;
            for error in &script.errors {
                warn!(target: "runtime", path = %path.display(), line = error.line, reason = %error.reason, "init line skipped");
            }
            init_errors = script.errors.len();
        }
        let host = MemoryHost::open(BUFFER, args.path.clone())?;
        info!(target: "runtime", path = %args.path.display(), init_errors, "session opened");
        Ok(Self {
            interp,
            host,
            init_errors,
            bells_seen: 0,
            messages_seen: 0,
            panels_seen: 0,
        })
    }

    pub fn replay(&mut self, keys: &str) -> Result<RunReport> {
        let report = self
            .interp
            .run_notation(&mut self.host, keys, None)
            .context("parsing --keys")?;
        info!(target: "runtime", ?report, "keys replayed");
        Ok(report)
    }

    /// The newest quick panel not yet taken, if one was shown since the last
    /// call. Older unanswered panels are skipped.
    pub fn take_quick_panel(&mut self) -> Option<QuickPanelRequest> {
        let panels = &self.host.ui.quick_panels;
        if panels.len() <= self.panels_seen {
            return None;
        }
        self.panels_seen = panels.len();
        panels.last().cloned()
    }

    /// Bells, status messages and quick panel items produced since the last
    /// call, one line each.
    pub fn take_feedback(&mut self) -> Vec<String> {
        let ui = &self.host.ui;
        let mut lines = Vec::new();
        if ui.bells > self.bells_seen {
            lines.push(format!("bell x{}", ui.bells - self.bells_seen));
        }
        lines.extend(ui.messages[self.messages_seen..].iter().cloned());
        for panel in &ui.quick_panels[self.panels_seen..] {
            lines.extend(panel.items.iter().cloned());
        }
        self.bells_seen = ui.bells;
        self.messages_seen = ui.messages.len();
        self.panels_seen = ui.quick_panels.len();
        for line in &lines {
            info!(target: "runtime", feedback = %line, "ui");
        }
        lines
    }

    /// Save to the opened path, or return the text to print.
    pub fn finish(&mut self, in_place: bool) -> Result<Option<String>> {
        if !in_place {
            return Ok(Some(self.host.contents()));
        }
        self.host
            .run_native(&NativeCommand::new("write"))
            .map_err(anyhow::Error::msg)?;
        Ok(None)
    }
}

/// Replay `--keys` and produce the output text.
pub fn run_keys(args: &Args, keys: &str) -> Result<(Option<String>, Vec<String>)> {
    let mut session = Session::open(args)?;
    let report = session.replay(keys)?;
    if !report.ok() {
        warn!(target: "runtime", failed = report.failed, incomplete = report.incomplete, "replay had failures");
    }
    let feedback = session.take_feedback();
    let output = session.finish(args.in_place)?;
    Ok((output, feedback))
}
