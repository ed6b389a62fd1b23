//! Applying configuration and init scripts to an interpreter.

use crate::{Interpreter, InterpreterOptions};
use anyhow::Result;
use core_config::{Config, InitCommand, InitScript, load_init_file};
use core_events::to_notation;
use std::path::Path;
use tracing::{info, warn};

impl Interpreter {
    /// Interpreter seeded from a loaded settings file.
    pub fn with_config(config: &Config) -> Self {
        let input = &config.file.input;
        let mut interp = Self::with_options(InterpreterOptions {
            check_user_mappings: input.check_user_mappings,
            max_count: input.max_count,
        });
        for (name, value) in config.settings() {
            interp.set_default(name, value);
        }
        interp
    }

    /// Apply every parsed command of `script`. Returns how many took effect.
    pub fn apply_init(&mut self, script: &InitScript) -> usize {
        let mut applied = 0;
        for (line, cmd) in &script.commands {
            match cmd {
                InitCommand::Map { modes, lhs, rhs } => {
                    self.table.remap(lhs, *modes, rhs.clone());
                    applied += 1;
                }
                InitCommand::Unmap { modes, lhs } => {
                    if self.table.unmap(lhs, *modes) {
                        applied += 1;
                    } else {
                        warn!(target: "config.init", line, lhs = %to_notation(lhs), "unmap of a missing mapping");
                    }
                }
                InitCommand::Set { name, value } => {
                    self.set_default(name, value.clone());
                    applied += 1;
                }
            }
        }
        info!(target: "config.init", applied, errors = script.errors.len(), "init script applied");
        applied
    }

    /// Load an init file and apply it.
    pub fn load_init(&mut self, path: &Path) -> Result<InitScript> {
        let script = load_init_file(path)?;
        self.apply_init(&script);
        Ok(script)
    }
}
