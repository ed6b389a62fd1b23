//! Remap/init file parsing.
//!
//! One ex-style command per line:
//!
//! ```text
//! " comment
//! nnoremap <Space>w :w<CR>
//! imap jk <Esc>
//! ounmap iw
//! set noenable_surround
//! set shiftwidth=2
//! ```
//!
//! Malformed lines become [`InitError`]s; the remaining lines still load.

use anyhow::{Context, Result};
use core_events::{KeyToken, parse_notation};
use core_state::{ModeSet, SettingValue};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct InitError {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitCommand {
    Map {
        modes: ModeSet,
        lhs: Vec<KeyToken>,
        rhs: Vec<KeyToken>,
    },
    Unmap {
        modes: ModeSet,
        lhs: Vec<KeyToken>,
    },
    Set {
        name: String,
        value: SettingValue,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitScript {
    /// Parsed commands with their 1-based line numbers.
    pub commands: Vec<(usize, InitCommand)>,
    pub errors: Vec<InitError>,
}

/// Modes a `map` family command applies to, by prefix letter.
fn prefix_modes(prefix: &str) -> Option<ModeSet> {
    Some(match prefix {
        "" => ModeSet::NORMAL | ModeSet::ANY_VISUAL | ModeSet::SELECT | ModeSet::OPERATOR_PENDING,
        "n" => ModeSet::NORMAL,
        "v" => ModeSet::ANY_VISUAL | ModeSet::SELECT,
        "x" => ModeSet::ANY_VISUAL,
        "s" => ModeSet::SELECT,
        "o" => ModeSet::OPERATOR_PENDING,
        "i" => ModeSet::INSERT | ModeSet::REPLACE,
        _ => return None,
    })
}

fn keys(text: &str, side: &str) -> Result<Vec<KeyToken>, String> {
    parse_notation(text).map_err(|e| format!("bad {side} {text:?}: {e}"))
}

fn parse_set(arg: &str) -> Result<InitCommand, String> {
    let valid = |n: &str| !n.is_empty() && n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if let Some((name, value)) = arg.split_once('=') {
        if !valid(name) {
            return Err(format!("invalid option name {name:?}"));
        }
        let value = match value.parse::<i64>() {
            Ok(i) => SettingValue::Int(i),
            Err(_) => match value {
                "true" => SettingValue::Bool(true),
                "false" => SettingValue::Bool(false),
                other => SettingValue::Str(other.to_string()),
            },
        };
        return Ok(InitCommand::Set {
            name: name.to_string(),
            value,
        });
    }
    let (name, on) = match arg.strip_prefix("no") {
        Some(rest) if !rest.is_empty() => (rest, false),
        _ => (arg, true),
    };
    if !valid(name) {
        return Err(format!("invalid option name {name:?}"));
    }
    Ok(InitCommand::Set {
        name: name.to_string(),
        value: SettingValue::Bool(on),
    })
}

/// Whether `word` names a `map`/`unmap`/`set` family command.
pub fn is_init_command(word: &str) -> bool {
    if word == "set" || word == "se" {
        return true;
    }
    ["noremap", "unmap", "map"]
        .iter()
        .filter_map(|suffix| word.strip_suffix(suffix))
        .any(|prefix| prefix_modes(prefix).is_some())
}

/// Parse one line. `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<InitCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('"') {
        return Ok(None);
    }
    let line = line.strip_prefix(':').unwrap_or(line);
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim_start()),
        None => (line, ""),
    };

    if word == "set" || word == "se" {
        let mut args = rest.split_whitespace();
        let (Some(arg), None) = (args.next(), args.next()) else {
            return Err("set takes exactly one option".into());
        };
        return parse_set(arg).map(Some);
    }

    let (prefix, unmap) = if let Some(p) = word.strip_suffix("noremap") {
        (p, false)
    } else if let Some(p) = word.strip_suffix("unmap") {
        (p, true)
    } else if let Some(p) = word.strip_suffix("map") {
        (p, false)
    } else {
        return Err(format!("unknown command {word:?}"));
    };
    let modes = prefix_modes(prefix).ok_or_else(|| format!("unknown command {word:?}"))?;

    let (lhs, rhs) = match rest.split_once(char::is_whitespace) {
        Some((l, r)) => (l, r.trim()),
        None => (rest, ""),
    };
    if lhs.is_empty() {
        return Err(format!("{word} needs a key sequence"));
    }
    let lhs = keys(lhs, "lhs")?;
    if unmap {
        if !rhs.is_empty() {
            return Err(format!("trailing characters: {rhs:?}"));
        }
        return Ok(Some(InitCommand::Unmap { modes, lhs }));
    }
    if rhs.is_empty() {
        return Err(format!("{word} needs a right-hand side"));
    }
    Ok(Some(InitCommand::Map {
        modes,
        lhs,
        rhs: keys(rhs, "rhs")?,
    }))
}

/// Parse a whole init script, collecting one error per malformed line.
pub fn parse_init(text: &str) -> InitScript {
    let mut script = InitScript::default();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        match parse_line(raw) {
            Ok(Some(cmd)) => script.commands.push((line, cmd)),
            Ok(None) => {}
            Err(reason) => {
                warn!(target: "config.init", line, %reason, "init line rejected");
                script.errors.push(InitError { line, reason });
            }
        }
    }
    script
}

pub fn load_init_file(path: &Path) -> Result<InitScript> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading init file {}", path.display()))?;
    let script = parse_init(&text);
    info!(
        target: "config.init",
        path = %path.display(),
        commands = script.commands.len(),
        errors = script.errors.len(),
        "init file loaded"
    );
    Ok(script)
}
