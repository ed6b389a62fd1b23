//! Terminal key loop: raw-mode crossterm events are normalized through
//! `core-input` and fed one at a time. Prompts are collected on the status
//! line; a quick panel is answered by typing the register to paste. `<C-q>`
//! quits.

use crate::{BUFFER, Session};
use anyhow::Result;
use core_actions::KeyOutcome;
use core_events::{KeyToken, NamedKey};
use core_state::QuickPanelRequest;
use crossterm::{
    cursor,
    event::{self, Event},
    queue,
    style::Print,
    terminal::{self, ClearType},
};
use std::io::{self, Write};
use tracing::{debug, info};

struct RawMode;

impl RawMode {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read the next key the interpreter understands.
fn next_token() -> Result<KeyToken> {
    loop {
        if let Event::Key(event) = event::read()?
            && let Some(token) = core_input::token_for(&event)
        {
            return Ok(token);
        }
    }
}

pub fn run(session: &mut Session) -> Result<()> {
    let _raw = RawMode::enter()?;
    let mut out = io::stderr();
    info!(target: "runtime", "interactive loop started");
    draw_status(&mut out, session)?;
    loop {
        let token = next_token()?;
        if token == KeyToken::ctrl('q') {
            break;
        }
        let outcome = session.interp.press_key(&mut session.host, token);
        debug!(target: "runtime", ?outcome, "key");
        if outcome == KeyOutcome::Prompt {
            collect_prompt(&mut out, session)?;
        }
        if let Some(panel) = session.take_quick_panel() {
            pick_from_panel(&mut out, session, panel)?;
        }
        draw_feedback(&mut out, session)?;
        draw_status(&mut out, session)?;
    }
    queue!(out, Print("\r\n"))?;
    out.flush()?;
    Ok(())
}

/// Edit the pending prompt's text until `<CR>` or `<Esc>`. Backspace on an
/// empty line cancels, like vi.
fn collect_prompt(out: &mut impl Write, session: &mut Session) -> Result<()> {
    let Some(request) = session.host.ui.prompts.last().cloned() else {
        return Ok(());
    };
    let leader = request.kind.leader();
    let cont = request.continuation;
    let mut text = request.initial_text;
    loop {
        draw_line(out, &format!("{leader}{text}"))?;
        let token = next_token()?;
        let outcome = match token {
            KeyToken::Named(NamedKey::Enter) => {
                session.interp.on_prompt_done(&mut session.host, &cont, &text);
                return Ok(());
            }
            KeyToken::Named(NamedKey::Esc) => {
                session.interp.on_prompt_cancel(&mut session.host, &cont);
                return Ok(());
            }
            KeyToken::Named(NamedKey::Backspace) => {
                if text.pop().is_none() {
                    session.interp.on_prompt_cancel(&mut session.host, &cont);
                    return Ok(());
                }
                session.interp.on_prompt_change(&mut session.host, &cont, &text)
            }
            KeyToken::Char(c) => {
                text.push(c);
                session.interp.on_prompt_change(&mut session.host, &cont, &text)
            }
            _ => continue,
        };
        if outcome == KeyOutcome::Stale {
            return Ok(());
        }
    }
}

/// List the panel's items and paste the register whose name is typed next.
/// Any other key dismisses the panel.
fn pick_from_panel(out: &mut impl Write, session: &mut Session, panel: QuickPanelRequest) -> Result<()> {
    for item in &panel.items {
        draw_line(out, item)?;
        queue!(out, Print("\r\n"))?;
    }
    let pick = match next_token()? {
        KeyToken::Char(c) => panel
            .items
            .iter()
            .position(|item| item.chars().nth(1) == Some(c)),
        _ => None,
    };
    let outcome = session
        .interp
        .on_quick_panel_pick(&mut session.host, &panel.continuation, pick);
    debug!(target: "runtime", ?pick, ?outcome, "quick panel answered");
    Ok(())
}

fn draw_line(out: &mut impl Write, line: &str) -> Result<()> {
    queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(line)
    )?;
    out.flush()?;
    Ok(())
}

fn draw_feedback(out: &mut impl Write, session: &mut Session) -> Result<()> {
    for line in session.take_feedback() {
        draw_line(out, &line)?;
        queue!(out, Print("\r\n"))?;
    }
    Ok(())
}

fn draw_status(out: &mut impl Write, session: &Session) -> Result<()> {
    let caret = session.host.caret_position();
    let contents = session.host.contents();
    let current = contents.lines().nth(caret.line).unwrap_or("");
    let mode = session.interp.mode(BUFFER);
    draw_line(
        out,
        &format!("{mode} {}:{} | {current}", caret.line + 1, caret.byte + 1),
    )
}
