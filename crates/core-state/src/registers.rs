//! Register storage shared by every buffer.
//!
//! Writes follow vi conventions: yanks land in `"0`, deletes shift through
//! `"1`..`"9` (or `"-` for small in-line deletes), named registers `a`-`z`
//! are replaced and `A`-`Z` append, `_` swallows everything, and `.` holds the
//! last inserted text and cannot be written directly. The unnamed register
//! always mirrors the most recent write.

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register name: {0:?}")]
    Invalid(char),
    #[error("register {0:?} is read-only")]
    ReadOnly(char),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterValue {
    pub text: String,
    /// Pasted on its own lines rather than inline.
    pub linewise: bool,
}

impl RegisterValue {
    pub fn new(text: impl Into<String>, linewise: bool) -> Self {
        Self {
            text: text.into(),
            linewise,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Registers {
    unnamed: RegisterValue,
    yank: RegisterValue,
    numbered: Vec<RegisterValue>, // "1 at index 0, length <= 9
    small_delete: RegisterValue,
    named: [RegisterValue; 26],
    last_inserted: String,
}

impl Registers {
    /// Capacity of the `"1`..`"9` delete ring.
    pub const MAX: usize = 9;

    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `c` names a register that can be read.
    pub fn is_readable(c: char) -> bool {
        c == '"' || c == '-' || c == '_' || c == '.' || c.is_ascii_digit() || c.is_ascii_alphabetic()
    }

    pub fn validate_write(c: char) -> Result<(), RegisterError> {
        if c == '.' || c.is_ascii_digit() && c != '0' {
            return Err(RegisterError::ReadOnly(c));
        }
        if Self::is_readable(c) {
            Ok(())
        } else {
            Err(RegisterError::Invalid(c))
        }
    }

    fn named_index(c: char) -> Option<usize> {
        if c.is_ascii_alphabetic() {
            Some((c.to_ascii_lowercase() as u8 - b'a') as usize)
        } else {
            None
        }
    }

    /// Store into a named slot (lowercase replace, uppercase append), returning
    /// the slot's full content.
    fn write_named(&mut self, c: char, value: RegisterValue) -> RegisterValue {
        let Some(idx) = Self::named_index(c) else {
            return value;
        };
        let slot = &mut self.named[idx];
        if c.is_ascii_uppercase() && !slot.is_empty() {
            if value.linewise && !slot.linewise && !slot.text.ends_with('\n') {
                slot.text.push('\n');
            }
            slot.text.push_str(&value.text);
            slot.linewise |= value.linewise;
        } else {
            *slot = value;
        }
        slot.clone()
    }

    pub fn write_yank(&mut self, target: Option<char>, value: RegisterValue) -> Result<(), RegisterError> {
        match target {
            Some('_') => return Ok(()),
            Some(c) if c != '"' && c != '0' => {
                Self::validate_write(c)?;
                self.unnamed = self.write_named(c, value);
            }
            _ => {
                self.yank = value.clone();
                self.unnamed = value;
            }
        }
        trace!(target: "state.registers", register = ?target, len = self.unnamed.text.len(), "yank");
        Ok(())
    }

    /// Record deleted or changed text. `small` marks a within-line charwise
    /// delete, which goes to `"-` instead of shifting the numbered ring.
    pub fn write_delete(
        &mut self,
        target: Option<char>,
        value: RegisterValue,
        small: bool,
    ) -> Result<(), RegisterError> {
        match target {
            Some('_') => return Ok(()),
            Some(c) if c != '"' => {
                Self::validate_write(c)?;
                self.unnamed = self.write_named(c, value);
            }
            _ => {
                if small {
                    self.small_delete = value.clone();
                } else {
                    self.unshift_numbered(value.clone());
                }
                self.unnamed = value;
            }
        }
        trace!(target: "state.registers", register = ?target, small, "delete");
        Ok(())
    }

    fn unshift_numbered(&mut self, value: RegisterValue) {
        if self.numbered.len() == Self::MAX {
            self.numbered.pop();
        }
        self.numbered.insert(0, value);
    }

    pub fn set_last_inserted(&mut self, text: impl Into<String>) {
        self.last_inserted = text.into();
    }

    /// Content of register `c`; `Ok(None)` when the register is empty.
    pub fn read(&self, c: char) -> Result<Option<RegisterValue>, RegisterError> {
        if !Self::is_readable(c) {
            return Err(RegisterError::Invalid(c));
        }
        let value = match c {
            '"' => self.unnamed.clone(),
            '0' => self.yank.clone(),
            '-' => self.small_delete.clone(),
            '_' => RegisterValue::default(),
            '.' => RegisterValue::new(self.last_inserted.clone(), false),
            d if d.is_ascii_digit() => {
                let idx = d as usize - '1' as usize;
                self.numbered.get(idx).cloned().unwrap_or_default()
            }
            other => Self::named_index(other)
                .map(|i| self.named[i].clone())
                .unwrap_or_default(),
        };
        Ok((!value.is_empty()).then_some(value))
    }

    /// Numbered delete ring, newest (`"1`) first.
    pub fn numbered(&self) -> &[RegisterValue] {
        &self.numbered
    }

    /// Non-empty registers for `:registers`: unnamed, numbered, named,
    /// then `-` and `.`.
    pub fn snapshot(&self) -> Vec<(char, RegisterValue)> {
        "\"0123456789abcdefghijklmnopqrstuvwxyz-."
            .chars()
            .filter_map(|c| Some((c, self.read(c).ok().flatten()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(r: &Registers, c: char) -> Option<String> {
        r.read(c).unwrap().map(|v| v.text)
    }

    #[test]
    fn yank_populates_unnamed_and_zero() {
        let mut r = Registers::new();
        r.write_yank(None, RegisterValue::new("alpha", false)).unwrap();
        assert_eq!(text(&r, '"').as_deref(), Some("alpha"));
        assert_eq!(text(&r, '0').as_deref(), Some("alpha"));
        assert!(r.numbered().is_empty());
    }

    #[test]
    fn delete_rotates_ring_capped() {
        let mut r = Registers::new();
        for i in 0..12 {
            r.write_delete(None, RegisterValue::new(format!("d{i}"), true), false)
                .unwrap();
        }
        assert_eq!(r.numbered().len(), Registers::MAX);
        assert_eq!(text(&r, '1').as_deref(), Some("d11"));
        assert_eq!(text(&r, '9').as_deref(), Some("d3"));
        assert_eq!(text(&r, '"').as_deref(), Some("d11"));
    }

    #[test]
    fn small_delete_skips_ring() {
        let mut r = Registers::new();
        r.write_delete(None, RegisterValue::new("x", false), true).unwrap();
        assert_eq!(text(&r, '-').as_deref(), Some("x"));
        assert_eq!(text(&r, '1'), None);
    }

    #[test]
    fn uppercase_appends_named() {
        let mut r = Registers::new();
        r.write_yank(Some('a'), RegisterValue::new("one", false)).unwrap();
        r.write_yank(Some('A'), RegisterValue::new("two", false)).unwrap();
        assert_eq!(text(&r, 'a').as_deref(), Some("onetwo"));
        assert_eq!(text(&r, '"').as_deref(), Some("onetwo"));
        let listed: Vec<char> = r.snapshot().into_iter().map(|(c, _)| c).collect();
        assert_eq!(listed, vec!['"', 'a']);
        // named yank leaves "0 alone
        assert_eq!(text(&r, '0'), None);
    }

    #[test]
    fn black_hole_and_read_only() {
        let mut r = Registers::new();
        r.write_delete(Some('_'), RegisterValue::new("gone", false), false)
            .unwrap();
        assert_eq!(text(&r, '"'), None);
        assert_eq!(
            r.write_yank(Some('.'), RegisterValue::new("x", false)),
            Err(RegisterError::ReadOnly('.'))
        );
        assert_eq!(r.read('!'), Err(RegisterError::Invalid('!')));
        r.set_last_inserted("typed");
        assert_eq!(text(&r, '.').as_deref(), Some("typed"));
    }
}
