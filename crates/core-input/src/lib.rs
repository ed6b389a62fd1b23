//! Terminal input adapter: crossterm key events to engine key vocabulary.
//!
//! Release events are dropped; press and auto-repeat both count as key presses.

mod key_token;

pub use key_token::{map_key_event, map_mods, token_for};
