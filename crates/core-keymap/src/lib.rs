//! core-keymap: per-mode mapping tables over canonical key tokens.
//!
//! Built-in commands and user remaps live in separate tries per mode. A lookup
//! walks the keys typed since the last mapping boundary:
//! - a strict prefix of a longer mapping is `Incomplete` (keep buffering),
//! - a complete walk ending on a mapping resolves it,
//! - a walk that falls off the trie resolves the longest mapping it passed,
//!   reporting how many keys that mapping consumed so the caller re-feeds the
//!   rest,
//! - otherwise the keys are `Missing`.
//!
//! User remaps are tried first when enabled; their expansion is handed back to
//! the interpreter to replay with user lookups disabled.

use core_events::KeyToken;
use core_state::{CommandDef, Mode, ModeSet, SessionState};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::{debug, trace};

mod builtins;

pub use builtins::register_builtins;

/// Modes that own a mapping table.
pub const MAPPED_MODES: [Mode; 8] = [
    Mode::Normal,
    Mode::Insert,
    Mode::Visual,
    Mode::VisualLine,
    Mode::VisualBlock,
    Mode::Select,
    Mode::Replace,
    Mode::OperatorPending,
];

// -------------------------------------------------------------------------------------------------
// Trie
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone)]
struct Edge {
    key: KeyToken,
    next: usize,
}

#[derive(Debug, Clone)]
struct Node<T> {
    terminal: Option<T>,
    edges: SmallVec<[Edge; 4]>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            terminal: None,
            edges: SmallVec::new(),
        }
    }
}

/// Outcome of walking one trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walk<'a, T> {
    /// `consumed` leading keys form a mapping.
    Matched { consumed: usize, target: &'a T },
    /// The keys are a strict prefix of at least one longer mapping.
    NeedMore,
    NoMatch,
}

#[derive(Debug, Clone)]
pub struct MappingTrie<T> {
    nodes: Vec<Node<T>>,
    len: usize,
}

impl<T> Default for MappingTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MappingTrie<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            len: 0,
        }
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add or replace the mapping for `seq`, returning the replaced target.
    pub fn insert(&mut self, seq: &[KeyToken], target: T) -> Option<T> {
        let mut cur = 0usize;
        for key in seq {
            let next = if let Some(e) = self.nodes[cur].edges.iter().find(|e| e.key == *key) {
                e.next
            } else {
                let new_idx = self.nodes.len();
                self.nodes.push(Node::new());
                self.nodes[cur].edges.push(Edge {
                    key: key.clone(),
                    next: new_idx,
                });
                new_idx
            };
            cur = next;
        }
        let old = self.nodes[cur].terminal.replace(target);
        if old.is_some() {
            trace!(target: "keymap.resolve", node = cur, "terminal_override");
        } else {
            self.len += 1;
        }
        old
    }

    /// Remove the mapping for exactly `seq`. Interior nodes stay; an empty
    /// branch resolves as `NoMatch` once its last terminal is gone.
    pub fn remove(&mut self, seq: &[KeyToken]) -> Option<T> {
        let node = self.find(seq)?;
        let old = self.nodes[node].terminal.take();
        if old.is_some() {
            self.len -= 1;
        }
        old
    }

    fn find(&self, seq: &[KeyToken]) -> Option<usize> {
        let mut cur = 0usize;
        for key in seq {
            cur = self.nodes[cur].edges.iter().find(|e| e.key == *key)?.next;
        }
        Some(cur)
    }

    /// Whether any mapping continues past `node`.
    fn has_live_branch(&self, node: usize) -> bool {
        self.nodes[node]
            .edges
            .iter()
            .any(|e| self.nodes[e.next].terminal.is_some() || self.has_live_branch(e.next))
    }

    pub fn get(&self, seq: &[KeyToken]) -> Option<&T> {
        self.find(seq).and_then(|n| self.nodes[n].terminal.as_ref())
    }

    pub fn walk(&self, keys: &[KeyToken]) -> Walk<'_, T> {
        if keys.is_empty() {
            return Walk::NoMatch;
        }
        let mut node = 0usize;
        let mut last_terminal: Option<(usize, usize)> = None; // (consumed, node)
        let mut walked_all = true;
        for (i, key) in keys.iter().enumerate() {
            match self.nodes[node].edges.iter().find(|e| e.key == *key) {
                Some(edge) => {
                    node = edge.next;
                    trace!(target: "keymap.resolve", step = i, key = %key, node, "advance");
                    if self.nodes[node].terminal.is_some() {
                        last_terminal = Some((i + 1, node));
                    }
                }
                None => {
                    walked_all = false;
                    break;
                }
            }
        }
        if walked_all && self.has_live_branch(node) {
            return Walk::NeedMore;
        }
        match last_terminal {
            Some((consumed, n)) => match self.nodes[n].terminal.as_ref() {
                Some(target) => Walk::Matched { consumed, target },
                None => Walk::NoMatch,
            },
            None => Walk::NoMatch,
        }
    }

    /// All mappings as (sequence, target), in insertion-independent trie order.
    pub fn entries(&self) -> Vec<(Vec<KeyToken>, &T)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, Vec<KeyToken>)> = vec![(0, Vec::new())];
        while let Some((node, prefix)) = stack.pop() {
            if let Some(t) = self.nodes[node].terminal.as_ref() {
                out.push((prefix.clone(), t));
            }
            for e in self.nodes[node].edges.iter().rev() {
                let mut seq = prefix.clone();
                seq.push(e.key.clone());
                stack.push((e.next, seq));
            }
        }
        out
    }
}

// -------------------------------------------------------------------------------------------------
// Mapping table
// -------------------------------------------------------------------------------------------------

/// What a resolved sequence maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Command(CommandDef),
    /// A user remap's right-hand side, replayed through the interpreter.
    Expansion(Vec<KeyToken>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        target: Target,
        /// Leading keys of the partial sequence the mapping consumed; the
        /// caller re-feeds the rest.
        consumed: usize,
        user: bool,
    },
    Incomplete,
    Missing,
}

#[derive(Debug, Default)]
pub struct MappingTable {
    builtin: HashMap<Mode, MappingTrie<CommandDef>>,
    user: HashMap<Mode, MappingTrie<Vec<KeyToken>>>,
}

impl MappingTable {
    /// An empty table; see [`MappingTable::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The table with every built-in command registered.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        register_builtins(&mut table);
        debug!(
            target: "keymap.resolve",
            normal = table.builtin.get(&Mode::Normal).map_or(0, MappingTrie::len),
            "builtins registered"
        );
        table
    }

    /// Register a built-in command for every mode in `modes`.
    pub fn register(&mut self, seq: &[KeyToken], modes: ModeSet, def: CommandDef) {
        for mode in MAPPED_MODES.iter().filter(|m| modes.contains_mode(**m)) {
            self.builtin
                .entry(*mode)
                .or_default()
                .insert(seq, def.clone());
        }
    }

    /// Add a user remap `lhs -> rhs` in `modes`.
    pub fn remap(&mut self, lhs: &[KeyToken], modes: ModeSet, rhs: Vec<KeyToken>) {
        debug!(
            target: "keymap.remap",
            lhs = %core_events::to_notation(lhs),
            rhs = %core_events::to_notation(&rhs),
            modes = ?modes,
            "remap"
        );
        for mode in MAPPED_MODES.iter().filter(|m| modes.contains_mode(**m)) {
            self.user.entry(*mode).or_default().insert(lhs, rhs.clone());
        }
    }

    /// Remove user remaps for `lhs`. Returns whether any mode had one.
    pub fn unmap(&mut self, lhs: &[KeyToken], modes: ModeSet) -> bool {
        let mut removed = false;
        for mode in MAPPED_MODES.iter().filter(|m| modes.contains_mode(**m)) {
            if let Some(trie) = self.user.get_mut(mode) {
                removed |= trie.remove(lhs).is_some();
            }
        }
        debug!(target: "keymap.remap", lhs = %core_events::to_notation(lhs), removed, "unmap");
        removed
    }

    pub fn user_remaps(&self, mode: Mode) -> Vec<(Vec<KeyToken>, Vec<KeyToken>)> {
        self.user
            .get(&mode)
            .map(|t| {
                t.entries()
                    .into_iter()
                    .map(|(lhs, rhs)| (lhs, rhs.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn builtin(&self, mode: Mode, seq: &[KeyToken]) -> Option<&CommandDef> {
        self.builtin.get(&mode)?.get(seq)
    }

    /// Resolve `keys` for `mode`. User remaps are consulted first when
    /// `check_user` is set and the session has not disabled them.
    pub fn resolve_keys(&self, mode: Mode, keys: &[KeyToken], check_user: bool) -> Resolution {
        if check_user && let Some(user) = self.user.get(&mode) {
            match user.walk(keys) {
                Walk::Matched { consumed, target } => {
                    trace!(target: "keymap.resolve", %mode, consumed, "user mapping");
                    return Resolution::Resolved {
                        target: Target::Expansion(target.clone()),
                        consumed,
                        user: true,
                    };
                }
                Walk::NeedMore => return Resolution::Incomplete,
                Walk::NoMatch => {}
            }
        }
        let Some(builtin) = self.builtin.get(&mode) else {
            return Resolution::Missing;
        };
        match builtin.walk(keys) {
            Walk::Matched { consumed, target } => Resolution::Resolved {
                target: Target::Command(target.clone()),
                consumed,
                user: false,
            },
            Walk::NeedMore => Resolution::Incomplete,
            Walk::NoMatch => Resolution::Missing,
        }
    }

    /// Resolve the session's partial sequence in its current mode.
    pub fn resolve(&self, state: &SessionState, check_user_mappings: bool) -> Resolution {
        self.resolve_keys(
            state.mode,
            &state.partial_sequence,
            check_user_mappings && state.user_mappings_enabled,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::parse_notation;
    use core_state::{BufferId, MotionKind, OperatorKind};
    use pretty_assertions::assert_eq;

    fn keys(s: &str) -> Vec<KeyToken> {
        parse_notation(s).unwrap()
    }

    fn name_of(res: &Resolution) -> Option<&'static str> {
        match res {
            Resolution::Resolved {
                target: Target::Command(def),
                ..
            } => Some(def.name()),
            _ => None,
        }
    }

    #[test]
    fn single_key_match() {
        let mut trie = MappingTrie::new();
        trie.insert(&keys("w"), 1);
        assert_eq!(
            trie.walk(&keys("w")),
            Walk::Matched {
                consumed: 1,
                target: &1
            }
        );
        assert_eq!(trie.walk(&keys("z")), Walk::NoMatch);
    }

    #[test]
    fn prefix_of_longer_mapping_needs_more() {
        let mut trie = MappingTrie::new();
        trie.insert(&keys("d"), 1);
        trie.insert(&keys("ds"), 2);
        assert_eq!(trie.walk(&keys("d")), Walk::NeedMore);
        assert_eq!(
            trie.walk(&keys("ds")),
            Walk::Matched {
                consumed: 2,
                target: &2
            }
        );
        // falling off after a terminal resolves the shorter mapping
        assert_eq!(
            trie.walk(&keys("dw")),
            Walk::Matched {
                consumed: 1,
                target: &1
            }
        );
    }

    #[test]
    fn removed_branch_stops_being_a_prefix() {
        let mut trie = MappingTrie::new();
        trie.insert(&keys("j"), 1);
        trie.insert(&keys("jk"), 2);
        assert_eq!(trie.remove(&keys("jk")), Some(2));
        assert_eq!(trie.len(), 1);
        assert_eq!(
            trie.walk(&keys("j")),
            Walk::Matched {
                consumed: 1,
                target: &1
            }
        );
        assert_eq!(trie.remove(&keys("x")), None);
    }

    #[test]
    fn insert_replaces_and_lists() {
        let mut trie = MappingTrie::new();
        assert_eq!(trie.insert(&keys("<C-w>h"), 'a'), None);
        assert_eq!(trie.insert(&keys("<C-w>h"), 'b'), Some('a'));
        let entries = trie.entries();
        assert_eq!(entries, vec![(keys("<C-w>h"), &'b')]);
    }

    #[test]
    fn builtins_resolve_per_mode() {
        let table = MappingTable::with_builtins();
        let w = table.resolve_keys(Mode::Normal, &keys("w"), true);
        assert_eq!(name_of(&w), Some("word-forward"));
        assert_eq!(
            table.resolve_keys(Mode::Normal, &keys("g"), true),
            Resolution::Incomplete
        );
        assert_eq!(
            name_of(&table.resolve_keys(Mode::Normal, &keys("gg"), true)),
            Some("goto-first-line")
        );
        // text objects only exist after an operator or in visual modes
        match table.resolve_keys(Mode::Normal, &keys("iw"), true) {
            res @ Resolution::Resolved { consumed: 1, .. } => {
                assert_eq!(name_of(&res), Some("insert"))
            }
            other => panic!("expected insert, got {:?}", other),
        }
        assert_eq!(
            name_of(&table.resolve_keys(Mode::OperatorPending, &keys("iw"), true)),
            Some("inner-word")
        );
        assert_eq!(
            table.resolve_keys(Mode::Normal, &keys("<F9>"), true),
            Resolution::Missing
        );
    }

    #[test]
    fn operator_then_motion_falls_back_to_operator() {
        let table = MappingTable::with_builtins();
        match table.resolve_keys(Mode::Normal, &keys("dw"), true) {
            Resolution::Resolved {
                target: Target::Command(CommandDef::Operator { op, .. }),
                consumed,
                ..
            } => {
                assert_eq!(op, OperatorKind::Delete);
                assert_eq!(consumed, 1);
            }
            other => panic!("expected delete operator, got {:?}", other),
        }
        match table.resolve_keys(Mode::OperatorPending, &keys("d"), true) {
            Resolution::Resolved {
                target:
                    Target::Command(CommandDef::Motion {
                        motion: MotionKind::CurrentLine { key },
                        ..
                    }),
                ..
            } => assert_eq!(key, "d"),
            other => panic!("expected current-line motion, got {:?}", other),
        }
    }

    #[test]
    fn user_remap_wins_and_can_be_disabled() {
        let mut table = MappingTable::with_builtins();
        table.remap(&keys("j"), ModeSet::NORMAL, keys("gg"));
        assert_eq!(
            table.resolve_keys(Mode::Normal, &keys("j"), true),
            Resolution::Resolved {
                target: Target::Expansion(keys("gg")),
                consumed: 1,
                user: true,
            }
        );
        assert_eq!(
            name_of(&table.resolve_keys(Mode::Normal, &keys("j"), false)),
            Some("down")
        );
        let mut state = SessionState::new(BufferId(0));
        state.partial_sequence = keys("j");
        state.user_mappings_enabled = false;
        assert_eq!(name_of(&table.resolve(&state, true)), Some("down"));
        assert!(table.unmap(&keys("j"), ModeSet::NORMAL));
        assert!(!table.unmap(&keys("j"), ModeSet::NORMAL));
        assert!(table.user_remaps(Mode::Normal).is_empty());
    }

    #[test]
    fn insert_remap_prefix_is_incomplete() {
        let mut table = MappingTable::with_builtins();
        table.remap(&keys("jk"), ModeSet::INSERT, keys("<Esc>"));
        assert_eq!(
            table.resolve_keys(Mode::Insert, &keys("j"), true),
            Resolution::Incomplete
        );
        assert_eq!(
            table.resolve_keys(Mode::Insert, &keys("jx"), true),
            Resolution::Missing
        );
        assert_eq!(
            table.user_remaps(Mode::Insert),
            vec![(keys("jk"), keys("<Esc>"))]
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn seq() -> impl Strategy<Value = Vec<KeyToken>> {
            proptest::collection::vec(proptest::char::range('a', 'd').prop_map(KeyToken::Char), 1..5)
        }

        fn trie_of(seqs: &[Vec<KeyToken>]) -> MappingTrie<usize> {
            let mut trie = MappingTrie::new();
            for (i, s) in seqs.iter().enumerate() {
                trie.insert(s, i);
            }
            trie
        }

        proptest! {
            #[test]
            fn walk_matches_a_mapped_prefix_of_the_input(
                seqs in proptest::collection::vec(seq(), 0..8),
                input in seq(),
            ) {
                let trie = trie_of(&seqs);
                if let Walk::Matched { consumed, target } = trie.walk(&input) {
                    prop_assert!(consumed >= 1 && consumed <= input.len());
                    prop_assert_eq!(trie.get(&input[..consumed]), Some(target));
                }
            }

            #[test]
            fn insert_then_remove_restores_the_trie(
                seqs in proptest::collection::vec(seq(), 0..8),
                extra in seq(),
                input in seq(),
            ) {
                let mut trie = trie_of(&seqs);
                prop_assume!(trie.get(&extra).is_none());
                let before_entries: Vec<(Vec<KeyToken>, usize)> =
                    trie.entries().into_iter().map(|(k, v)| (k, *v)).collect();
                let before_walk = format!("{:?}", trie.walk(&input));
                let before_len = trie.len();

                prop_assert_eq!(trie.insert(&extra, usize::MAX), None);
                prop_assert_eq!(trie.remove(&extra), Some(usize::MAX));

                let after_entries: Vec<(Vec<KeyToken>, usize)> =
                    trie.entries().into_iter().map(|(k, v)| (k, *v)).collect();
                prop_assert_eq!(before_entries, after_entries);
                prop_assert_eq!(before_walk, format!("{:?}", trie.walk(&input)));
                prop_assert_eq!(before_len, trie.len());
            }
        }
    }
}
