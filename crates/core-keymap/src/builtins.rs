//! The built-in command set, registered as data.

use crate::MappingTable;
use core_events::parse_notation;
use core_state::{
    ActionKind, Caps, CharSearch, CommandDef, InputSpec, InsertAt, Mode, ModeSet, MotionKind,
    OperatorKind, PromptKind, ScrollAlign,
};
use core_text::text_object::{ObjectScope, TextObjectKind};
use tracing::warn;

fn map(table: &mut MappingTable, seq: &str, modes: ModeSet, def: CommandDef) {
    match parse_notation(seq) {
        Ok(keys) => table.register(&keys, modes, def),
        Err(error) => warn!(target: "keymap.resolve", seq, %error, "bad builtin sequence"),
    }
}

fn motion(table: &mut MappingTable, seqs: &[&str], name: &'static str, kind: MotionKind) {
    let def = CommandDef::motion(name, kind);
    let modes = def.modes();
    for seq in seqs {
        map(table, seq, modes, def.clone());
    }
}

fn action(table: &mut MappingTable, seq: &str, caps: Caps, kind: ActionKind) {
    let modes = caps.modes;
    map(table, seq, modes, CommandDef::action(caps, kind));
}

fn find(forward: bool, till: bool) -> MotionKind {
    MotionKind::FindChar(CharSearch {
        forward,
        till,
        target: '\0',
    })
}

const NORMAL: ModeSet = ModeSet::NORMAL;
const VISUAL: ModeSet = ModeSet::ANY_VISUAL;
const TYPING: ModeSet = ModeSet::INSERT.union(ModeSet::REPLACE);

/// Register every built-in command into `table`.
pub fn register_builtins(table: &mut MappingTable) {
    register_motions(table);
    register_objects(table);
    register_operators(table);
    register_normal_actions(table);
    register_visual_actions(table);
    register_typing_actions(table);
}

fn register_motions(t: &mut MappingTable) {
    use MotionKind::*;
    motion(t, &["h"], "left", Left { wrap: false });
    motion(t, &["<BS>"], "left-wrap", Left { wrap: true });
    motion(t, &["l"], "right", Right { wrap: false });
    motion(t, &["<Space>"], "right-wrap", Right { wrap: true });
    motion(t, &["j", "<C-n>"], "down", Down);
    motion(t, &["k", "<C-p>"], "up", Up);
    motion(t, &["w"], "word-forward", WordForward { big: false });
    motion(t, &["W"], "big-word-forward", WordForward { big: true });
    motion(t, &["b"], "word-backward", WordBackward { big: false });
    motion(t, &["B"], "big-word-backward", WordBackward { big: true });
    motion(t, &["e"], "word-end", WordEnd { big: false });
    motion(t, &["E"], "big-word-end", WordEnd { big: true });
    motion(t, &["0"], "line-start", LineStart);
    motion(t, &["^"], "first-non-blank", FirstNonBlank);
    motion(t, &["$"], "line-end", LineEnd);
    motion(t, &["|"], "column", Column);
    motion(t, &["_"], "first-non-blank-line", FirstNonBlankDown { skip_current: false });
    motion(t, &["+", "<CR>"], "next-line-start", FirstNonBlankDown { skip_current: true });
    motion(t, &["-"], "previous-line-start", FirstNonBlankUp);
    motion(t, &["gg"], "goto-first-line", GotoLine { default_last: false });
    motion(t, &["G"], "goto-last-line", GotoLine { default_last: true });
    motion(t, &["f"], "find-forward", find(true, false));
    motion(t, &["F"], "find-backward", find(false, false));
    motion(t, &["t"], "till-forward", find(true, true));
    motion(t, &["T"], "till-backward", find(false, true));
    motion(t, &[";"], "repeat-find", RepeatCharSearch { reverse: false });
    motion(t, &[","], "repeat-find-reverse", RepeatCharSearch { reverse: true });
    motion(t, &["%"], "match-pair", MatchPair);
    motion(t, &["}"], "paragraph-forward", ParagraphForward);
    motion(t, &["{"], "paragraph-backward", ParagraphBackward);
    motion(t, &["H"], "screen-top", ScreenTop);
    motion(t, &["M"], "screen-middle", ScreenMiddle);
    motion(t, &["L"], "screen-bottom", ScreenBottom);
    motion(t, &["<C-d>"], "half-page-down", HalfPageDown);
    motion(t, &["<C-u>"], "half-page-up", HalfPageUp);
    motion(t, &["n"], "search-next", SearchNext { reverse: false });
    motion(t, &["N"], "search-previous", SearchNext { reverse: true });
    motion(t, &["*"], "search-word-forward", SearchWord { forward: true });
    motion(t, &["#"], "search-word-backward", SearchWord { forward: false });
    for (seq, forward) in [("/", true), ("?", false)] {
        let name = if forward { "search-forward" } else { "search-backward" };
        motion(
            t,
            &[seq],
            name,
            Search {
                forward,
                pattern: String::new(),
            },
        );
    }
    motion(t, &["`"], "mark-jump", MarkJump { mark: '\0', linewise: false });
    motion(t, &["'"], "mark-jump-line", MarkJump { mark: '\0', linewise: true });

    // Arrow keys also move the caret in Select, Insert and Replace.
    let arrows = ModeSet::MOTION | ModeSet::SELECT | TYPING;
    for (seq, name, kind) in [
        ("<Left>", "left", Left { wrap: false }),
        ("<Right>", "right", Right { wrap: false }),
        ("<Up>", "up", Up),
        ("<Down>", "down", Down),
        ("<Home>", "line-start", LineStart),
        ("<End>", "line-end", LineEnd),
    ] {
        let mut def = CommandDef::motion(name, kind);
        def.caps_mut().modes = arrows;
        map(t, seq, arrows, def);
    }
}

fn register_objects(t: &mut MappingTable) {
    use ObjectScope::{Around, Inner};
    use TextObjectKind::*;
    let objects: &[(&str, &'static str, &'static str, TextObjectKind)] = &[
        ("w", "inner-word", "a-word", Word),
        ("W", "inner-big-word", "a-big-word", BigWord),
        ("s", "inner-sentence", "a-sentence", Sentence),
        ("p", "inner-paragraph", "a-paragraph", Paragraph),
        ("\"", "inner-double-quote", "a-double-quote", Quote('"')),
        ("'", "inner-single-quote", "a-single-quote", Quote('\'')),
        ("`", "inner-backtick", "a-backtick", Quote('`')),
        ("(", "inner-paren", "a-paren", Bracket('(', ')')),
        (")", "inner-paren", "a-paren", Bracket('(', ')')),
        ("b", "inner-paren", "a-paren", Bracket('(', ')')),
        ("[", "inner-bracket", "a-bracket", Bracket('[', ']')),
        ("]", "inner-bracket", "a-bracket", Bracket('[', ']')),
        ("{", "inner-brace", "a-brace", Bracket('{', '}')),
        ("}", "inner-brace", "a-brace", Bracket('{', '}')),
        ("B", "inner-brace", "a-brace", Bracket('{', '}')),
        ("<lt>", "inner-angle", "an-angle", Bracket('<', '>')),
        (">", "inner-angle", "an-angle", Bracket('<', '>')),
        ("t", "inner-tag", "a-tag", Tag),
    ];
    for (key, inner, around, kind) in objects {
        let i = CommandDef::object(*inner, *kind, Inner);
        map(t, &format!("i{key}"), i.modes(), i);
        let a = CommandDef::object(*around, *kind, Around);
        map(t, &format!("a{key}"), a.modes(), a);
    }
}

fn register_operators(t: &mut MappingTable) {
    use OperatorKind::*;
    for (seq, name, op) in [
        ("d", "delete", Delete),
        ("c", "change", Change),
        ("y", "yank", Yank),
        (">", "indent", Indent),
        ("<lt>", "unindent", Unindent),
        ("=", "reindent", Reindent),
        ("g~", "toggle-case", ToggleCase),
        ("gu", "lowercase", Lowercase),
        ("gU", "uppercase", Uppercase),
        ("gc", "comment", Comment),
    ] {
        let def = CommandDef::operator(name, op);
        map(t, seq, def.modes(), def);
    }

    // Visual-only spellings.
    for (seq, name, op) in [
        ("x", "delete", Delete),
        ("s", "change", Change),
        ("~", "toggle-case", ToggleCase),
        ("u", "lowercase", Lowercase),
        ("U", "uppercase", Uppercase),
    ] {
        let mut def = CommandDef::operator(name, op);
        def.caps_mut().modes = VISUAL;
        map(t, seq, VISUAL, def);
    }

    // Second half of a doubled operator: `dd`, `g~~`, `gUU`, `gcc`, ...
    let doubled: [(&str, &'static str); 13] = [
        ("d", "d"),
        ("c", "c"),
        ("y", "y"),
        (">", ">"),
        ("<lt>", "<"),
        ("=", "="),
        ("~", "~"),
        ("g~", "g~"),
        ("u", "u"),
        ("gu", "gu"),
        ("U", "U"),
        ("gU", "gU"),
        ("gc", "gc"),
    ];
    for (seq, key) in doubled {
        let def = CommandDef::Motion {
            caps: Caps::new("current-line", ModeSet::OPERATOR_PENDING),
            motion: MotionKind::CurrentLine { key },
        };
        map(t, seq, ModeSet::OPERATOR_PENDING, def);
    }
}

fn register_normal_actions(t: &mut MappingTable) {
    use ActionKind::*;
    use OperatorKind::*;
    let nv = NORMAL | VISUAL;

    for (seq, name, at) in [
        ("i", "insert", InsertAt::Before),
        ("a", "append", InsertAt::After),
        ("I", "insert-line-start", InsertAt::FirstNonBlank),
        ("A", "append-line-end", InsertAt::LineEnd),
        ("o", "open-below", InsertAt::OpenBelow),
        ("O", "open-above", InsertAt::OpenAbove),
    ] {
        action(t, seq, Caps::new(name, NORMAL).repeatable(), EnterInsert(at));
    }
    action(t, "R", Caps::new("replace-mode", NORMAL).repeatable(), EnterReplace);
    action(t, "gh", Caps::new("select-mode", NORMAL), EnterSelect);
    for (seq, name, mode) in [
        ("v", "visual", Mode::Visual),
        ("V", "visual-line", Mode::VisualLine),
        ("<C-v>", "visual-block", Mode::VisualBlock),
    ] {
        action(t, seq, Caps::new(name, nv), EnterVisual(mode));
    }
    action(
        t,
        "<Esc>",
        Caps::new("escape", ModeSet::all()).keeps_xpos(),
        Escape,
    );
    action(
        t,
        "\"",
        Caps::new("select-register", nv).input(InputSpec::Char),
        SelectRegister('\0'),
    );

    let shorthands: [(&str, &'static str, OperatorKind, MotionKind); 7] = [
        ("x", "delete-char", Delete, MotionKind::Right { wrap: false }),
        ("X", "delete-char-before", Delete, MotionKind::Left { wrap: false }),
        ("D", "delete-to-eol", Delete, MotionKind::LineEnd),
        ("C", "change-to-eol", Change, MotionKind::LineEnd),
        ("s", "substitute", Change, MotionKind::Right { wrap: false }),
        ("S", "substitute-line", Change, MotionKind::CurrentLine { key: "c" }),
        ("Y", "yank-line", Yank, MotionKind::CurrentLine { key: "y" }),
    ];
    for (seq, name, op, motion) in shorthands {
        let mut caps = Caps::new(name, NORMAL);
        caps.repeatable = op.mutates();
        action(t, seq, caps, Shorthand { op, motion });
    }

    action(t, "p", Caps::new("paste-after", nv).repeatable(), Paste { before: false });
    action(t, "P", Caps::new("paste-before", nv).repeatable(), Paste { before: true });
    action(t, "J", Caps::new("join-lines", nv).repeatable(), JoinLines);
    action(
        t,
        "r",
        Caps::new("replace-char", nv).repeatable().input(InputSpec::Char),
        ReplaceChar('\0'),
    );
    action(t, "~", Caps::new("toggle-case-char", NORMAL).repeatable(), ToggleCaseChar);
    action(t, "u", Caps::new("undo", NORMAL), Undo);
    action(t, "<C-r>", Caps::new("redo", NORMAL), Redo);
    action(t, ".", Caps::new("dot-repeat", nv), DotRepeat);
    action(
        t,
        "q",
        Caps::new("record-macro", NORMAL).input(InputSpec::Char),
        RecordMacro('\0'),
    );
    action(
        t,
        "@",
        Caps::new("play-macro", NORMAL).input(InputSpec::Char),
        PlayMacro('\0'),
    );
    action(
        t,
        "m",
        Caps::new("set-mark", nv).input(InputSpec::Char),
        SetMark('\0'),
    );
    for (seq, name, align) in [
        ("zz", "scroll-center", ScrollAlign::Center),
        ("zt", "scroll-top", ScrollAlign::Top),
        ("zb", "scroll-bottom", ScrollAlign::Bottom),
    ] {
        action(t, seq, Caps::new(name, nv).keeps_xpos(), ScrollCaret(align));
    }
    action(
        t,
        ":",
        Caps::new("ex-command", nv).input(InputSpec::Line(PromptKind::Ex)),
        ExCommandLine(String::new()),
    );
    action(
        t,
        "ds",
        Caps::new("surround-delete", NORMAL)
            .repeatable()
            .input(InputSpec::Char),
        SurroundDelete('\0'),
    );
    action(
        t,
        "cs",
        Caps::new("surround-change", NORMAL)
            .repeatable()
            .input(InputSpec::Chars(2)),
        SurroundChange('\0', '\0'),
    );
}

fn register_visual_actions(t: &mut MappingTable) {
    use ActionKind::*;
    action(t, "o", Caps::new("swap-ends", VISUAL), SwapSelectionEnds);
    action(
        t,
        "<C-g>",
        Caps::new("select-to-visual", ModeSet::SELECT),
        SelectToVisual,
    );
}

fn register_typing_actions(t: &mut MappingTable) {
    use ActionKind::*;
    for (seq, name, kind) in [
        ("<CR>", "insert-newline", InsertNewline),
        ("<Tab>", "insert-tab", InsertTab),
        ("<BS>", "delete-backward", DeleteBackward),
        ("<Del>", "delete-forward", DeleteForward),
        ("<C-w>", "delete-word-backward", DeleteWordBackward),
    ] {
        action(t, seq, Caps::new(name, TYPING), kind);
    }
}

#[cfg(test)]
mod tests {
    use crate::{MappingTable, Resolution, Target};
    use core_events::parse_notation;
    use core_state::{ActionKind, CommandDef, InputSpec, Mode};

    fn def(table: &MappingTable, mode: Mode, seq: &str) -> CommandDef {
        let keys = parse_notation(seq).unwrap();
        match table.resolve_keys(mode, &keys, false) {
            Resolution::Resolved {
                target: Target::Command(def),
                consumed,
                ..
            } if consumed == keys.len() => def,
            other => panic!("expected {seq} to resolve in {mode}, got {:?}", other),
        }
    }

    #[test]
    fn every_listed_sequence_resolves() {
        let table = MappingTable::with_builtins();
        for seq in [
            "h", "j", "k", "l", "<Left>", "<BS>", "<Space>", "w", "W", "b", "B", "e", "E", "0",
            "^", "$", "_", "+", "-", "<CR>", "|", "gg", "G", "f", "F", "t", "T", ";", ",", "%",
            "{", "}", "H", "M", "L", "n", "N", "*", "#", "/", "?", "`", "'", "<C-d>", "<C-u>",
            "y", ">", "<lt>", "=", "g~", "gu", "gU", "gc", "i", "a", "I", "A", "o", "O",
            "v", "V", "<C-v>", "gh", "R", "<Esc>", "x", "X", "D", "C", "s", "S", "Y", "p", "P",
            "J", "r", "~", "u", "<C-r>", ".", "q", "@", "m", "zz", "zt", "zb", ":", "\"", "ds",
            "cs",
        ] {
            let _ = def(&table, Mode::Normal, seq);
        }
        // `d` and `c` also prefix `ds`/`cs`, so alone they wait for another key
        for seq in ["d", "c"] {
            let keys = parse_notation(seq).unwrap();
            assert_eq!(
                table.resolve_keys(Mode::Normal, &keys, false),
                Resolution::Incomplete
            );
        }
    }

    #[test]
    fn visual_overrides() {
        let table = MappingTable::with_builtins();
        assert!(def(&table, Mode::Visual, "u").is_operator());
        assert!(def(&table, Mode::VisualLine, "x").is_operator());
        assert_eq!(def(&table, Mode::VisualBlock, "o").name(), "swap-ends");
        assert_eq!(def(&table, Mode::Visual, "i(").name(), "inner-paren");
        assert_eq!(def(&table, Mode::Normal, "u").name(), "undo");
    }

    #[test]
    fn typing_and_select_modes() {
        let table = MappingTable::with_builtins();
        assert_eq!(def(&table, Mode::Insert, "<BS>").name(), "delete-backward");
        assert_eq!(def(&table, Mode::Replace, "<Esc>").name(), "escape");
        assert_eq!(def(&table, Mode::Select, "<Right>").name(), "right");
        assert_eq!(def(&table, Mode::Select, "<C-g>").name(), "select-to-visual");
        assert_eq!(def(&table, Mode::Insert, "<Left>").name(), "left");
    }

    #[test]
    fn surround_change_collects_two_chars() {
        let table = MappingTable::with_builtins();
        match def(&table, Mode::Normal, "cs") {
            CommandDef::Action {
                caps,
                action: ActionKind::SurroundChange(..),
            } => {
                assert_eq!(caps.input, InputSpec::Chars(2));
                assert!(caps.repeatable);
            }
            other => panic!("expected surround change, got {:?}", other),
        }
    }
}
