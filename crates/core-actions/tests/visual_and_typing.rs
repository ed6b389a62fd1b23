//! Selection modes, typing modes, surround pairs, registers and undo.

mod common;

use common::{Editor, run};
use core_actions::KeyOutcome;
use core_state::{Mode, SettingValue};
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Case<'a> {
    name: &'a str,
    text: &'a str,
    keys: &'a str,
    expect: &'a str,
}

fn check(cases: &[Case<'_>]) {
    for case in cases {
        let (text, _) = run(case.text, case.keys);
        assert_eq!(text, case.expect, "{}", case.name);
    }
}

#[test]
fn visual_operator_matrix() {
    check(&[
        Case {
            name: "charwise_across_lines",
            text: "abc\ndef\n",
            keys: "vjd",
            expect: "ef\n",
        },
        Case {
            name: "linewise",
            text: "a\nb\nc\n",
            keys: "Vjd",
            expect: "c\n",
        },
        Case {
            name: "linewise_yank_paste",
            text: "a\nb\n",
            keys: "VyjP",
            expect: "a\na\nb\n",
        },
        Case {
            name: "object_then_uppercase",
            text: "one two\n",
            keys: "wviwU",
            expect: "one TWO\n",
        },
        Case {
            name: "block_delete",
            text: "abcd\nefgh\n",
            keys: "<C-v>jld",
            expect: "cd\ngh\n",
        },
        Case {
            name: "block_skips_short_lines",
            text: "abcd\nx\nefgh\n",
            keys: "l<C-v>jjlx",
            expect: "ad\nx\neh\n",
        },
        Case {
            name: "paste_over_selection",
            text: "one two\n",
            keys: "yiwwviwp",
            expect: "one one\n",
        },
        Case {
            name: "join_selection",
            text: "a\nb\nc\n",
            keys: "VjjJ",
            expect: "a b c\n",
        },
        Case {
            name: "replace_each_char",
            text: "abc\n",
            keys: "vlrx",
            expect: "xxc\n",
        },
        Case {
            name: "swap_ends_then_extend",
            text: "abcdef\n",
            keys: "llvlohd",
            expect: "aef\n",
        },
        Case {
            name: "indent_selection",
            text: "a\nb\n",
            keys: "Vj>",
            expect: "    a\n    b\n",
        },
        Case {
            name: "change_selection",
            text: "abc def\n",
            keys: "veczz<Esc>",
            expect: "zz def\n",
        },
    ]);
}

#[test]
fn visual_modes_toggle_and_switch() {
    let mut ed = Editor::new("abc\n");
    ed.press("v");
    assert_eq!(ed.mode(), Mode::Visual);
    ed.press("V");
    assert_eq!(ed.mode(), Mode::VisualLine);
    ed.press("V");
    assert_eq!(ed.mode(), Mode::Normal);
    ed.press("v<Esc>");
    assert_eq!(ed.mode(), Mode::Normal);
    assert_eq!(ed.bells(), 0);
}

#[test]
fn select_mode_replaces_on_typing() {
    let mut ed = Editor::new("abc\n");
    ed.press("gh");
    assert_eq!(ed.mode(), Mode::Select);
    ed.press("Z");
    assert_eq!(ed.mode(), Mode::Insert);
    ed.press("<Esc>");
    assert_eq!(ed.text(), "Zbc\n");
    assert_eq!(ed.register('"').as_deref(), Some("a"));
}

#[test]
fn select_to_visual() {
    let mut ed = Editor::new("abc\n");
    ed.press("gh<C-g>");
    assert_eq!(ed.mode(), Mode::Visual);
    ed.press("d");
    assert_eq!(ed.text(), "bc\n");
}

#[test]
fn typing_matrix() {
    check(&[
        Case {
            name: "insert",
            text: "abc\n",
            keys: "ihello <Esc>",
            expect: "hello abc\n",
        },
        Case {
            name: "open_below",
            text: "a\nb\n",
            keys: "ofoo<Esc>",
            expect: "a\nfoo\nb\n",
        },
        Case {
            name: "open_above",
            text: "a\nb\n",
            keys: "jOfoo<Esc>",
            expect: "a\nfoo\nb\n",
        },
        Case {
            name: "append_at_first_non_blank",
            text: "  x\n",
            keys: "$I-<Esc>",
            expect: "  -x\n",
        },
        Case {
            name: "backspace",
            text: "x\n",
            keys: "Aab<BS><Esc>",
            expect: "xa\n",
        },
        Case {
            name: "backspace_joins_lines",
            text: "a\nb\n",
            keys: "ji<BS><Esc>",
            expect: "ab\n",
        },
        Case {
            name: "newline",
            text: "x\n",
            keys: "A<CR>y<Esc>",
            expect: "x\ny\n",
        },
        Case {
            name: "delete_word_backward",
            text: "x\n",
            keys: "A foo<C-w><Esc>",
            expect: "x \n",
        },
        Case {
            name: "tab_expands",
            text: "x\n",
            keys: "i<Tab><Esc>",
            expect: "    x\n",
        },
        Case {
            name: "delete_forward",
            text: "abc\n",
            keys: "i<Del><Esc>",
            expect: "bc\n",
        },
        Case {
            name: "arrow_keys_move_while_typing",
            text: "abc\n",
            keys: "ia<Left>b<Esc>",
            expect: "baabc\n",
        },
        Case {
            name: "replace_mode",
            text: "abc\n",
            keys: "Rxy<Esc>",
            expect: "xyc\n",
        },
        Case {
            name: "replace_mode_extends_the_line",
            text: "ab\n",
            keys: "lRxyz<Esc>",
            expect: "axyz\n",
        },
        Case {
            name: "counted_insert_repeats_the_text",
            text: "abc\n",
            keys: "3ix<Esc>",
            expect: "xxxabc\n",
        },
        Case {
            name: "counted_append_at_line_end",
            text: "x\n",
            keys: "3A-<Esc>",
            expect: "x---\n",
        },
        Case {
            name: "counted_open_below_opens_each_line",
            text: "abc\n",
            keys: "2ox<Esc>",
            expect: "abc\nx\nx\n",
        },
        Case {
            name: "counted_open_above",
            text: "abc\n",
            keys: "2Ox<Esc>",
            expect: "x\nx\nabc\n",
        },
        Case {
            name: "digits_typed_in_insert_are_text",
            text: "\n",
            keys: "i12<Esc>",
            expect: "12\n",
        },
    ]);
}

#[test]
fn autoindent_copies_the_indent() {
    let mut ed = Editor::with_settings("  x\n", vec![("autoindent", SettingValue::Bool(true))]);
    ed.run("A<CR>y<Esc>");
    assert_eq!(ed.text(), "  x\n  y\n");
    ed.run("oz<Esc>");
    assert_eq!(ed.text(), "  x\n  y\n  z\n");
}

#[test]
fn counted_insert_undoes_as_one_step() {
    let mut ed = Editor::new("abc\n");
    ed.press("3ix<Esc>");
    assert_eq!(ed.text(), "xxxabc\n");
    assert_eq!(ed.caret(), (0, 2));
    ed.press("u");
    assert_eq!(ed.text(), "abc\n");
}

#[test]
fn leaving_insert_records_the_dot_register() {
    let mut ed = Editor::new("\n");
    ed.run("ifoo<Esc>");
    assert_eq!(ed.register('.').as_deref(), Some("foo"));
    assert_eq!(ed.caret(), (0, 2));
}

#[test]
fn surround_matrix() {
    check(&[
        Case {
            name: "delete_parens",
            text: "x(a b)y\n",
            keys: "3lds(",
            expect: "xa by\n",
        },
        Case {
            name: "delete_quotes",
            text: "say \"hi\" now\n",
            keys: "5lds\"",
            expect: "say hi now\n",
        },
        Case {
            name: "change_quotes",
            text: "say \"hi\" now\n",
            keys: "5lcs\"'",
            expect: "say 'hi' now\n",
        },
        Case {
            name: "change_to_tight_brackets",
            text: "x(a b)y\n",
            keys: "3lcs)]",
            expect: "x[a b]y\n",
        },
        Case {
            name: "change_to_padded_brackets",
            text: "x(a b)y\n",
            keys: "3lcs)[",
            expect: "x[ a b ]y\n",
        },
        Case {
            name: "repeat_delete",
            text: "(a) (b)\n",
            keys: "lds(3l.",
            expect: "a b\n",
        },
    ]);
}

#[test]
fn surround_without_a_pair_rings() {
    let mut ed = Editor::new("abc\n");
    assert_eq!(ed.press("ds("), KeyOutcome::Failed);
    assert_eq!(ed.bells(), 1);
    assert_eq!(ed.text(), "abc\n");
}

#[test]
fn disabled_surround_is_unmapped() {
    let mut ed = Editor::with_settings("(a)\n", vec![("enable_surround", SettingValue::Bool(false))]);
    ed.press("l");
    assert_eq!(ed.press("ds"), KeyOutcome::Failed);
    assert_eq!(ed.bells(), 1);
    assert_eq!(ed.text(), "(a)\n");
    assert_eq!(ed.mode(), Mode::Normal);
}

#[test]
fn numbered_registers_shift_on_line_deletes() {
    let mut ed = Editor::new("a\nb\nc\n");
    ed.run("dd");
    ed.run("dd");
    assert_eq!(ed.register('1').as_deref(), Some("b\n"));
    ed.run("\"2p");
    assert_eq!(ed.text(), "c\na\n");
}

#[test]
fn small_deletes_go_to_the_minus_register() {
    let mut ed = Editor::new("abc def\n");
    ed.run("dw");
    assert_eq!(ed.register('-').as_deref(), Some("abc "));
    assert_eq!(ed.register('1'), None);
}

#[test]
fn black_hole_register_keeps_the_unnamed_one() {
    let mut ed = Editor::new("abc def\n");
    ed.run("yiw");
    ed.run("w\"_dw");
    assert_eq!(ed.register('"').as_deref(), Some("abc"));
}

#[test]
fn invalid_register_reports() {
    let mut ed = Editor::new("abc\n");
    assert_eq!(ed.press("\"!"), KeyOutcome::Failed);
    assert_eq!(ed.last_message(), Some("E354: Invalid register name: '!'"));
    assert_eq!(ed.press("x"), KeyOutcome::Executed);
    assert_eq!(ed.text(), "bc\n");
}

#[test]
fn undo_and_redo_step_per_command() {
    let mut ed = Editor::new("abc\n");
    ed.press("x");
    ed.press("x");
    ed.press("u");
    assert_eq!(ed.text(), "bc\n");
    ed.press("<C-r>");
    assert_eq!(ed.text(), "c\n");
    ed.press("2u");
    assert_eq!(ed.text(), "abc\n");
    ed.press("u");
    assert_eq!(ed.last_message(), Some("Already at oldest change"));
}

#[test]
fn a_replay_undoes_as_one_step() {
    let mut ed = Editor::new("abc def\n");
    ed.run("xwx");
    assert_eq!(ed.text(), "bc ef\n");
    ed.run("u");
    assert_eq!(ed.text(), "abc def\n");
}

#[test]
fn undoing_a_replay_keeps_its_leading_navigation() {
    let mut ed = Editor::new("abc def\n");
    ed.run("wx");
    assert_eq!(ed.text(), "abc ef\n");
    ed.run("u");
    assert_eq!(ed.text(), "abc def\n");
    assert_eq!(ed.caret(), (0, 4));
}

#[test]
fn an_insert_session_undoes_as_one_step() {
    let mut ed = Editor::new("x\n");
    ed.press("Aone<CR>two<Esc>");
    assert_eq!(ed.text(), "xone\ntwo\n");
    ed.press("u");
    assert_eq!(ed.text(), "x\n");
    assert_eq!(ed.mode(), Mode::Normal);
}

#[test]
fn marks_jump_back() {
    let mut ed = Editor::new("a\nb\nc\n");
    ed.run("jmaG'a");
    assert_eq!(ed.caret(), (1, 0));
    ed.run("gg``");
    assert_eq!(ed.caret(), (1, 0));
}

#[test]
fn unset_mark_reports() {
    let mut ed = Editor::new("a\n");
    ed.run("'q");
    assert_eq!(ed.last_message(), Some("E20: Mark not set"));
}
