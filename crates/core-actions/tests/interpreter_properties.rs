//! Invariants of the interpreter that must hold for any input: unmapped keys,
//! no-op motions, remap expansion, counts.

mod common;

use common::{Editor, run};
use core_actions::KeyOutcome;
use core_events::parse_notation;
use core_state::{Mode, ModeSet, SettingValue};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn unmapped_key_rings_once_and_changes_nothing() {
    for (setup, mode) in [("", Mode::Normal), ("v", Mode::Visual), ("V", Mode::VisualLine)] {
        let mut ed = Editor::new("abc\ndef\n");
        ed.press(setup);
        let caret = ed.caret();
        let outcome = ed.press("Q");
        assert_eq!(outcome, KeyOutcome::Failed, "after {setup:?}");
        assert_eq!(ed.bells(), 1, "after {setup:?}");
        assert_eq!(ed.text(), "abc\ndef\n");
        assert_eq!(ed.mode(), mode);
        assert_eq!(ed.caret(), caret);
    }
}

#[test]
fn unmapped_continuation_of_a_prefix_rings_once() {
    let mut ed = Editor::new("abc\n");
    assert_eq!(ed.press("g"), KeyOutcome::Pending);
    assert_eq!(ed.press("Q"), KeyOutcome::Failed);
    assert_eq!(ed.bells(), 1);
    assert_eq!(ed.mode(), Mode::Normal);
    // The abandoned prefix does not leak into the next command.
    assert_eq!(ed.press("x"), KeyOutcome::Executed);
    assert_eq!(ed.text(), "bc\n");
}

#[test]
fn bare_zero_is_a_motion_and_counts_accept_it() {
    let (_, caret) = run("abcdef\n", "4l0");
    assert_eq!(caret, (0, 0));
    let (after, _) = run("abcdefghijklmnop\n", "10x");
    assert_eq!(after, "klmnop\n");
}

#[test]
fn vertical_counts_keep_the_remembered_column() {
    let mut ed = Editor::new("abcdef\nab\nx\nabcdef\n");
    ed.run("4l");
    ed.run("j");
    assert_eq!(ed.caret(), (1, 1));
    ed.run("2j");
    assert_eq!(ed.caret(), (3, 4));
    ed.run("3k");
    assert_eq!(ed.caret(), (0, 4));
}

#[test]
fn line_end_sticks_across_vertical_moves() {
    let mut ed = Editor::new("abc\nabcdef\nab\n");
    ed.run("$j");
    assert_eq!(ed.caret(), (1, 5));
    ed.run("j");
    assert_eq!(ed.caret(), (2, 1));
}

#[test]
fn counts_past_the_buffer_edge_are_clamped() {
    let (_, caret) = run("a\nb\nc\n", "99j");
    assert_eq!(caret, (2, 0));
}

#[test]
fn vertical_motion_at_the_edge_rings() {
    let mut ed = Editor::new("a\nb\n");
    let report = ed.run("k");
    assert_eq!(report.failed, 1);
    assert_eq!(ed.bells(), 1);
    assert_eq!(ed.caret(), (0, 0));
}

#[test]
fn ctrl_keys_pass_through_when_disabled() {
    let mut ed = Editor::with_settings(
        "a\nb\n",
        vec![("use_ctrl_keys", core_state::SettingValue::Bool(false))],
    );
    assert_eq!(ed.press("<C-n>"), KeyOutcome::PassThrough);
    assert_eq!(ed.caret(), (0, 0));
    assert_eq!(ed.bells(), 0);
    assert_eq!(ed.press("j"), KeyOutcome::Executed);
    assert_eq!(ed.caret(), (1, 0));
}

#[test]
fn escape_abandons_a_pending_operator_quietly() {
    let mut ed = Editor::new("abc\n");
    assert_eq!(ed.press("d"), KeyOutcome::Pending);
    assert_eq!(ed.press("<Esc>"), KeyOutcome::Executed);
    assert_eq!(ed.mode(), Mode::Normal);
    assert_eq!(ed.text(), "abc\n");
    assert_eq!(ed.bells(), 0);
}

#[test]
fn operator_keys_are_pending_at_once() {
    for surround in [true, false] {
        let settings = || vec![("enable_surround", SettingValue::Bool(surround))];
        for (op, rest, expect) in [("d", "w", "two\n"), ("c", "wX<Esc>", "X two\n")] {
            let mut ed = Editor::with_settings("one two\n", settings());
            assert_eq!(ed.press(op), KeyOutcome::Pending, "{op}");
            assert_eq!(ed.mode(), Mode::OperatorPending, "{op} surround={surround}");
            ed.press(rest);
            assert_eq!(ed.text(), expect, "{op}");
            assert_eq!(ed.mode(), Mode::Normal, "{op}");
        }
        let mut ed = Editor::with_settings("one two\n", settings());
        ed.press("2\"ad");
        assert_eq!(ed.mode(), Mode::OperatorPending);
        ed.press("<Esc>");
        assert_eq!(ed.mode(), Mode::Normal);
    }
}

#[test]
fn escape_while_collecting_a_char_is_quiet() {
    let mut ed = Editor::new("abc\n");
    assert_eq!(ed.press("f"), KeyOutcome::Pending);
    assert_eq!(ed.press("<Esc>"), KeyOutcome::Cancelled);
    assert_eq!(ed.bells(), 0);
    assert_eq!(ed.press("l"), KeyOutcome::Executed);
    assert_eq!(ed.caret(), (0, 1));
}

#[test]
fn user_remap_runs_its_expansion() {
    let mut ed = Editor::new("a\nb\nc\n");
    let lhs = parse_notation("Q").unwrap();
    ed.interp
        .table_mut()
        .remap(&lhs, ModeSet::NORMAL, parse_notation("jdd").unwrap());
    ed.run("Q");
    assert_eq!(ed.text(), "a\nc\n");
}

#[test]
fn self_referential_remap_does_not_recurse() {
    let mut ed = Editor::new("abc\n");
    let lhs = parse_notation("x").unwrap();
    ed.interp
        .table_mut()
        .remap(&lhs, ModeSet::NORMAL, parse_notation("xx").unwrap());
    ed.run("x");
    assert_eq!(ed.text(), "c\n");
}

#[test]
fn remaps_can_be_disabled_by_option() {
    let mut ed = Editor::new("abc\n");
    ed.interp = core_actions::Interpreter::with_options(core_actions::InterpreterOptions {
        check_user_mappings: false,
        ..Default::default()
    });
    ed.interp.table_mut().remap(
        &parse_notation("x").unwrap(),
        ModeSet::NORMAL,
        parse_notation("dd").unwrap(),
    );
    ed.run("x");
    assert_eq!(ed.text(), "bc\n");
}

fn noop_motion() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["h", "0", "^", "k", "<Left>", "F"])
}

fn operator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["d", "c", "y", ">", "<lt>", "gU", "gu", "g~", "="])
}

proptest! {
    #[test]
    fn operator_with_noop_motion_leaves_buffer_identical(
        text in "[a-z]{1,6}( [a-z]{1,6}){0,3}\n",
        op in operator(),
        motion in noop_motion(),
    ) {
        let mut ed = Editor::new(&text);
        // `F` needs a target that is never found before the caret.
        let motion = if motion == "F" { "F!".to_string() } else { motion.to_string() };
        ed.run(&format!("{op}{motion}"));
        prop_assert_eq!(ed.text(), text);
        prop_assert_eq!(ed.mode(), Mode::Normal);
        prop_assert_eq!(ed.host.native_log.len(), 0);
    }

    #[test]
    fn remap_expansion_terminates(
        maps in prop::collection::vec(("[abxjQ]{1,2}", "[abxjlQ]{1,4}"), 1..6),
        keys in "[abxjlQ]{0,12}",
    ) {
        let mut ed = Editor::new("one two\nthree four\n");
        for (lhs, rhs) in &maps {
            let lhs = parse_notation(lhs).unwrap();
            let rhs = parse_notation(rhs).unwrap();
            ed.interp.table_mut().remap(&lhs, ModeSet::NORMAL, rhs);
        }
        let report = ed.interp.run_notation(&mut ed.host, &keys, None).unwrap();
        prop_assert_eq!(report.keys, keys.chars().count());
    }
}
