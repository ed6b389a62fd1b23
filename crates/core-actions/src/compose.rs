//! Operator and motion composition.
//!
//! After an operator such as `d` is pending, the next motion becomes its
//! argument. Composition only builds the instruction; the executor runs the
//! motion first and fails the pair when the selection did not change.

use core_state::{CommandDef, Instruction, MotionKind, OperatorKind, SessionState};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// A doubled key that belongs to a different operator, e.g. `dc`.
    #[error("`{key}` does not double the {op} operator")]
    NotDoubled { op: &'static str, key: &'static str },
    #[error("no previous character search")]
    NoCharSearch,
}

/// Build the instruction for `op` applied over `motion`.
///
/// Panics when `op` is not an operator or `motion` is not a motion; the
/// interpreter only calls this with a pending operator.
pub fn compose(op: &CommandDef, motion: &CommandDef, st: &SessionState) -> Result<Instruction, ComposeError> {
    let CommandDef::Operator { op: kind, .. } = op else {
        panic!("compose called with `{}`, which is not an operator", op.name());
    };
    let CommandDef::Motion { motion: m, .. } = motion else {
        panic!("compose called with `{}`, which is not a motion", motion.name());
    };
    let motion = resolve_motion(*kind, m, st)?;
    debug!(target: "actions.compose", op = kind.name(), motion = ?motion, count = ?st.count(), "composed");
    Ok(Instruction::Operate {
        op: *kind,
        motion,
        count: st.count(),
        register: st.register,
        xpos: st.xpos,
    })
}

fn resolve_motion(op: OperatorKind, motion: &MotionKind, st: &SessionState) -> Result<MotionKind, ComposeError> {
    match motion {
        MotionKind::CurrentLine { key } if !op.doubles_with(key) => Err(ComposeError::NotDoubled {
            op: op.name(),
            key: *key,
        }),
        // `;` and `,` take the inclusiveness of the search they repeat.
        MotionKind::RepeatCharSearch { reverse } => {
            let last = st.last_char_search.ok_or(ComposeError::NoCharSearch)?;
            Ok(MotionKind::FindChar(if *reverse { last.reversed() } else { last }))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{BufferId, CharSearch, MotionPolicy};
    use pretty_assertions::assert_eq;

    fn state() -> SessionState {
        SessionState::new(BufferId(1))
    }

    #[test]
    fn counts_and_register_flow_into_the_instruction() {
        let mut st = state();
        st.action_count = Some(2);
        st.motion_count = Some(3);
        st.register = Some('a');
        let instr = compose(
            &CommandDef::operator("d", OperatorKind::Delete),
            &CommandDef::motion("w", MotionKind::WordForward { big: false }),
            &st,
        )
        .unwrap();
        assert_eq!(
            instr,
            Instruction::Operate {
                op: OperatorKind::Delete,
                motion: MotionKind::WordForward { big: false },
                count: Some(6),
                register: Some('a'),
                xpos: None,
            }
        );
    }

    #[test]
    fn doubled_key_must_match_operator() {
        let st = state();
        let dd = CommandDef::motion("d", MotionKind::CurrentLine { key: "d" });
        let cc = CommandDef::motion("c", MotionKind::CurrentLine { key: "c" });
        assert!(compose(&CommandDef::operator("d", OperatorKind::Delete), &dd, &st).is_ok());
        assert_eq!(
            compose(&CommandDef::operator("d", OperatorKind::Delete), &cc, &st),
            Err(ComposeError::NotDoubled {
                op: "delete",
                key: "c"
            })
        );
        assert!(compose(&CommandDef::operator("gc", OperatorKind::Comment), &cc, &st).is_ok());
    }

    #[test]
    fn repeated_char_search_takes_its_policy_from_the_last_search() {
        let mut st = state();
        let repeat = CommandDef::motion(";", MotionKind::RepeatCharSearch { reverse: true });
        let op = CommandDef::operator("d", OperatorKind::Delete);
        assert_eq!(compose(&op, &repeat, &st), Err(ComposeError::NoCharSearch));

        st.last_char_search = Some(CharSearch {
            forward: false,
            till: false,
            target: 'x',
        });
        let Instruction::Operate { motion, .. } = compose(&op, &repeat, &st).unwrap() else {
            panic!("expected operate");
        };
        assert_eq!(motion.policy(), MotionPolicy::Inclusive);
    }
}
