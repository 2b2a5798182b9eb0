//! Score tables (component A): per-state predecessor lists and left-context,
//! built once per alignment from a [`Machine`], an [`InputModel`], and the
//! mutator's `max_dup_len`.

use crate::alphabet::{Base, Token};
use crate::error::CodecError;
use crate::input_model::InputModel;
use crate::logprob::LogProb;
use crate::machine::{Machine, StateIndex};

/// One incoming transition into a state, with its source, the input symbol it
/// consumes (for scoring against the input model), and the base it emits (for
/// emit predecessors only; always `None` for null predecessors).
#[derive(Debug, Clone, Copy)]
pub struct IncomingTransScore {
    pub src: StateIndex,
    pub input: Token,
    pub base: Option<Base>,
    pub score: LogProb,
}

#[derive(Debug, Clone, Default)]
pub struct StateScores {
    /// Last `<= max_dup_len` bases emitted along the (assumed unique) path
    /// reaching this state, most-recently-emitted last.
    pub left_context: Vec<Base>,
    pub emit_preds: Vec<IncomingTransScore>,
    pub null_preds: Vec<IncomingTransScore>,
}

#[derive(Debug, Clone)]
pub struct ScoreTables {
    pub states: Vec<StateScores>,
    pub null_order: Vec<StateIndex>,
}

impl ScoreTables {
    pub fn build(
        machine: &Machine,
        input_model: &InputModel,
        max_dup_len: usize,
    ) -> Result<ScoreTables, CodecError> {
        let n = machine.num_states();
        let mut states = vec![StateScores::default(); n];

        for src in machine.state_indices() {
            for t in machine[src].transitions() {
                let score = IncomingTransScore {
                    src,
                    input: t.input,
                    base: t.output,
                    score: input_model.log_prob(t.input),
                };
                if t.is_null() {
                    states[t.dest.index()].null_preds.push(score);
                } else {
                    states[t.dest.index()].emit_preds.push(score);
                }
            }
        }

        let null_order = machine.null_topological_order()?;
        Self::fill_left_contexts(machine, &mut states, max_dup_len)?;

        Ok(ScoreTables { states, null_order })
    }

    /// Propagate left-context forward through the graph to a fixed point.
    /// Emit transitions append their base and truncate to the last
    /// `max_dup_len`; null transitions pass the context through unchanged.
    /// Bounded to `max_dup_len + 1` full passes, which is enough for any
    /// truncated-window cycle to stabilize; a machine whose left contexts
    /// still haven't settled after that bound violates the "unique left
    /// context per state" assumption the transducer is required to satisfy,
    /// and is reported as [`CodecError::MalformedMachine`] rather than
    /// silently accepted.
    fn fill_left_contexts(
        machine: &Machine,
        states: &mut [StateScores],
        max_dup_len: usize,
    ) -> Result<(), CodecError> {
        let mut seeded = vec![false; states.len()];
        states[machine.start().index()].left_context = Vec::new();
        seeded[machine.start().index()] = true;

        let passes = max_dup_len + states.len() + 1;
        for _ in 0..passes {
            let mut changed = false;
            // Emit transitions don't respect any topological order (they can
            // form cycles), so walk all states in index order each pass and
            // let the outer bounded loop carry both emit and null edges to
            // a fixed point together.
            for src in machine.state_indices() {
                if !seeded[src.index()] {
                    continue;
                }
                let ctx = states[src.index()].left_context.clone();
                for t in machine[src].transitions() {
                    let mut next_ctx = ctx.clone();
                    if let Some(base) = t.output {
                        next_ctx.push(base);
                        if next_ctx.len() > max_dup_len {
                            let excess = next_ctx.len() - max_dup_len;
                            next_ctx.drain(0..excess);
                        }
                    }
                    let dest = t.dest.index();
                    if !seeded[dest] {
                        states[dest].left_context = next_ctx;
                        seeded[dest] = true;
                        changed = true;
                    } else if states[dest].left_context != next_ctx {
                        // Differs from a previously-stabilized value; keep
                        // iterating in case this is still converging.
                        states[dest].left_context = next_ctx;
                        changed = true;
                    }
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(CodecError::MalformedMachine(
            "left context did not converge: transducer has no unique left context per state"
                .into(),
        ))
    }
}
