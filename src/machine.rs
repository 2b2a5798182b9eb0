//! The transducer data model: states, transitions, and the builder that
//! assembles them into an immutable, validated [`Machine`].
//!
//! Shaped after `controller::machine::LabelledMachine` in the teacher: states
//! are referenced by a dense integer newtype, transitions live in adjacency
//! lists owned by their source state, and construction goes through a mutable
//! builder that is frozen into an immutable graph once assembly is complete.

use std::ops::Index;

use crate::alphabet::{Base, Token};
use crate::error::CodecError;

/// A dense index into a [`Machine`]'s state list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateIndex(pub usize);

impl StateIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One outgoing edge of a state: the symbol it consumes, the symbol it
/// (optionally) emits, and the state it leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub dest: StateIndex,
    pub input: Token,
    pub output: Option<Base>,
}

impl Transition {
    pub fn is_null(&self) -> bool {
        self.output.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct State {
    is_end: bool,
    transitions: Vec<Transition>,
}

impl State {
    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// True iff every outgoing transition carries a non-null output. Vacuously
    /// true for a state with no outgoing transitions at all.
    pub fn emits_output(&self) -> bool {
        self.transitions.iter().all(|t| t.output.is_some())
    }

    /// True iff every outgoing transition consumes a non-null input.
    pub fn exits_with_input(&self) -> bool {
        self.transitions.iter().all(|t| t.input != Token::Null)
    }
}

/// Mutable builder for a [`Machine`]. States and transitions are added freely;
/// [`MachineBuilder::finalize`] freezes the graph and validates it.
#[derive(Debug, Default)]
pub struct MachineBuilder {
    states: Vec<State>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        MachineBuilder { states: Vec::new() }
    }

    pub fn add_state(&mut self, is_end: bool) -> StateIndex {
        let idx = StateIndex(self.states.len());
        self.states.push(State {
            is_end,
            transitions: Vec::new(),
        });
        idx
    }

    pub fn add_transition(&mut self, src: StateIndex, transition: Transition) {
        self.states[src.0].transitions.push(transition);
    }

    /// Freeze the builder into an immutable, validated [`Machine`].
    ///
    /// Validates that the null-transition subgraph (restricted to states that
    /// are not fully emitting, since emitting states have no null transitions
    /// by definition) is acyclic, per the transducer's well-formedness
    /// requirement.
    pub fn finalize(self, start: StateIndex) -> Result<Machine, CodecError> {
        let machine = Machine {
            states: self.states,
            start,
        };
        machine.check_null_acyclic()?;
        Ok(machine)
    }
}

/// An immutable, validated finite-state transducer.
#[derive(Debug, Clone)]
pub struct Machine {
    states: Vec<State>,
    start: StateIndex,
}

impl Index<StateIndex> for Machine {
    type Output = State;
    fn index(&self, index: StateIndex) -> &State {
        &self.states[index.0]
    }
}

impl Machine {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn start(&self) -> StateIndex {
        self.start
    }

    pub fn state_indices(&self) -> impl Iterator<Item = StateIndex> {
        (0..self.states.len()).map(StateIndex)
    }

    /// Topologically sort states with respect to their null transitions:
    /// every null predecessor of a state precedes it. Ties (states with no
    /// null-transition relationship) are broken by ascending state index, for
    /// determinism.
    ///
    /// Fails with [`CodecError::MalformedMachine`] if the null subgraph has a
    /// cycle, which should never happen for a well-formed transducer (checked
    /// once already at [`MachineBuilder::finalize`] time).
    pub fn null_topological_order(&self) -> Result<Vec<StateIndex>, CodecError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut mark = vec![Mark::Unvisited; self.states.len()];
        let mut order = Vec::with_capacity(self.states.len());

        fn visit(
            machine: &Machine,
            s: StateIndex,
            mark: &mut Vec<Mark>,
            order: &mut Vec<StateIndex>,
        ) -> Result<(), CodecError> {
            match mark[s.0] {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(CodecError::MalformedMachine(format!(
                        "null-transition cycle through state {}",
                        s.0
                    )))
                }
                Mark::Unvisited => {}
            }
            mark[s.0] = Mark::InProgress;
            for t in machine[s].transitions() {
                if t.is_null() {
                    visit(machine, t.dest, mark, order)?;
                }
            }
            mark[s.0] = Mark::Done;
            order.push(s);
            Ok(())
        }

        for s in self.state_indices() {
            visit(self, s, &mut mark, &mut order)?;
        }
        order.reverse();
        Ok(order)
    }

    fn check_null_acyclic(&self) -> Result<(), CodecError> {
        self.null_topological_order().map(|_| ())
    }

    /// Deterministically drive the machine forward on an explicit input
    /// sequence, returning the emitted base sequence. Used by tests and the
    /// demo CLI to produce clean (pre-mutation) output; always takes the
    /// first-listed matching transition, mirroring the tie-break used
    /// throughout the decoder.
    pub fn run(&self, input: &[Token]) -> Result<Vec<Base>, CodecError> {
        let mut state = self.start;
        let mut out = Vec::new();
        let mut remaining = input.iter().copied().peekable();
        loop {
            if self[state].is_end() && remaining.peek().is_none() {
                return Ok(out);
            }
            let next = remaining.peek().copied();
            let transition = self[state]
                .transitions()
                .iter()
                .find(|t| t.input == Token::Null || Some(t.input) == next)
                .ok_or_else(|| {
                    CodecError::MalformedMachine(format!(
                        "state {} has no transition to consume remaining input",
                        state.0
                    ))
                })?;
            if transition.input != Token::Null {
                remaining.next();
            }
            if let Some(base) = transition.output {
                out.push(base);
            }
            state = transition.dest;
        }
    }
}

/// A transducer that copies its input bits straight through as A/C
/// (0 -> A, 1 -> C), framed by `SOF`/`EOF`. The simplest possible example
/// machine, useful for exercising the decoder without duplication or noise.
pub fn identity_machine() -> Result<Machine, CodecError> {
    let mut b = MachineBuilder::new();
    let start = b.add_state(false);
    let body = b.add_state(true);
    let end = b.add_state(true);
    b.add_transition(
        start,
        Transition {
            dest: body,
            input: Token::Sof,
            output: None,
        },
    );
    b.add_transition(
        body,
        Transition {
            dest: body,
            input: Token::Bit0,
            output: Some(Base::A),
        },
    );
    b.add_transition(
        body,
        Transition {
            dest: body,
            input: Token::Bit1,
            output: Some(Base::C),
        },
    );
    b.add_transition(
        body,
        Transition {
            dest: end,
            input: Token::Eof,
            output: None,
        },
    );
    b.finalize(start)
}

/// A transducer with a genuine null-transition detour: an idle state between
/// bits that silently re-synchronizes before accepting the next input symbol.
/// Bit 0 emits `A`, bit 1 emits `G`; framed by `SOF`/`EOF`.
pub fn run_length_machine() -> Result<Machine, CodecError> {
    let mut b = MachineBuilder::new();
    let start = b.add_state(false);
    let idle = b.add_state(false);
    let body = b.add_state(false);
    let end = b.add_state(true);
    b.add_transition(
        start,
        Transition {
            dest: idle,
            input: Token::Sof,
            output: None,
        },
    );
    // idle re-synchronizes via a null transition before consuming more input.
    // Neither idle nor body is a valid end state on its own: only the explicit
    // Eof transition into `end` terminates the message, unlike
    // `identity_machine` where the body state doubles as an (ambiguous) end.
    b.add_transition(
        idle,
        Transition {
            dest: body,
            input: Token::Null,
            output: None,
        },
    );
    b.add_transition(
        body,
        Transition {
            dest: idle,
            input: Token::Bit0,
            output: Some(Base::A),
        },
    );
    b.add_transition(
        body,
        Transition {
            dest: idle,
            input: Token::Bit1,
            output: Some(Base::G),
        },
    );
    b.add_transition(
        idle,
        Transition {
            dest: end,
            input: Token::Eof,
            output: None,
        },
    );
    b.finalize(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_machine_runs_round_trip() {
        let m = identity_machine().unwrap();
        let input = vec![Token::Sof, Token::Bit0, Token::Bit1, Token::Bit0, Token::Eof];
        let out = m.run(&input).unwrap();
        assert_eq!(out, vec![Base::A, Base::C, Base::A]);
    }

    #[test]
    fn null_topological_order_respects_null_edges() {
        let m = run_length_machine().unwrap();
        let order = m.null_topological_order().unwrap();
        let pos = |s: StateIndex| order.iter().position(|&x| x == s).unwrap();
        // idle (index 1) has a null transition to body (index 2): idle must precede body.
        assert!(pos(StateIndex(1)) < pos(StateIndex(2)));
    }

    #[test]
    fn builder_rejects_null_cycles() {
        let mut b = MachineBuilder::new();
        let a = b.add_state(false);
        let c = b.add_state(true);
        b.add_transition(
            a,
            Transition {
                dest: c,
                input: Token::Null,
                output: None,
            },
        );
        b.add_transition(
            c,
            Transition {
                dest: a,
                input: Token::Null,
                output: None,
            },
        );
        assert!(b.finalize(a).is_err());
    }
}
