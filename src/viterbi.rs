//! The Viterbi lattice filler (component C) and traceback (component D):
//! finds the maximum-likelihood input string that explains an observed,
//! possibly-mutated base sequence under a transducer and mutator model.

use log::{debug, trace};

use crate::alphabet::{Base, Token};
use crate::error::CodecError;
use crate::input_model::InputModel;
use crate::lattice::{CellIndex, MutatorState};
use crate::logprob::{argmax, LogProb};
use crate::machine::{Machine, StateIndex};
use crate::mutator::MutatorParams;
use crate::scores::ScoreTables;

/// Where a cell's maximal score came from, for traceback. `Start` marks the
/// seeded initial cell; every other variant names the predecessor cell and,
/// for transitions that consumed one, the input symbol to emit.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Start,
    Emit {
        src: StateIndex,
        from: MutatorState,
        input: Token,
    },
    /// A deletion: the predecessor's emission is dropped, so unlike `Emit`
    /// the source cell sits at the *same* position, not `pos - 1`.
    Delete {
        src: StateIndex,
        from: MutatorState,
        input: Token,
    },
    Null {
        src: StateIndex,
        input: Token,
    },
    DupStart {
        from: MutatorState,
    },
    DupShift,
}

/// A fully-scored Viterbi lattice over one observed sequence.
pub struct ViterbiLattice<'a> {
    machine: &'a Machine,
    mutator: &'a MutatorParams,
    scores: ScoreTables,
    index: CellIndex,
    seq: Vec<Base>,
    cells: Vec<LogProb>,
    origins: Vec<Option<Origin>>,
}

impl<'a> ViterbiLattice<'a> {
    /// Build and fill the lattice for `seq` against `machine` under
    /// `mutator`/`input_model`. Does not yet decide alignability; call
    /// [`ViterbiLattice::best_alignment`] for that.
    pub fn fill(
        machine: &'a Machine,
        input_model: &InputModel,
        mutator: &'a MutatorParams,
        seq: &[Base],
    ) -> Result<ViterbiLattice<'a>, CodecError> {
        let scores = ScoreTables::build(machine, input_model, mutator.max_dup_len())?;
        let index = CellIndex::new(machine.num_states(), mutator.max_dup_len());
        let len = index.len(seq.len());
        let mut lattice = ViterbiLattice {
            machine,
            mutator,
            scores,
            index,
            seq: seq.to_vec(),
            cells: vec![LogProb::NEG_INFINITY; len],
            origins: vec![None; len],
        };
        lattice.seed();
        lattice.run_fill();
        Ok(lattice)
    }

    fn cell(&self, state: StateIndex, pos: usize, m: MutatorState) -> LogProb {
        self.cells[self.index.index(state.index(), pos, m)]
    }

    fn set_cell(&mut self, state: StateIndex, pos: usize, m: MutatorState, score: LogProb, origin: Origin) {
        let i = self.index.index(state.index(), pos, m);
        self.cells[i] = score;
        self.origins[i] = Some(origin);
    }

    /// Overwrite a cell only if `score` strictly improves on what's stored,
    /// returning whether it did. Used by the per-position relaxation in
    /// [`ViterbiLattice::run_fill`]: the D layer's emit-predecessor term now
    /// reads *other* cells at the same position (deletions consume no
    /// observed symbol), and those predecessors aren't all guaranteed to
    /// precede their successors in `null_order` (that order only accounts
    /// for null-transition edges). Recomputing every cell in a bounded loop
    /// until nothing improves converges to the same fixed point regardless
    /// of visitation order, since every recurrence here is a monotonic `max`
    /// over predecessor cells.
    fn improve_cell(&mut self, state: StateIndex, pos: usize, m: MutatorState, score: LogProb, origin: Origin) -> bool {
        let i = self.index.index(state.index(), pos, m);
        if score > self.cells[i] {
            self.cells[i] = score;
            self.origins[i] = Some(origin);
            true
        } else {
            false
        }
    }

    fn seed(&mut self) {
        let start = self.machine.start();
        self.set_cell(start, 0, MutatorState::S, LogProb::ZERO, Origin::Start);
    }

    fn run_fill(&mut self) {
        debug!(
            "filling viterbi lattice: {} states, {} observed bases, max_dup_len {}",
            self.machine.num_states(),
            self.seq.len(),
            self.mutator.max_dup_len()
        );
        let null_order = self.scores.null_order.clone();
        let bound = self.machine.num_states() + 1;
        for pos in 0..=self.seq.len() {
            for _ in 0..bound {
                let mut changed = false;
                for &state in &null_order {
                    changed |= self.fill_cell_s(state, pos);
                    changed |= self.fill_cell_d(state, pos);
                    for k in 0..self.mutator.max_dup_len() {
                        changed |= self.fill_cell_t(state, pos, k);
                    }
                }
                if !changed {
                    break;
                }
            }
        }
    }

    /// The best `(score, mutator-state)` among all mutator states of `state`
    /// at `pos`, used by both the S and D emit-predecessor terms.
    fn best_incoming(&self, state: StateIndex, pos: usize) -> (LogProb, MutatorState) {
        let mut candidates = vec![
            (self.cell(state, pos, MutatorState::S), MutatorState::S),
            (self.cell(state, pos, MutatorState::D), MutatorState::D),
        ];
        for k in 0..self.mutator.max_dup_len() {
            candidates.push((self.cell(state, pos, MutatorState::T(k)), MutatorState::T(k)));
        }
        argmax(candidates).unwrap()
    }

    fn fill_cell_s(&mut self, state: StateIndex, pos: usize) -> bool {
        if pos == 0 && state == self.machine.start() {
            // The seeded initial cell; leave as-is.
            return false;
        }
        let mut best: Option<(LogProb, Origin)> = None;

        if pos >= 1 {
            let x = self.seq[pos - 1];
            let state_scores = self.scores.states[state.index()].clone();
            for pred in &state_scores.emit_preds {
                let base = match pred.base {
                    Some(b) => b,
                    None => continue,
                };
                let (prev, from) = self.best_incoming(pred.src, pos - 1);
                let score = prev + pred.score + self.mutator.sub_log_prob(base, x);
                let origin = Origin::Emit {
                    src: pred.src,
                    from,
                    input: pred.input,
                };
                best = Some(max_candidate(best, (score, origin)));
            }
        }

        let state_scores = self.scores.states[state.index()].clone();
        for pred in &state_scores.null_preds {
            let prev = self.cell(pred.src, pos, MutatorState::S);
            let score = prev + pred.score;
            let origin = Origin::Null {
                src: pred.src,
                input: pred.input,
            };
            best = Some(max_candidate(best, (score, origin)));
        }

        match best {
            Some((score, origin)) => self.improve_cell(state, pos, MutatorState::S, score, origin),
            None => false,
        }
    }

    fn fill_cell_d(&mut self, state: StateIndex, pos: usize) -> bool {
        let mut best: Option<(LogProb, Origin)> = None;

        // A deletion consumes no observed symbol, so the emit-predecessor's
        // cell is read at the *same* position `pos`, not `pos - 1`; this
        // recurrence is defined for every `pos >= 0`, unlike the S-layer's.
        let state_scores = self.scores.states[state.index()].clone();
        for pred in &state_scores.emit_preds {
            let base = match pred.base {
                Some(b) => b,
                None => continue,
            };
            let (prev, from) = self.best_incoming(pred.src, pos);
            let score = prev + pred.score + self.mutator.del_log_prob(base);
            let origin = Origin::Delete {
                src: pred.src,
                from,
                input: pred.input,
            };
            best = Some(max_candidate(best, (score, origin)));
        }

        let state_scores = self.scores.states[state.index()].clone();
        for pred in &state_scores.null_preds {
            let prev = self.cell(pred.src, pos, MutatorState::D);
            let score = prev + pred.score;
            let origin = Origin::Null {
                src: pred.src,
                input: pred.input,
            };
            best = Some(max_candidate(best, (score, origin)));
        }

        match best {
            Some((score, origin)) => self.improve_cell(state, pos, MutatorState::D, score, origin),
            None => false,
        }
    }

    fn fill_cell_t(&mut self, state: StateIndex, pos: usize, k: usize) -> bool {
        if pos == 0 {
            return false;
        }
        let left_context = self.scores.states[state.index()].left_context.clone();
        let kmax = left_context.len().min(self.mutator.max_dup_len());
        if k >= kmax {
            return false;
        }
        let x = self.seq[pos - 1];
        let anchor_base = left_context[left_context.len() - 1 - k];
        let sub_term = self.mutator.sub_log_prob(anchor_base, x);

        let mut best: Option<(LogProb, Origin)> = None;

        let s_prev = self.cell(state, pos - 1, MutatorState::S);
        let d_prev = self.cell(state, pos - 1, MutatorState::D);
        let (from, start_prev) = if s_prev >= d_prev {
            (MutatorState::S, s_prev)
        } else {
            (MutatorState::D, d_prev)
        };
        let start_score = start_prev + self.mutator.dup_log_prob(k + 1) + sub_term;
        best = Some(max_candidate(best, (start_score, Origin::DupStart { from })));

        if k + 1 < kmax {
            let shift_prev = self.cell(state, pos - 1, MutatorState::T(k + 1));
            let shift_score = shift_prev + sub_term;
            best = Some(max_candidate(best, (shift_score, Origin::DupShift)));
        }

        match best {
            Some((score, origin)) => self.improve_cell(state, pos, MutatorState::T(k), score, origin),
            None => false,
        }
    }

    /// The best total log-likelihood over every end state, including the
    /// mutator's end-state term, along with the traced-back input string.
    /// Returns [`CodecError::Unalignable`] if every end cell is impossible.
    pub fn best_alignment(&self) -> Result<(LogProb, Vec<Token>), CodecError> {
        let seq_len = self.seq.len();
        let mut best: Option<(LogProb, StateIndex, MutatorState)> = None;
        for state in self.machine.state_indices() {
            if !self.machine[state].is_end() {
                continue;
            }
            for &m in &[MutatorState::S, MutatorState::D] {
                let score = self.cell(state, seq_len, m);
                if best.map_or(true, |(b, _, _)| score > b) {
                    best = Some((score, state, m));
                }
            }
        }
        let (score, end_state, end_mut) = best.ok_or(CodecError::Unalignable)?;
        if !score.is_possible() {
            return Err(CodecError::Unalignable);
        }
        let total = score + self.mutator.end_log_prob();
        let input = self.traceback(end_state, seq_len, end_mut)?;
        trace!("best alignment score {} at state {}", total, end_state.index());
        Ok((total, input))
    }

    fn traceback(
        &self,
        end_state: StateIndex,
        end_pos: usize,
        end_mut: MutatorState,
    ) -> Result<Vec<Token>, CodecError> {
        let mut tokens = Vec::new();
        let mut state = end_state;
        let mut pos = end_pos;
        let mut m = end_mut;
        let start = self.machine.start();

        loop {
            if state == start && pos == 0 && m == MutatorState::S {
                break;
            }
            let i = self.index.index(state.index(), pos, m);
            match self.origins[i] {
                Some(Origin::Start) => break,
                Some(Origin::Emit { src, from, input }) => {
                    if input != Token::Null {
                        tokens.push(input);
                    }
                    state = src;
                    pos -= 1;
                    m = from;
                }
                Some(Origin::Delete { src, from, input }) => {
                    // The predecessor's emission was deleted, not observed:
                    // its input symbol is still consumed, but position does
                    // not advance.
                    if input != Token::Null {
                        tokens.push(input);
                    }
                    state = src;
                    m = from;
                }
                Some(Origin::Null { src, input }) => {
                    // Same position, same mutator state: S stays S, D stays D.
                    if input != Token::Null {
                        tokens.push(input);
                    }
                    state = src;
                }
                Some(Origin::DupStart { from }) => {
                    pos -= 1;
                    m = from;
                }
                Some(Origin::DupShift) => {
                    pos -= 1;
                    m = match m {
                        MutatorState::T(k) => MutatorState::T(k + 1),
                        _ => {
                            return Err(CodecError::MalformedMachine(
                                "duplication shift traceback from non-T cell".into(),
                            ))
                        }
                    };
                }
                None => {
                    return Err(CodecError::MalformedMachine(format!(
                        "no backpointer at state {} pos {}",
                        state.index(),
                        pos
                    )))
                }
            }
        }
        tokens.reverse();
        Ok(tokens)
    }
}

fn max_candidate(
    current: Option<(LogProb, Origin)>,
    candidate: (LogProb, Origin),
) -> (LogProb, Origin) {
    match current {
        None => candidate,
        Some(kept) if candidate.0 > kept.0 => candidate,
        Some(kept) => kept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::identity_machine;

    #[test]
    fn noiseless_alignment_recovers_exact_input() {
        let machine = identity_machine().unwrap();
        let model = InputModel::with_control_prob(0.05);
        let mutator = MutatorParams::noiseless(0.999);
        let seq = machine
            .run(&[Token::Sof, Token::Bit0, Token::Bit1, Token::Bit0, Token::Eof])
            .unwrap();
        let lattice = ViterbiLattice::fill(&machine, &model, &mutator, &seq).unwrap();
        let (score, tokens) = lattice.best_alignment().unwrap();
        assert!(score.is_possible());
        assert_eq!(tokens, vec![Token::Sof, Token::Bit0, Token::Bit1, Token::Bit0, Token::Eof]);
    }

    #[test]
    fn substitution_still_finds_an_alignment() {
        let machine = identity_machine().unwrap();
        let model = InputModel::with_control_prob(0.05);
        let mutator = MutatorParams::noiseless(0.97);
        // Clean output for bits 0,1,0 is A,C,A; flip the middle base to G.
        let seq = vec![Base::A, Base::G, Base::A];
        let lattice = ViterbiLattice::fill(&machine, &model, &mutator, &seq).unwrap();
        let (score, _tokens) = lattice.best_alignment().unwrap();
        assert!(score.is_possible());
    }

    #[test]
    fn impossible_observation_is_unalignable() {
        let machine = identity_machine().unwrap();
        let model = InputModel::with_control_prob(0.05);
        let mutator = MutatorParams::noiseless(0.999);
        // Machine can only ever emit A or C; T is never a valid clean output
        // for this machine, and the mutator forbids reaching it from S/D of
        // a non-end start state with zero emitted bases.
        let seq = vec![];
        let lattice = ViterbiLattice::fill(&machine, &model, &mutator, &seq).unwrap();
        // start is not itself an end state in identity_machine, so with an
        // empty sequence the only reachable end-state cell is unreachable.
        assert!(lattice.best_alignment().is_err());
    }
}
