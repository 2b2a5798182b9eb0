//! Mutator-state tagged variant and flat cell indexing (component B) for the
//! Viterbi lattice: `state x position x mutator-state`.

/// Where a cell sits within a tandem-duplication/substitution/deletion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutatorState {
    /// Substitution/match: the previous emission survived, possibly mutated.
    S,
    /// Deletion: the previous emission was dropped, no observed symbol consumed.
    D,
    /// Mid tandem-duplication, `k` positions from the end of the duplicated run.
    T(usize),
}

/// Flat indexing into the Viterbi lattice. Mutator-state is the innermost
/// (unit-stride) axis, matching `cellIndex(state,pos,mutState) =
/// (maxDupLen+2)*(pos*nStates+state)+mutState`.
#[derive(Debug, Clone, Copy)]
pub struct CellIndex {
    n_states: usize,
    max_dup_len: usize,
}

impl CellIndex {
    pub fn new(n_states: usize, max_dup_len: usize) -> CellIndex {
        CellIndex {
            n_states,
            max_dup_len,
        }
    }

    pub fn mut_states_per_cell(&self) -> usize {
        self.max_dup_len + 2
    }

    pub fn max_dup_len(&self) -> usize {
        self.max_dup_len
    }

    fn mut_state_slot(&self, m: MutatorState) -> usize {
        match m {
            MutatorState::S => 0,
            MutatorState::D => 1,
            MutatorState::T(k) => {
                debug_assert!(k < self.max_dup_len);
                2 + k
            }
        }
    }

    pub fn index(&self, state: usize, pos: usize, m: MutatorState) -> usize {
        self.mut_states_per_cell() * (pos * self.n_states + state) + self.mut_state_slot(m)
    }

    pub fn len(&self, seq_len: usize) -> usize {
        self.mut_states_per_cell() * self.n_states * (seq_len + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutator_state_is_innermost_axis() {
        let idx = CellIndex::new(3, 2);
        assert_eq!(idx.index(0, 0, MutatorState::S) + 1, idx.index(0, 0, MutatorState::D));
        assert_eq!(
            idx.index(0, 0, MutatorState::D) + 1,
            idx.index(0, 0, MutatorState::T(0))
        );
    }

    #[test]
    fn indices_are_distinct_across_states_and_positions() {
        let idx = CellIndex::new(3, 1);
        let a = idx.index(1, 2, MutatorState::S);
        let b = idx.index(2, 2, MutatorState::S);
        let c = idx.index(1, 3, MutatorState::S);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
