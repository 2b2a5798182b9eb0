//! Mutator parameters: the noisy-channel model applied to a transducer's
//! clean output, in log-space.

use crate::alphabet::Base;
use crate::logprob::LogProb;

/// Substitution/deletion/duplication/end-state probabilities, already
/// converted to log-space. Built directly or via [`crate::params`] from a
/// loaded configuration file.
#[derive(Debug, Clone)]
pub struct MutatorParams {
    /// `sub[a][b]` = log P(true base `a` observed as `b`).
    sub: [[LogProb; 4]; 4],
    del: LogProb,
    /// `dup[k]` = log P(a tandem duplication of length `k + 1` begins here).
    dup: Vec<LogProb>,
    end: LogProb,
}

impl MutatorParams {
    pub fn new(
        sub: [[LogProb; 4]; 4],
        del: LogProb,
        dup: Vec<LogProb>,
        end: LogProb,
    ) -> MutatorParams {
        MutatorParams { sub, del, dup, end }
    }

    pub fn max_dup_len(&self) -> usize {
        self.dup.len()
    }

    pub fn sub_log_prob(&self, true_base: Base, observed: Base) -> LogProb {
        self.sub[true_base.index()][observed.index()]
    }

    /// Log-probability of a deletion. Uniform over the deleted base in this
    /// model; takes the base for symmetry with [`MutatorParams::sub_log_prob`]
    /// and to leave room for a base-dependent model later.
    pub fn del_log_prob(&self, _true_base: Base) -> LogProb {
        self.del
    }

    /// Log-probability that a tandem duplication of length `length` begins,
    /// for `length` in `1..=max_dup_len()`.
    pub fn dup_log_prob(&self, length: usize) -> LogProb {
        self.dup
            .get(length - 1)
            .copied()
            .unwrap_or(LogProb::NEG_INFINITY)
    }

    pub fn end_log_prob(&self) -> LogProb {
        self.end
    }

    /// A mutator with no deletions, no duplications, and an identity
    /// substitution matrix biased toward the true base: useful for tests that
    /// want a (nearly) noise-free channel.
    pub fn noiseless(match_prob: f64) -> MutatorParams {
        let mismatch = (1.0 - match_prob) / 3.0;
        let mut sub = [[LogProb::NEG_INFINITY; 4]; 4];
        for a in 0..4 {
            for b in 0..4 {
                let p = if a == b { match_prob } else { mismatch };
                sub[a][b] = LogProb::from_prob(p);
            }
        }
        MutatorParams {
            sub,
            del: LogProb::NEG_INFINITY,
            dup: Vec::new(),
            end: LogProb::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_mutator_favors_true_base() {
        let m = MutatorParams::noiseless(0.99);
        assert!(m.sub_log_prob(Base::A, Base::A) > m.sub_log_prob(Base::A, Base::C));
    }

    #[test]
    fn dup_log_prob_out_of_range_is_impossible() {
        let m = MutatorParams::new(
            [[LogProb::ZERO; 4]; 4],
            LogProb::NEG_INFINITY,
            vec![LogProb::from_prob(0.1), LogProb::from_prob(0.05)],
            LogProb::ZERO,
        );
        assert_eq!(m.max_dup_len(), 2);
        assert!(!m.dup_log_prob(3).is_possible());
    }
}
