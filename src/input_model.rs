//! Probability mass function over the input alphabet (plain bits plus control
//! tokens), used to score transitions during score-table construction.

use std::collections::HashMap;

use crate::alphabet::{Token, NUM_CONTROL};
use crate::logprob::LogProb;

/// A PMF over [`Token`] values that can appear as a transition's input label.
#[derive(Debug, Clone)]
pub struct InputModel {
    log_probs: HashMap<Token, LogProb>,
}

impl InputModel {
    /// Build a model from explicit probabilities. `control` gives one
    /// probability per control index `0..NUM_CONTROL`; `SOF`/`EOF` are given
    /// separately since they are structurally distinct control tokens.
    pub fn new(p_bit0: f64, p_bit1: f64, p_sof: f64, p_eof: f64, control: &[f64]) -> InputModel {
        assert_eq!(control.len(), NUM_CONTROL as usize);
        let mut log_probs = HashMap::new();
        log_probs.insert(Token::Bit0, LogProb::from_prob(p_bit0));
        log_probs.insert(Token::Bit1, LogProb::from_prob(p_bit1));
        log_probs.insert(Token::Sof, LogProb::from_prob(p_sof));
        log_probs.insert(Token::Eof, LogProb::from_prob(p_eof));
        for (i, &p) in control.iter().enumerate() {
            log_probs.insert(Token::Control(i as u8), LogProb::from_prob(p));
        }
        InputModel { log_probs }
    }

    /// Convenience constructor: distribute `p_ctrl` uniformly across every
    /// control-class token (`SOF`, `EOF`, and all indexed control tokens), and
    /// the remaining `1 - p_ctrl` uniformly across the two plain input bits.
    ///
    /// This distribution does not depend on sequence position: the input
    /// model has no notion of position, so `SOF`/`EOF` receive the same mass
    /// wherever a plain input symbol could occur. Confining control tokens to
    /// sequence endpoints is a property of the transducer's topology (which
    /// transitions exist at which states), not of this PMF.
    pub fn with_control_prob(p_ctrl: f64) -> InputModel {
        assert!((0.0..=1.0).contains(&p_ctrl));
        let num_control_tokens = NUM_CONTROL as usize + 2; // + SOF + EOF
        let p_each_control = p_ctrl / num_control_tokens as f64;
        let p_each_bit = (1.0 - p_ctrl) / 2.0;
        InputModel::new(
            p_each_bit,
            p_each_bit,
            p_each_control,
            p_each_control,
            &vec![p_each_control; NUM_CONTROL as usize],
        )
    }

    /// Probability of a transition's input label under this model. `Null`
    /// carries no choice among input symbols at all (the transition consumes
    /// nothing), so it always scores as certain (log-probability zero)
    /// rather than looked up in the PMF.
    pub fn log_prob(&self, token: Token) -> LogProb {
        if token == Token::Null {
            return LogProb::ZERO;
        }
        self.log_probs
            .get(&token)
            .copied()
            .unwrap_or(LogProb::NEG_INFINITY)
    }
}
