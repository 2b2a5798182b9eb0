//! Crate error type. Kept as a plain hand-rolled `std::error::Error` impl,
//! matching the teacher's style of not reaching for `thiserror`/`anyhow` for a
//! small, closed error set.

use std::fmt;
use std::io;

use crate::alphabet::{Base, Token};
use crate::machine::StateIndex;

/// Fatal errors that abort an alignment or decode in progress. Non-fatal
/// conditions (`UnresolvedAtClose`, a partial byte at writer shutdown, an
/// unrecognized wire byte) are not represented here: they are reported via
/// `log::warn!` at the call site instead, per the warning/fatal split in the
/// error taxonomy.
#[derive(Debug)]
pub enum CodecError {
    /// No alignment of the observed sequence to the transducer has non-zero
    /// probability under the mutator model.
    Unalignable,
    /// Two hypotheses converged on the same state with different pending
    /// input queues during null-closure expansion; the transducer is not
    /// well-formed for online decoding.
    QueueConflict {
        state: StateIndex,
        existing: Vec<Token>,
        new: Vec<Token>,
    },
    /// No live hypothesis has an outgoing transition that emits the observed
    /// base; the stream as decoded so far is inconsistent with the machine.
    CannotDecode(Base),
    /// A structural invariant of the transducer itself was violated (a
    /// null-transition cycle, or a dead end with no way to consume
    /// remaining input).
    MalformedMachine(String),
    /// A loaded mutation-parameter file failed validation.
    InvalidConfig(String),
    Io(io::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Unalignable => write!(f, "no alignment has non-zero probability"),
            CodecError::QueueConflict {
                state,
                existing,
                new,
            } => write!(
                f,
                "conflicting pending-input queues at state {}: {:?} vs {:?}",
                state.index(),
                existing,
                new
            ),
            CodecError::CannotDecode(base) => {
                write!(f, "no live hypothesis can emit observed base {}", base)
            }
            CodecError::MalformedMachine(msg) => write!(f, "malformed transducer: {}", msg),
            CodecError::InvalidConfig(msg) => write!(f, "invalid mutation parameters: {}", msg),
            CodecError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        CodecError::Io(e)
    }
}
