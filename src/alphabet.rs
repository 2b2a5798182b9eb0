//! Wire alphabets: the input/control token set consumed and produced by the
//! transducer's input side, and the output/base alphabet it emits.

use std::fmt;

/// Number of reserved control-token slots on the wire (`Control(0)..Control(NUM_CONTROL-1)`).
pub const NUM_CONTROL: u8 = 13;

const NULL_BYTE: u8 = 0x00;
const SOF_BYTE: u8 = 0x01;
const EOF_BYTE: u8 = 0x02;
const CONTROL_BASE: u8 = 0x03;
const BIT0_BYTE: u8 = b'0';
const BIT1_BYTE: u8 = b'1';

/// A token from the input alphabet, a control token, or the explicit null symbol.
///
/// These are the four disjoint "input side" token classes from the data model:
/// plain input bits, indexed control tokens, the frame markers `SOF`/`EOF`, and
/// `Null` (no input consumed on a transition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    Bit0,
    Bit1,
    Null,
    Sof,
    Eof,
    Control(u8),
}

impl Token {
    /// The reserved wire byte for this token.
    pub fn to_byte(self) -> u8 {
        match self {
            Token::Null => NULL_BYTE,
            Token::Sof => SOF_BYTE,
            Token::Eof => EOF_BYTE,
            Token::Bit0 => BIT0_BYTE,
            Token::Bit1 => BIT1_BYTE,
            Token::Control(i) => CONTROL_BASE + i,
        }
    }

    /// True iff the token is one of the classes the decoder recognizes: null, a
    /// bit, `SOF`, `EOF`, or a control token. Every [`Token`] value satisfies this
    /// by construction; the predicate exists because the spec defines usability
    /// as a property checked on transitions, not assumed of them.
    pub fn is_usable(self) -> bool {
        true
    }

    pub fn is_control(self) -> bool {
        matches!(self, Token::Control(_) | Token::Sof | Token::Eof)
    }

    /// The control index of a control-class token, or `None` for a plain bit or null.
    pub fn control_index(self) -> Option<u8> {
        match self {
            Token::Control(i) => Some(i),
            Token::Sof => Some(NUM_CONTROL),
            Token::Eof => Some(NUM_CONTROL + 1),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Bit0 => write!(f, "0"),
            Token::Bit1 => write!(f, "1"),
            Token::Null => write!(f, "-"),
            Token::Sof => write!(f, "SOF"),
            Token::Eof => write!(f, "EOF"),
            Token::Control(i) => write!(f, "CTRL{}", i),
        }
    }
}

/// Classify a raw wire byte into a [`Token`], or `None` if the byte is not one
/// of the recognized classes (it should then be ignored with a warning).
pub fn classify_token(byte: u8) -> Option<Token> {
    match byte {
        NULL_BYTE => Some(Token::Null),
        SOF_BYTE => Some(Token::Sof),
        EOF_BYTE => Some(Token::Eof),
        BIT0_BYTE => Some(Token::Bit0),
        BIT1_BYTE => Some(Token::Bit1),
        b if (CONTROL_BASE..CONTROL_BASE + NUM_CONTROL).contains(&b) => {
            Some(Token::Control(b - CONTROL_BASE))
        }
        _ => None,
    }
}

/// The output/base alphabet: what the transducer emits and the mutator mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Base {
    A,
    C,
    G,
    T,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

    /// Dense index in `0..4`, used to index substitution-matrix rows/columns.
    pub fn index(self) -> usize {
        match self {
            Base::A => 0,
            Base::C => 1,
            Base::G => 2,
            Base::T => 3,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Base::A => b'A',
            Base::C => b'C',
            Base::G => b'G',
            Base::T => b'T',
        }
    }

    /// Classify an (already uppercased) byte as a base, or `None` if unrecognized.
    pub fn from_byte(byte: u8) -> Option<Base> {
        match byte {
            b'A' => Some(Base::A),
            b'C' => Some(Base::C),
            b'G' => Some(Base::G),
            b'T' => Some(Base::T),
            _ => None,
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_byte() as char)
    }
}
