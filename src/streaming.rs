//! The online streaming decoder (component E): tracks a set of live
//! hypotheses (state -> pending input queue) and commits input symbols to a
//! [`Writer`] as soon as every live hypothesis agrees on them.

use log::warn;
use std::collections::BTreeMap;

use crate::alphabet::{Base, Token};
use crate::error::CodecError;
use crate::machine::{Machine, StateIndex};
use crate::writer::Writer;

type Hypotheses = BTreeMap<StateIndex, Vec<Token>>;

/// Drives a [`Machine`] forward one observed base at a time, committing
/// resolved input symbols to `W` as soon as they stop being ambiguous.
pub struct StreamingDecoder<'a, W: Writer> {
    machine: &'a Machine,
    current: Hypotheses,
    writer: W,
    closed: bool,
}

impl<'a, W: Writer> StreamingDecoder<'a, W> {
    /// Seed the hypothesis set at the machine's start state and run the
    /// initial null closure.
    pub fn construct(machine: &'a Machine, writer: W) -> Result<StreamingDecoder<'a, W>, CodecError> {
        let mut current = BTreeMap::new();
        current.insert(machine.start(), Vec::new());
        let mut decoder = StreamingDecoder {
            machine,
            current,
            writer,
            closed: false,
        };
        decoder.expand()?;
        Ok(decoder)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Decode a single observed base, advancing every live hypothesis along
    /// its usable transitions that emit `o`.
    pub fn decode_symbol(&mut self, o: Base) -> Result<(), CodecError> {
        if self.closed {
            return Err(CodecError::MalformedMachine(
                "decode_symbol called after close".into(),
            ));
        }
        let mut next: Hypotheses = BTreeMap::new();
        for (state, queue) in &self.current {
            for t in self.machine[*state].transitions() {
                if t.output != Some(o) || !t.input.is_usable() {
                    continue;
                }
                let mut q = queue.clone();
                if t.input != Token::Null {
                    q.push(t.input);
                }
                insert_checked(&mut next, t.dest, q)?;
            }
        }
        if next.is_empty() {
            return Err(CodecError::CannotDecode(o));
        }
        self.current = next;
        self.expand()?;

        if self.current.len() == 1 {
            let (&state, _) = self.current.iter().next().unwrap();
            if self.machine[state].exits_with_input() {
                self.flush_single()?;
                return Ok(());
            }
        }
        self.shift_resolved_symbols()
    }

    /// Uppercase each byte of `s` and forward it to [`StreamingDecoder::decode_symbol`].
    pub fn decode_string(&mut self, s: &[u8]) -> Result<(), CodecError> {
        for &byte in s {
            match Base::from_byte(byte.to_ascii_uppercase()) {
                Some(base) => self.decode_symbol(base)?,
                None => warn!("ignoring unrecognized byte {:#04x} in decoded string", byte),
            }
        }
        Ok(())
    }

    /// Repeatedly follow null-output, usable transitions out of every live
    /// hypothesis, preserving a hypothesis once its state is an end state or
    /// emits only non-null output. Errors if two paths reach the same state
    /// with different pending queues.
    fn expand(&mut self) -> Result<(), CodecError> {
        let mut next: Hypotheses = self.current.clone();
        let bound = self.machine.num_states() + 1;
        for _ in 0..bound {
            let snapshot: Vec<(StateIndex, Vec<Token>)> =
                next.iter().map(|(k, v)| (*k, v.clone())).collect();
            let before = next.len();
            for (state, queue) in snapshot {
                for t in self.machine[state].transitions() {
                    if t.output.is_some() || !t.input.is_usable() {
                        continue;
                    }
                    let mut q = queue.clone();
                    if t.input != Token::Null {
                        q.push(t.input);
                    }
                    insert_checked(&mut next, t.dest, q)?;
                }
            }
            if next.len() == before {
                self.current = next
                    .into_iter()
                    .filter(|(s, _)| {
                        let st = &self.machine[*s];
                        st.is_end() || st.emits_output()
                    })
                    .collect();
                return Ok(());
            }
        }
        Err(CodecError::MalformedMachine(
            "null closure did not converge".into(),
        ))
    }

    /// Commit every symbol common to the front of every live, non-empty
    /// queue, in order, stopping at the first disagreement or the first
    /// empty queue.
    fn shift_resolved_symbols(&mut self) -> Result<(), CodecError> {
        loop {
            let mut common: Option<Token> = None;
            for queue in self.current.values() {
                let Some(&front) = queue.first() else {
                    return Ok(());
                };
                match common {
                    None => common = Some(front),
                    Some(c) if c == front => {}
                    Some(_) => return Ok(()),
                }
            }
            let Some(token) = common else {
                return Ok(());
            };
            self.writer.write_symbol(token)?;
            for queue in self.current.values_mut() {
                queue.remove(0);
            }
        }
    }

    /// Drain the single remaining hypothesis's entire queue: with only one
    /// live hypothesis its queue is unambiguous regardless of agreement with
    /// anything else, so every pending symbol can be committed immediately.
    fn flush_single(&mut self) -> Result<(), CodecError> {
        let (&state, _) = self.current.iter().next().expect("single hypothesis");
        let queue = self.current.remove(&state).unwrap();
        for token in &queue {
            self.writer.write_symbol(*token)?;
        }
        self.current.insert(state, Vec::new());
        Ok(())
    }

    /// Terminate decoding. Must be called exactly once; safe to call at most
    /// once explicitly, with a best-effort equivalent run on drop otherwise.
    /// If exactly one live hypothesis is an end state, its queue is flushed.
    /// Multiple end-state hypotheses, or multiple surviving non-end
    /// hypotheses with no end state reached, are reported as warnings (the
    /// non-fatal `UnresolvedAtClose` condition) rather than treated as errors.
    pub fn close(&mut self) -> Result<(), CodecError> {
        if self.closed {
            return Ok(());
        }
        self.expand()?;
        let end_hyps: Vec<StateIndex> = self
            .current
            .keys()
            .copied()
            .filter(|s| self.machine[*s].is_end())
            .collect();
        match end_hyps.len() {
            1 => {
                let state = end_hyps[0];
                let queue = self.current.remove(&state).unwrap();
                for token in &queue {
                    self.writer.write_symbol(*token)?;
                }
            }
            0 => {
                if self.current.len() > 1 {
                    warn!(
                        "unresolved at close: {} live non-end hypotheses remain: {:?}",
                        self.current.len(),
                        self.current
                    );
                }
            }
            _ => {
                warn!(
                    "unresolved at close: {} ambiguous end-state hypotheses: {:?}",
                    end_hyps.len(),
                    end_hyps
                );
            }
        }
        self.writer.finish()?;
        self.closed = true;
        Ok(())
    }
}

impl<'a, W: Writer> Drop for StreamingDecoder<'a, W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!("error closing streaming decoder on drop: {}", e);
            }
        }
    }
}

fn insert_checked(
    map: &mut Hypotheses,
    key: StateIndex,
    value: Vec<Token>,
) -> Result<(), CodecError> {
    match map.get(&key) {
        None => {
            map.insert(key, value);
        }
        Some(existing) if *existing == value => {}
        Some(existing) => {
            return Err(CodecError::QueueConflict {
                state: key,
                existing: existing.clone(),
                new: value,
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{identity_machine, run_length_machine};
    use crate::writer::TextWriter;

    #[test]
    fn decodes_a_clean_sequence_end_to_end() {
        let machine = identity_machine().unwrap();
        let mut buf = Vec::new();
        {
            let writer = TextWriter::new(&mut buf);
            let mut decoder = StreamingDecoder::construct(&machine, writer).unwrap();
            decoder.decode_string(b"ACA").unwrap();
            decoder.close().unwrap();
        }
        // Sof, Bit0, Bit1, Bit0: the trailing Eof is never committed, since
        // its transition is null (no observed base distinguishes "the
        // message just ended" from "the message ended with an explicit
        // Eof"); close() reports this as an unresolved-at-close ambiguity.
        let expected: Vec<u8> = vec![
            Token::Sof.to_byte(),
            Token::Bit0.to_byte(),
            Token::Bit1.to_byte(),
            Token::Bit0.to_byte(),
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn decodes_through_a_null_detour() {
        let machine = run_length_machine().unwrap();
        let mut buf = Vec::new();
        {
            let writer = TextWriter::new(&mut buf);
            let mut decoder = StreamingDecoder::construct(&machine, writer).unwrap();
            decoder.decode_string(b"AG").unwrap();
            decoder.close().unwrap();
        }
        let expected: Vec<u8> = vec![
            Token::Sof.to_byte(),
            Token::Bit0.to_byte(),
            Token::Bit1.to_byte(),
            Token::Eof.to_byte(),
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn cannot_decode_unemittable_base() {
        let machine = identity_machine().unwrap();
        let mut buf = Vec::new();
        let writer = TextWriter::new(&mut buf);
        let mut decoder = StreamingDecoder::construct(&machine, writer).unwrap();
        // identity_machine never emits T.
        let err = decoder.decode_symbol(Base::T).unwrap_err();
        assert!(matches!(err, CodecError::CannotDecode(Base::T)));
    }
}
