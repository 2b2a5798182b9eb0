//! Writer contract for the committed input stream: a [`Writer`] accepts the
//! tokens an alignment or streaming decode resolves, in order. [`TextWriter`]
//! writes each token's wire byte verbatim; [`BinaryWriter`] packs plain bits
//! into bytes and discards (with a warning) anything else.

use log::warn;
use std::io;

use crate::alphabet::Token;

/// Consumes a stream of resolved [`Token`]s, one at a time.
pub trait Writer {
    fn write_symbol(&mut self, token: Token) -> io::Result<()>;

    /// Called exactly once when the producing decoder is done. The default
    /// no-op is right for writers with no trailing state to flush.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes every token's wire byte verbatim, including control tokens.
pub struct TextWriter<W: io::Write> {
    inner: W,
}

impl<W: io::Write> TextWriter<W> {
    pub fn new(inner: W) -> TextWriter<W> {
        TextWriter { inner }
    }
}

impl<W: io::Write> Writer for TextWriter<W> {
    fn write_symbol(&mut self, token: Token) -> io::Result<()> {
        self.inner.write_all(&[token.to_byte()])
    }
}

/// Packs plain input bits into bytes. Control tokens, `SOF`, `EOF`, and any
/// other non-bit token are ignored with a warning rather than written.
///
/// Bit order within a byte is controlled by `msb0`: when true, the first bit
/// of a byte lands in its most-significant position; when false, in its
/// least-significant position. A byte is flushed to the inner writer as soon
/// as 8 bits have accumulated.
pub struct BinaryWriter<W: io::Write> {
    inner: W,
    msb0: bool,
    pending: Vec<bool>,
    finished: bool,
}

impl<W: io::Write> BinaryWriter<W> {
    pub fn new(inner: W, msb0: bool) -> BinaryWriter<W> {
        BinaryWriter {
            inner,
            msb0,
            pending: Vec::with_capacity(8),
            finished: false,
        }
    }

    fn push_bit(&mut self, bit: bool) -> io::Result<()> {
        self.pending.push(bit);
        if self.pending.len() == 8 {
            let byte = self.pack_byte();
            self.pending.clear();
            self.inner.write_all(&[byte])?;
        }
        Ok(())
    }

    fn pack_byte(&self) -> u8 {
        let mut byte = 0u8;
        for (n, &bit) in self.pending.iter().enumerate() {
            if !bit {
                continue;
            }
            let shift = if self.msb0 { 7 - n } else { n };
            byte |= 1 << shift;
        }
        byte
    }
}

impl<W: io::Write> Writer for BinaryWriter<W> {
    fn write_symbol(&mut self, token: Token) -> io::Result<()> {
        match token {
            Token::Bit0 => self.push_bit(false),
            Token::Bit1 => self.push_bit(true),
            other => {
                warn!("binary writer ignoring non-bit token {}", other);
                Ok(())
            }
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            warn!(
                "binary writer discarding {} leftover bit(s) at close",
                self.pending.len()
            );
            if !self.msb0 {
                self.pending.reverse();
            }
            self.pending.clear();
        }
        self.finished = true;
        Ok(())
    }
}

impl<W: io::Write> Drop for BinaryWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_writer_packs_lsb_first() {
        let mut buf = Vec::new();
        {
            let mut w = BinaryWriter::new(&mut buf, false);
            for &bit in &[true, false, true, true, false, false, false, true] {
                w.write_symbol(if bit { Token::Bit1 } else { Token::Bit0 }).unwrap();
            }
            w.finish().unwrap();
        }
        assert_eq!(buf, vec![0x8D]);
    }

    #[test]
    fn binary_writer_packs_msb_first() {
        let mut buf = Vec::new();
        {
            let mut w = BinaryWriter::new(&mut buf, true);
            for &bit in &[true, false, true, true, false, false, false, true] {
                w.write_symbol(if bit { Token::Bit1 } else { Token::Bit0 }).unwrap();
            }
            w.finish().unwrap();
        }
        assert_eq!(buf, vec![0xB1]);
    }

    #[test]
    fn binary_writer_ignores_control_tokens() {
        let mut buf = Vec::new();
        let mut w = BinaryWriter::new(&mut buf, false);
        w.write_symbol(Token::Sof).unwrap();
        w.write_symbol(Token::Bit1).unwrap();
        w.write_symbol(Token::Eof).unwrap();
        w.finish().unwrap();
        assert!(buf.is_empty()); // only one bit ever arrived, never fills a byte
    }

    #[test]
    fn text_writer_writes_verbatim_bytes() {
        let mut buf = Vec::new();
        let mut w = TextWriter::new(&mut buf);
        w.write_symbol(Token::Bit1).unwrap();
        w.write_symbol(Token::Sof).unwrap();
        assert_eq!(buf, vec![Token::Bit1.to_byte(), Token::Sof.to_byte()]);
    }
}
