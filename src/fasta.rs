//! Minimal FASTA reader: enough to pull an observed base sequence out of a
//! `.fasta`/`.fa` file for the demo CLI and integration tests. Header lines
//! (`>...`) are skipped; every other byte is uppercased and classified via
//! [`crate::alphabet::Base::from_byte`], with unrecognized bytes ignored and
//! warned about, matching the wire-byte classification used elsewhere.

use log::warn;
use std::io::BufRead;

use crate::alphabet::Base;
use crate::error::CodecError;

/// Read the first sequence record from `reader`, concatenating every
/// non-header line into one base sequence.
pub fn read_first_sequence(reader: impl BufRead) -> Result<Vec<Base>, CodecError> {
    let mut seq = Vec::new();
    let mut seen_header = false;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            if seen_header {
                break;
            }
            seen_header = true;
            continue;
        }
        for byte in line.bytes() {
            let upper = byte.to_ascii_uppercase();
            match Base::from_byte(upper) {
                Some(b) => seq.push(b),
                None => warn!("ignoring unrecognized byte {:#04x} in fasta record", byte),
            }
        }
    }
    Ok(seq)
}
