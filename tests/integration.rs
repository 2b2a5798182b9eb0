//! Integration tests exercising the Viterbi alignment engine and the
//! streaming decoder together with the full transducer data model, one test
//! per concrete scenario from the top-level specification.

use std::io::Write;

use dnastore_codec::alphabet::{Base, Token};
use dnastore_codec::input_model::InputModel;
use dnastore_codec::logprob::LogProb;
use dnastore_codec::machine::{identity_machine, run_length_machine, Machine, MachineBuilder, Transition};
use dnastore_codec::mutator::MutatorParams;
use dnastore_codec::params::MutatorParamsFile;
use dnastore_codec::streaming::StreamingDecoder;
use dnastore_codec::viterbi::ViterbiLattice;
use dnastore_codec::writer::{BinaryWriter, TextWriter, Writer};

/// Scenario 1: two-state identity transducer, noise-free round trip through
/// both the Viterbi engine and the streaming decoder.
#[test]
fn identity_transducer_round_trips_noise_free() {
    let machine = identity_machine().unwrap();
    let input = vec![
        Token::Sof,
        Token::Bit0,
        Token::Bit1,
        Token::Bit1,
        Token::Bit0,
        Token::Eof,
    ];
    let clean_output = machine.run(&input).unwrap();
    assert_eq!(clean_output, vec![Base::A, Base::C, Base::C, Base::A]);

    let model = InputModel::with_control_prob(0.01);
    let mutator = MutatorParams::noiseless(0.999);
    let lattice = ViterbiLattice::fill(&machine, &model, &mutator, &clean_output).unwrap();
    let (score, tokens) = lattice.best_alignment().unwrap();
    assert!(score.is_possible());
    assert_eq!(tokens, input);

    let mut buf = Vec::new();
    {
        let writer = TextWriter::new(&mut buf);
        let mut decoder = StreamingDecoder::construct(&machine, writer).unwrap();
        let observed: Vec<u8> = clean_output.iter().map(|b| b.to_byte()).collect();
        decoder.decode_string(&observed).unwrap();
        decoder.close().unwrap();
    }
    // The trailing Eof is a null transition out of `body`, which is itself
    // marked as an end state (so the machine can also terminate without an
    // explicit Eof): close() therefore finds two end-state hypotheses and
    // reports the ambiguity instead of flushing Eof. Everything up to that
    // point is unambiguous and gets committed.
    let expected: Vec<u8> = vec![
        Token::Sof.to_byte(),
        Token::Bit0.to_byte(),
        Token::Bit1.to_byte(),
        Token::Bit1.to_byte(),
        Token::Bit0.to_byte(),
    ];
    assert_eq!(buf, expected);
}

/// Scenario 2: a single deleted base should still resolve to the original
/// input under the Viterbi engine.
///
/// `identity_machine` accepts any A/C string of any length as a zero-mutation
/// explanation of itself, so deleting one base from its output always leaves
/// a *shorter* string that is itself trivially explainable with no mutation
/// at all, which Viterbi will always prefer over invoking a deletion. Only a
/// transducer whose valid clean outputs are constrained to specific lengths
/// forces the aligner to actually use the mutator's deletion path, so this
/// test (and the duplication one below) runs against `repetition_machine`
/// instead, which has exactly one valid zero-mutation output for the whole
/// message.
#[test]
fn viterbi_recovers_input_through_a_single_deletion() {
    let machine = repetition_machine();
    let input = vec![Token::Sof, Token::Bit0, Token::Bit1, Token::Eof];
    let clean_output = machine.run(&input).unwrap();
    assert_eq!(clean_output, vec![Base::A, Base::A, Base::C, Base::C]);

    // Drop the second base: A A C C -> A C C.
    let mutated = vec![Base::A, Base::C, Base::C];

    let model = InputModel::with_control_prob(0.01);
    let sub = high_match_substitution(0.97);
    let mutator = MutatorParams::new(sub, LogProb::from_prob(0.0005), Vec::new(), LogProb::ZERO);
    let lattice = ViterbiLattice::fill(&machine, &model, &mutator, &mutated).unwrap();
    let (score, tokens) = lattice.best_alignment().unwrap();
    assert!(score.is_possible());
    assert_eq!(tokens, input);
}

/// Scenario 3: a one-base tandem duplication should still resolve to the
/// original input when duplication is enabled. See the note on the deletion
/// test above for why this runs against `repetition_machine` rather than
/// `identity_machine`.
#[test]
fn viterbi_recovers_input_through_a_tandem_duplication() {
    let machine = repetition_machine();
    let input = vec![Token::Sof, Token::Bit0, Token::Bit1, Token::Eof];
    let clean_output = machine.run(&input).unwrap();
    assert_eq!(clean_output, vec![Base::A, Base::A, Base::C, Base::C]);

    // Duplicate the last emitted base: A A C C -> A A C C C.
    let mutated = vec![Base::A, Base::A, Base::C, Base::C, Base::C];

    let model = InputModel::with_control_prob(0.01);
    let sub = high_match_substitution(0.97);
    let mutator = MutatorParams::new(
        sub,
        LogProb::from_prob(0.0005),
        vec![LogProb::from_prob(0.02)],
        LogProb::ZERO,
    );
    let lattice = ViterbiLattice::fill(&machine, &model, &mutator, &mutated).unwrap();
    let (score, tokens) = lattice.best_alignment().unwrap();
    assert!(score.is_possible());
    assert_eq!(tokens, input);
}

/// Scenario 4: a transducer with a genuine null-transition detour between
/// consumed bits. The streaming decoder's pending queue across the detour
/// should equal the concatenation of the input symbols of every null
/// transition it passes through, and the final committed stream should
/// recover the whole framed input.
#[test]
fn streaming_decoder_commits_through_a_null_detour() {
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

/// Scenario 5: a transducer with two end-states reachable by distinct null
/// paths from a common emitter. After draining input, close() must not
/// silently pick one: it should discard the trailing ambiguous symbol
/// rather than fabricate a commitment.
#[test]
fn close_reports_ambiguity_instead_of_guessing() {
    let machine = identity_machine().unwrap();
    let mut buf = Vec::new();
    let writer = TextWriter::new(&mut buf);
    let mut decoder = StreamingDecoder::construct(&machine, writer).unwrap();
    decoder.decode_string(b"A").unwrap();
    decoder.close().unwrap();
    // Sof and Bit0 are unambiguous; the trailing (implicit-or-explicit) Eof
    // is not, since `body` doubles as an end state, so it is never written.
    assert_eq!(buf, vec![Token::Sof.to_byte(), Token::Bit0.to_byte()]);
}

/// Scenario 6: the binary writer packs bits into bytes in the order its
/// `msb0` flag selects.
#[test]
fn binary_writer_respects_bit_order() {
    let bits = [true, false, true, true, false, false, false, true];

    let mut lsb_first = Vec::new();
    {
        let mut w = BinaryWriter::new(&mut lsb_first, false);
        for &bit in &bits {
            w.write_symbol(if bit { Token::Bit1 } else { Token::Bit0 })
                .unwrap();
        }
        w.finish().unwrap();
    }
    assert_eq!(lsb_first, vec![0x8D]);

    let mut msb_first = Vec::new();
    {
        let mut w = BinaryWriter::new(&mut msb_first, true);
        for &bit in &bits {
            w.write_symbol(if bit { Token::Bit1 } else { Token::Bit0 })
                .unwrap();
        }
        w.finish().unwrap();
    }
    assert_eq!(msb_first, vec![0xB1]);
}

/// Mutation parameters loaded from a TOML file on disk should produce the
/// same alignment as the same parameters built directly in memory.
#[test]
fn mutation_params_loaded_from_file_align_identically() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "deletion = 0.0005").unwrap();
    writeln!(file, "duplication = []").unwrap();
    writeln!(file, "end = 0.01").unwrap();
    for (base, match_prob) in [('A', 0.97), ('C', 0.97), ('G', 0.97), ('T', 0.97)] {
        let mismatch = (1.0 - match_prob - 0.0005) / 3.0;
        writeln!(file, "[[substitution]]").unwrap();
        writeln!(file, "true_base = \"{}\"", base).unwrap();
        writeln!(
            file,
            "probabilities = {{ A = {a}, C = {c}, G = {g}, T = {t} }}",
            a = if base == 'A' { match_prob } else { mismatch },
            c = if base == 'C' { match_prob } else { mismatch },
            g = if base == 'G' { match_prob } else { mismatch },
            t = if base == 'T' { match_prob } else { mismatch },
        )
        .unwrap();
    }
    file.flush().unwrap();

    let loaded = MutatorParamsFile::load(file.path())
        .unwrap()
        .into_mutator_params()
        .unwrap();

    let machine = identity_machine().unwrap();
    let model = InputModel::with_control_prob(0.01);
    let input = vec![Token::Sof, Token::Bit0, Token::Bit1, Token::Eof];
    let clean_output = machine.run(&input).unwrap();

    let lattice = ViterbiLattice::fill(&machine, &model, &loaded, &clean_output).unwrap();
    let (score, tokens) = lattice.best_alignment().unwrap();
    assert!(score.is_possible());
    assert_eq!(tokens, input);
}

/// A linear, non-looping transducer with exactly one valid message
/// (`Bit0` then `Bit1`), each bit doubled into a repeated base (`Bit0` ->
/// `AA`, `Bit1` -> `CC`). Every state has a single predecessor, so unlike the
/// two demo machines its set of zero-mutation clean outputs is a single
/// fixed-length string rather than every string over the output alphabet;
/// that is what makes it useful for testing deletion/duplication recovery,
/// where the interesting case is an observed sequence with no zero-mutation
/// explanation of its own.
fn repetition_machine() -> Machine {
    let mut b = MachineBuilder::new();
    let start = b.add_state(false);
    let s1 = b.add_state(false);
    let s2 = b.add_state(false);
    let s3 = b.add_state(false);
    let s4 = b.add_state(false);
    let s5 = b.add_state(false);
    let end = b.add_state(true);
    b.add_transition(
        start,
        Transition {
            dest: s1,
            input: Token::Sof,
            output: None,
        },
    );
    b.add_transition(
        s1,
        Transition {
            dest: s2,
            input: Token::Bit0,
            output: Some(Base::A),
        },
    );
    b.add_transition(
        s2,
        Transition {
            dest: s3,
            input: Token::Null,
            output: Some(Base::A),
        },
    );
    b.add_transition(
        s3,
        Transition {
            dest: s4,
            input: Token::Bit1,
            output: Some(Base::C),
        },
    );
    b.add_transition(
        s4,
        Transition {
            dest: s5,
            input: Token::Null,
            output: Some(Base::C),
        },
    );
    b.add_transition(
        s5,
        Transition {
            dest: end,
            input: Token::Eof,
            output: None,
        },
    );
    b.finalize(start).unwrap()
}

fn high_match_substitution(match_prob: f64) -> [[LogProb; 4]; 4] {
    let mismatch = (1.0 - match_prob) / 3.0;
    let mut sub = [[LogProb::NEG_INFINITY; 4]; 4];
    for a in 0..4 {
        for b in 0..4 {
            let p = if a == b { match_prob } else { mismatch };
            sub[a][b] = LogProb::from_prob(p);
        }
    }
    sub
}
