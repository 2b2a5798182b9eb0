//! Demo binary wiring the `dnastore_codec` library into two small commands:
//! `align` (batch Viterbi alignment of a noisy sequence) and `stream`
//! (incremental decoding of a clean one). Neither command parses a
//! transducer from a file (out of scope for the core); both run against one
//! of the two hand-built example machines in [`dnastore_codec::machine`].

use std::io::{self, BufReader, Read, Write};

use clap::Clap;
use fs_err as err_fs;
use log::info;

use dnastore_codec::demo_machine;
use dnastore_codec::fasta;
use dnastore_codec::input_model::InputModel;
use dnastore_codec::mutator::MutatorParams;
use dnastore_codec::options::{AlignOptions, CliOptions, Command, OutputFormat, StreamOptions, TraceLevel};
use dnastore_codec::params::MutatorParamsFile;
use dnastore_codec::streaming::StreamingDecoder;
use dnastore_codec::viterbi::ViterbiLattice;
use dnastore_codec::writer::{BinaryWriter, TextWriter, Writer};

fn main() {
    if let Err(error) = codec_main() {
        let _ = writeln!(io::stderr(), "Error: {}", error);
        std::process::exit(1);
    }
}

/// Initialize the logging framework with the given trace level.
///
/// # Errors
///
/// Returns an error if the logging framework has already been initialized.
fn initialize_logging(level: TraceLevel) -> io::Result<()> {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

fn codec_main() -> Result<(), Box<dyn std::error::Error>> {
    let options = CliOptions::parse();
    initialize_logging(options.trace_level)?;

    match options.command {
        Command::Align(align_options) => run_align(&align_options),
        Command::Stream(stream_options) => run_stream(&stream_options),
    }
}

/// Open `path`, or standard input if `path` is `None`, as a buffered reader.
fn open_input(path: &Option<String>) -> io::Result<Box<dyn io::BufRead>> {
    match path {
        Some(p) => Ok(Box::new(BufReader::new(err_fs::File::open(p)?))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Open `path` for writing, or standard output if `path` is `None`.
fn open_output(path: &Option<String>) -> io::Result<Box<dyn io::Write>> {
    match path {
        Some(p) => Ok(Box::new(err_fs::File::create(p)?)),
        None => Ok(Box::new(io::stdout())),
    }
}

/// Construct the writer selected by `format`/`msb0`, boxed behind the
/// [`Writer`] trait so both commands can share one code path regardless of
/// which concrete writer is in play.
fn make_writer(
    format: OutputFormat,
    msb0: bool,
    sink: Box<dyn io::Write>,
) -> Box<dyn Writer> {
    match format {
        OutputFormat::Text => Box::new(TextWriter::new(sink)),
        OutputFormat::Binary => Box::new(BinaryWriter::new(sink, msb0)),
    }
}

fn run_align(options: &AlignOptions) -> Result<(), Box<dyn std::error::Error>> {
    let machine = demo_machine(options.machine)?;
    let input_model = InputModel::with_control_prob(options.control_prob);
    let mutator = match &options.mutation_params {
        Some(path) => MutatorParamsFile::load(path)?.into_mutator_params()?,
        None => MutatorParams::noiseless(0.97),
    };

    let reader = open_input(&options.input_file)?;
    let observed = fasta::read_first_sequence(reader)?;
    info!("aligning {} observed bases", observed.len());

    let lattice = ViterbiLattice::fill(&machine, &input_model, &mutator, &observed)?;
    let (log_likelihood, tokens) = lattice.best_alignment()?;
    info!("best alignment log-likelihood: {}", log_likelihood);

    let sink = open_output(&options.output_file)?;
    let mut writer = make_writer(options.output_format, options.msb0, sink);
    for token in tokens {
        writer.write_symbol(token)?;
    }
    writer.finish()?;
    Ok(())
}

fn run_stream(options: &StreamOptions) -> Result<(), Box<dyn std::error::Error>> {
    let machine = demo_machine(options.machine)?;
    let mut reader = open_input(&options.input_file)?;
    let mut observed = Vec::new();
    reader.read_to_end(&mut observed)?;

    let sink = open_output(&options.output_file)?;
    let writer = make_writer(options.output_format, options.msb0, sink);
    let mut decoder = StreamingDecoder::construct(&machine, writer)?;
    decoder.decode_string(&observed)?;
    decoder.close()?;
    Ok(())
}
