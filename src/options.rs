//! Command-line options for the demo `codec` binary.
//!
//! Mirrors the teacher's `options.rs` shape: small `clap::Clap`-derived enums
//! with a `clap_display!` macro that keeps each enum's `Display` impl in sync
//! with the strings `clap::ArgEnum` parses, a `TraceLevel` enum that converts
//! into a `log::LevelFilter`, and a top-level options struct that
//! `clap::Clap::parse` is called on directly in `main`.

use clap::Clap;
use std::str::FromStr;

/// Implement [`Display`](std::fmt::Display) with the same string
/// [`clap::ArgEnum`] parses, so round-tripping an option through the CLI and
/// printing it with `{}` always agree.
macro_rules! clap_display {
    ($t:ty) => {
        impl std::fmt::Display for $t
        where
            $t: clap::ArgEnum,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                use clap::ArgEnum as _;
                let self_str = Self::VARIANTS
                    .iter()
                    .find(|s| &Self::from_str(s, false).unwrap() == self)
                    .unwrap();
                write!(f, "{}", self_str)
            }
        }
    };
}

/// The trace level / verbosity for the logging framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Clap)]
pub enum TraceLevel {
    /// Turn logging off.
    #[clap(name = "off")]
    Off,
    /// Only print errors.
    #[clap(name = "error")]
    Error,
    /// Print errors and warnings.
    #[clap(name = "warn")]
    Warn,
    /// Print errors, warnings and useful information.
    #[clap(name = "info")]
    Info,
    /// Print errors, warnings, useful and debug information.
    #[clap(name = "debug")]
    Debug,
    /// Print all information, including very verbose output.
    #[clap(name = "trace")]
    Trace,
}
impl Default for TraceLevel {
    fn default() -> Self {
        Self::Warn
    }
}
clap_display!(TraceLevel);

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => Self::Off,
            TraceLevel::Error => Self::Error,
            TraceLevel::Warn => Self::Warn,
            TraceLevel::Info => Self::Info,
            TraceLevel::Debug => Self::Debug,
            TraceLevel::Trace => Self::Trace,
        }
    }
}

/// Which built-in transducer a command should run against. The core crate
/// has no transducer parser (out of scope, see the crate's top-level
/// documentation), so the demo binary only ever drives one of the two
/// hand-built example machines in [`crate::machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Clap)]
pub enum DemoMachine {
    /// The straight-through identity transducer (bit 0 -> A, bit 1 -> C).
    #[clap(name = "identity")]
    Identity,
    /// The transducer with a null-transition resync detour between bits
    /// (bit 0 -> A, bit 1 -> G).
    #[clap(name = "run-length")]
    RunLength,
}
impl Default for DemoMachine {
    fn default() -> Self {
        Self::Identity
    }
}
clap_display!(DemoMachine);

/// How the recovered input tokens are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Clap)]
pub enum OutputFormat {
    /// Every resolved token's wire byte, verbatim.
    #[clap(name = "text")]
    Text,
    /// Plain input bits only, packed 8 to a byte.
    #[clap(name = "binary")]
    Binary,
}
impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}
clap_display!(OutputFormat);

/// Top-level options shared by every subcommand, plus the subcommand itself.
#[derive(Debug, Clone, Clap)]
#[clap(version, about)]
pub struct CliOptions {
    /// The trace level to use for instantiating the logging framework.
    #[clap(
        arg_enum,
        short = 't',
        long = "trace",
        name = "trace-level",
        default_value,
        about = "Trace level",
        display_order = 0
    )]
    pub trace_level: TraceLevel,

    /// Which core operation to run.
    #[clap(subcommand)]
    pub command: Command,
}

/// The two core operations this crate exposes, matching the two halves of
/// the spec: batch Viterbi alignment of a noisy sequence, and incremental
/// streaming decoding of a clean one.
#[derive(Debug, Clone, Clap)]
pub enum Command {
    /// Recover the maximum-likelihood input for a noisy observed sequence.
    Align(AlignOptions),
    /// Recover the exact input for a noise-free observed sequence, online.
    Stream(StreamOptions),
}

/// Options for the batch Viterbi alignment command.
#[derive(Debug, Clone, Clap)]
pub struct AlignOptions {
    /// The transducer to align the observed sequence against.
    #[clap(
        arg_enum,
        long = "machine",
        default_value,
        about = "Demo transducer to align against",
        display_order = 0
    )]
    pub machine: DemoMachine,

    /// A TOML file of mutator parameters (substitution/deletion/duplication/
    /// end probabilities). Falls back to a low, uniform-mismatch noise model
    /// if omitted.
    #[clap(
        long = "mutation-params",
        about = "TOML file of mutator parameters",
        display_order = 1
    )]
    pub mutation_params: Option<String>,

    /// The control-token probability mass for the input model; see
    /// [`crate::input_model::InputModel::with_control_prob`].
    #[clap(
        long = "control-prob",
        default_value = "0.01",
        about = "Input-model control-token probability mass",
        display_order = 2
    )]
    pub control_prob: f64,

    /// A FASTA file holding the observed (possibly mutated) base sequence.
    /// Reads from standard input if omitted.
    #[clap(
        short = 'i',
        long = "input",
        about = "FASTA file of the observed sequence (reads stdin if omitted)",
        display_order = 3
    )]
    pub input_file: Option<String>,

    /// How to write the recovered input tokens.
    #[clap(
        arg_enum,
        long = "format",
        default_value,
        about = "Writer format for the recovered input",
        display_order = 4
    )]
    pub output_format: OutputFormat,

    /// Bit order for the binary writer; see
    /// [`crate::writer::BinaryWriter::new`].
    #[clap(
        long = "msb0",
        about = "Pack bits most-significant-bit first in binary output",
        display_order = 5
    )]
    pub msb0: bool,

    /// The file to write the recovered input to. Writes to standard output
    /// if omitted.
    #[clap(
        short = 'O',
        long = "output-file",
        about = "Write recovered input to the given file",
        display_order = 6
    )]
    pub output_file: Option<String>,
}

/// Options for the incremental streaming decoder command.
#[derive(Debug, Clone, Clap)]
pub struct StreamOptions {
    /// The transducer to decode the observed sequence against.
    #[clap(
        arg_enum,
        long = "machine",
        default_value,
        about = "Demo transducer to decode against",
        display_order = 0
    )]
    pub machine: DemoMachine,

    /// A file of observed (clean) output bytes. Reads from standard input if
    /// omitted.
    #[clap(
        short = 'i',
        long = "input",
        about = "File of observed output bytes (reads stdin if omitted)",
        display_order = 1
    )]
    pub input_file: Option<String>,

    /// How to write the recovered input tokens.
    #[clap(
        arg_enum,
        long = "format",
        default_value,
        about = "Writer format for the recovered input",
        display_order = 2
    )]
    pub output_format: OutputFormat,

    /// Bit order for the binary writer; see
    /// [`crate::writer::BinaryWriter::new`].
    #[clap(
        long = "msb0",
        about = "Pack bits most-significant-bit first in binary output",
        display_order = 3
    )]
    pub msb0: bool,

    /// The file to write the recovered input to. Writes to standard output
    /// if omitted.
    #[clap(
        short = 'O',
        long = "output-file",
        about = "Write recovered input to the given file",
        display_order = 4
    )]
    pub output_file: Option<String>,
}
