//! Command-line surface: `convert` (the driver-facing API from spec.md
//! §6), `dialects` (list/inspect presets, round-trip a dialect file),
//! and `install` (the teacher's ambient "get this on my PATH" helper,
//! kept from `examples/softwaresalt-csv-managed/src/cli.rs`).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert between CSV/INI dialects and JSON", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a file (or stdin) from one dialect/format to another
    Convert(ConvertArgs),
    /// List built-in dialect presets, or dump/validate one as YAML/JSON
    Dialects(DialectsArgs),
    /// Install the synform binary via cargo install
    Install(InstallArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Ini,
    Json,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file path, or `-` for stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file path, or `-`/omitted for stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Source format
    #[arg(long = "from", value_enum)]
    pub from: DataFormat,
    /// Destination format
    #[arg(long = "to", value_enum)]
    pub to: DataFormat,
    /// Dialect preset name (see `dialects list`); required unless
    /// `--dialect-file` is given. Applies to whichever of `--from`/`--to`
    /// is CSV or INI; when both are text formats (a dialect conversion)
    /// use `--from-dialect`/`--to-dialect` instead.
    #[arg(long = "dialect", conflicts_with_all = ["from_dialect", "to_dialect"])]
    pub dialect: Option<String>,
    /// Source dialect preset name, for text-to-text conversions
    #[arg(long = "from-dialect")]
    pub from_dialect: Option<String>,
    /// Destination dialect preset name, for text-to-text conversions
    #[arg(long = "to-dialect")]
    pub to_dialect: Option<String>,
    /// Load the source dialect from a YAML/JSON file instead of a preset
    #[arg(long = "from-dialect-file")]
    pub from_dialect_file: Option<PathBuf>,
    /// Load the destination dialect from a YAML/JSON file instead of a preset
    #[arg(long = "to-dialect-file")]
    pub to_dialect_file: Option<PathBuf>,
    /// Treat the first CSV row as data, not a header
    #[arg(long = "headerless")]
    pub headerless: bool,
    /// Explicit CSV header (comma-separated dotted/indexed paths),
    /// overriding the input's own first row
    #[arg(long = "header", value_delimiter = ',')]
    pub header: Vec<String>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding of the output (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Prepend a byte-order mark to the output
    #[arg(long = "bom")]
    pub bom: bool,
}

#[derive(Debug, Args)]
pub struct DialectsArgs {
    #[command(subcommand)]
    pub mode: DialectsMode,
}

#[derive(Debug, Subcommand)]
pub enum DialectsMode {
    /// List every built-in preset name
    List,
    /// Dump one preset as YAML (or JSON with --output ending in .json)
    Show(DialectsShowArgs),
    /// Load a dialect file and report whether it builds successfully
    Validate(DialectsValidateArgs),
}

#[derive(Debug, Args)]
pub struct DialectsShowArgs {
    /// Preset name (see `dialects list`)
    pub name: String,
    /// Write to this path instead of stdout; `.json` extension selects JSON
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DialectsValidateArgs {
    /// Path to a YAML or JSON dialect file
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Install a specific published version
    #[arg(long)]
    pub version: Option<String>,
    /// Force reinstallation even if already installed
    #[arg(long)]
    pub force: bool,
    /// Use --locked to honour Cargo.lock for dependencies
    #[arg(long)]
    pub locked: bool,
    /// Install into an alternate root directory
    #[arg(long)]
    pub root: Option<PathBuf>,
}
