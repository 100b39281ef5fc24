//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Clinotes - Extract structured clinical fields from free-text notes.
#[derive(Debug, Parser)]
#[command(name = "clinotes")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.clinotes/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (summary line only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract clinical fields from a batch of notes
    Extract(ExtractArgs),

    /// Show the fields extracted from every note
    Schema,

    /// List models known to work with the extraction prompt
    Models,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// CSV or Excel file with a notes column, or a directory of .txt files
    pub input: PathBuf,

    /// Column holding the note text (CSV and Excel input)
    #[arg(long, default_value = "Notes")]
    pub column: String,

    /// Column holding note identifiers (CSV and Excel input, default: row number)
    #[arg(long)]
    pub id_column: Option<String>,

    /// Write per-note results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export format (default: from the output file extension, else csv)
    #[arg(short, long, value_enum)]
    pub export: Option<ExportFormat>,

    /// Leave out notes where every field is missing
    #[arg(long)]
    pub drop_empty: bool,

    /// Put the input file's columns before the extracted fields
    #[arg(long)]
    pub keep_columns: bool,

    /// Model API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier
    #[arg(short, long, env = "MODEL")]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(short, long, env = "TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Notes per chunk
    #[arg(short, long, env = "BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Concurrent model calls within a chunk
    #[arg(long, env = "MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Retries per note after the first attempt
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Timeout for one model call (seconds)
    #[arg(long, env = "TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Base URL of the chat completions API
    #[arg(long, env = "MODEL_BASE_URL")]
    pub base_url: Option<String>,

    /// Extractor limits preset
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,
}

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values, one row per note
    Csv,
    /// JSON array, one object per note
    Json,
    /// Excel workbook, one row per note
    Xlsx,
}

impl ExportFormat {
    /// Pick the export format for `path` when none was requested
    pub fn resolve(requested: Option<ExportFormat>, path: &std::path::Path) -> Self {
        requested.unwrap_or_else(|| {
            match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
                Some(ext) if ext.eq_ignore_ascii_case("xlsx") => ExportFormat::Xlsx,
                _ => ExportFormat::Csv,
            }
        })
    }
}

/// Extractor limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PresetArg {
    /// Larger chunks, concurrent calls, no pause between chunks
    Aggressive,
    /// Longer notes allowed, long pauses between chunks
    Lenient,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<PresetArg> for clinotes_extractor::ExtractorConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Aggressive => clinotes_extractor::ExtractorConfig::aggressive(),
            PresetArg::Lenient => clinotes_extractor::ExtractorConfig::lenient(),
        }
    }
}
