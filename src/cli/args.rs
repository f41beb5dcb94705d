use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fqcheck",
    version,
    about = "Single-pass quality control for FASTQ and SAM read files"
)]
pub struct Cli {
    /// Input read file (.fastq, .fastq.gz, .sam)
    pub input: PathBuf,

    /// Directory receiving the report bundle
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Override the format detected from the filename suffix
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// K-mer length for adapter prefix counting (2..=10)
    #[arg(short = 'k', long, default_value_t = 7)]
    pub kmer: usize,

    /// Limits file overriding the builtin warn/error/ignore thresholds
    #[arg(long)]
    pub limits: Option<PathBuf>,

    /// Adapter list overriding the builtin one
    #[arg(long)]
    pub adapters: Option<PathBuf>,

    /// Contaminant list overriding the builtin one
    #[arg(long)]
    pub contaminants: Option<PathBuf>,

    /// HTML template overriding the embedded one
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Skip the zip bundle
    #[arg(long, default_value_t = false)]
    pub no_zip: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    #[value(name = "fastq")]
    Fastq,
    #[value(name = "fastq-gz")]
    FastqGz,
    #[value(name = "sam")]
    Sam,
}
