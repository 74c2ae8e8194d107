use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_MODEL_ID, DEFAULT_OUTPUT_SUFFIX};

#[derive(Parser, Debug)]
#[command(
    name = "submittal-extract",
    version,
    about = "Extract product listings from construction submittal PDFs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "input")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_OUTPUT_SUFFIX)]
    pub output_suffix: String,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Submittal PDFs to process; defaults to every PDF in --input-dir.
    #[arg(long = "input")]
    pub inputs: Vec<PathBuf>,

    #[arg(long, default_value = "input")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_OUTPUT_SUFFIX)]
    pub output_suffix: String,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model: String,

    #[arg(long)]
    pub api_base_url: Option<String>,

    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// Concurrent model calls per document; 1 keeps the run fully sequential.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,

    #[arg(long)]
    pub stopwords_path: Option<PathBuf>,
}
