use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tse-votos")]
#[command(about = "TSE vote aggregation importer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import one election year from TSE CSV exports
    Import(ImportArgs),
    /// Report persisted totals for operator sanity-checking
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Election year being imported (selects the built-in override table)
    #[arg(long)]
    pub year: u16,

    /// Target state (SG_UF) the import is restricted to
    #[arg(long, default_value = "RJ")]
    pub state: String,

    /// Electorate/polling-location file (eleitorado_local_votacao_*.csv)
    #[arg(long)]
    pub locations: PathBuf,

    /// Candidate registry file(s), in precedence order (first file wins on
    /// duplicate office+number keys)
    #[arg(long = "candidates", required = true)]
    pub candidates: Vec<PathBuf>,

    /// National section-level votes file (presidential rows for --state)
    #[arg(long)]
    pub national_votes: Option<PathBuf>,

    /// Regional section-level votes file (all non-presidential offices)
    #[arg(long)]
    pub state_votes: Option<PathBuf>,

    /// Output database path
    #[arg(long, default_value = "eleicoes.duckdb")]
    pub db: PathBuf,

    /// Text encoding of the input files
    #[arg(long, default_value = "ISO-8859-1")]
    pub encoding: String,

    /// Rows per multi-row upsert statement
    #[arg(long, default_value_t = 5000)]
    pub batch_size: usize,

    /// Upsert over existing rows instead of clearing the year first
    #[arg(long, default_value_t = false)]
    pub keep_existing: bool,

    /// JSON file with presidential overrides, replacing the built-in table
    /// for --year (array of {number, name, party})
    #[arg(long)]
    pub overrides: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Database path to inspect
    #[arg(long, default_value = "eleicoes.duckdb")]
    pub db: PathBuf,

    /// Restrict the report to one year
    #[arg(long)]
    pub year: Option<u16>,
}
