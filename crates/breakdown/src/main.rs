use crate::prelude::*;
use clap::Parser;
use std::path::PathBuf;

mod cache;
mod config;
mod document;
mod error;
mod extract;
mod inspect;
mod prelude;
mod xlsx;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Rebuild the project breakdown table of time-tracking PDF reports as spreadsheets"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "BREAKDOWN_VERBOSE", global = true, default_value = "false")]
    verbose: bool,

    /// TOML file overriding the extraction settings
    #[clap(long, env = "BREAKDOWN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory for cached results
    #[clap(long, env = "BREAKDOWN_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract the breakdown table into an XLSX workbook
    Extract(crate::extract::ExtractOptions),

    /// Show tokens, column bounds and row labels page by page
    Inspect(crate::inspect::InspectOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Extract(options) => crate::extract::run(options, app.global).await,
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
