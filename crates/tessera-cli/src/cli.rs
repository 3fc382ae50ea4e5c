use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tessera: move campaign assets between state trees and a content store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./tessera.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload inline assets of a JSON tree and write the persisted tree
    Persist(PersistArgs),
    /// Download every stored asset of a JSON tree into a directory
    Hydrate(HydrateArgs),
    /// Count the asset strings of a JSON tree
    Inspect(InspectArgs),
    /// Show the effective configuration
    Config,
}

#[derive(Args)]
pub struct PersistArgs {
    pub input: PathBuf,
    /// Campaign id used as the storage directory
    #[arg(long)]
    pub campaign: Option<String>,
    /// Write the persisted tree here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct HydrateArgs {
    pub input: PathBuf,
    /// Directory receiving the downloaded payloads
    #[arg(long)]
    pub out_dir: PathBuf,
    /// Write the hydrated tree here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub input: PathBuf,
}
