pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use self::commands::{decode, encode};

#[derive(Parser)]
#[command(name = "marshal48")]
#[command(about = "Marshal 4.8 codec CLI", version, author)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a Marshal 4.8 stream and print its JSON projection
    Decode {
        /// The input marshal stream
        #[arg(required = true)]
        input: PathBuf,

        /// The output JSON file (defaults to <input>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Encode a JSON document into a Marshal 4.8 stream
    Encode {
        /// The input JSON file
        #[arg(required = true)]
        input: PathBuf,

        /// The output marshal file (defaults to <input>.marshal)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a Marshal 4.8 stream and print a human-readable representation
    Repr {
        /// The input marshal stream
        #[arg(required = true)]
        input: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { input, output, pretty } => decode::execute(input, output, pretty),
        Commands::Encode { input, output } => encode::execute(input, output),
        Commands::Repr { input } => decode::execute_repr(input),
    }
}
