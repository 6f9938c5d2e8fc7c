use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::IndexArgs;

#[derive(Parser)]
#[command(name = "geotime-cmd")]
#[command(about = "Command-line utility for spatial-temporal index operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe the index created for the given options
    Describe {
        #[command(flatten)]
        index: IndexArgs,
    },

    /// Compute the insertion IDs of a geometry at a time or over a time range
    InsertionIds {
        #[command(flatten)]
        index: IndexArgs,

        /// Geometry in WKT, e.g. "POINT(43.454 28.232)"
        #[arg(long)]
        wkt: String,

        /// Start time (RFC 3339)
        #[arg(long)]
        start: String,

        /// End time (RFC 3339), defaults to the start time
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Describe { index } => commands::describe::run(index),
        Commands::InsertionIds {
            index,
            wkt,
            start,
            end,
        } => commands::insertion_ids::run(index, wkt, start, end),
    }
}
