mod random_init;
mod train;

use clap::{Parser, Subcommand};
use log::info;
use random_init::*;
use train::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit topics with a word-correlation tree by collapsed Gibbs sampling
    Train(TrainArgs),
    /// Write uniformly random initial topic assignments for a corpus
    RandomInit(RandomInitArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Train(args) => {
            run_train(args)?;
        }
        Commands::RandomInit(args) => {
            run_random_init(args)?;
        }
    }

    info!("Done");
    Ok(())
}
