//! Burnish CLI entry point.

use clap::Parser;

use burnish::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => burnish::cli::commands::run::execute(args, cli.json, cli.config).await,
        Commands::Report(args) => {
            burnish::cli::commands::report::execute(args, cli.json, cli.config).await
        }
    };

    if let Err(err) = result {
        burnish::cli::handle_error(err, cli.json);
    }
}
