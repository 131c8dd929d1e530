mod commands;
mod config;
mod report;
mod rpc;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use commands::Command;

#[derive(Parser)]
#[command(name = "pivot")]
#[command(about = "Deploy and upgrade contracts behind UUPS and transparent proxies")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    cli.command.run().await
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "pivot_core=debug,pivot_cli=debug",
        _ => "pivot_core=trace,pivot_cli=trace,pivot_db=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_requires_names_or_all() {
        assert!(Cli::try_parse_from(["pivot", "deploy"]).is_err());
        assert!(Cli::try_parse_from(["pivot", "deploy", "--all", "--network", "goerli"]).is_ok());
        assert!(Cli::try_parse_from(["pivot", "deploy", "nft", "market", "-y"]).is_ok());
        assert!(Cli::try_parse_from(["pivot", "deploy", "nft", "--all"]).is_err());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["pivot", "list", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
