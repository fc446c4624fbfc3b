use crate::commands::{
    run_checklist, run_dominance, run_history, run_hhi, run_merger, run_pages, run_registry,
    ChecklistArgs, DominanceArgs, HhiArgs, HistoryCommand, MergerArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use competition_toolkit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Competition Law Toolkit",
    about = "Merger thresholds, HHI concentration, compliance checklist and dominance risk calculators",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check whether a transaction crosses the merger notification thresholds
    Merger(MergerArgs),
    /// Compute the Herfindahl-Hirschman Index for a set of market shares
    Hhi(HhiArgs),
    /// Score the competition compliance self-assessment
    Checklist(ChecklistArgs),
    /// Estimate the risk that a firm holds a dominant position
    Dominance(DominanceArgs),
    /// List the calculator pages and their form fields
    Pages,
    /// Print the active threshold registry as JSON
    Registry,
    /// Inspect, export or clear saved calculation history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Merger(args) => run_merger(args).await,
        Command::Hhi(args) => run_hhi(args).await,
        Command::Checklist(args) => run_checklist(args).await,
        Command::Dominance(args) => run_dominance(args).await,
        Command::Pages => run_pages(),
        Command::Registry => run_registry(),
        Command::History { command } => run_history(command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["toolkit"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_repeated_merger_parties() {
        let cli = Cli::try_parse_from([
            "toolkit",
            "merger",
            "--acquirer",
            "Buyer=400000000",
            "--target",
            "Seller=20000000:EUR",
            "--rate",
            "EUR:TRY=35",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Merger(args)) => {
                assert_eq!(args.acquirer.len(), 1);
                assert_eq!(args.target[0].currency.as_ref().map(|c| c.as_str()), Some("EUR"));
                assert_eq!(args.rate.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn merger_accepts_an_acquirer_without_a_target() {
        let cli = Cli::try_parse_from(["toolkit", "merger", "--acquirer", "Buyer=600000000"])
            .expect("parses");

        match cli.command {
            Some(Command::Merger(args)) => {
                assert_eq!(args.acquirer.len(), 1);
                assert!(args.target.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn history_requires_a_mode() {
        assert!(Cli::try_parse_from(["toolkit", "history", "list"]).is_err());
        assert!(Cli::try_parse_from(["toolkit", "history", "list", "hhi"]).is_ok());
    }
}
