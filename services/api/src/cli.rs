use crate::demo::{run_demo, run_hash, DemoArgs, HashArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Intake Service",
    about = "Admit loan simulations and forward new leads to the CRM",
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
    /// Print the canonical form and content hash of a lead request file
    Hash(HashArgs),
    /// Walk through the admission rule against in-memory storage
    Demo(DemoArgs),
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
        Command::Hash(args) => run_hash(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["lead-intake-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn hash_requires_a_file() {
        assert!(Cli::try_parse_from(["lead-intake-api", "hash"]).is_err());

        let cli = Cli::try_parse_from(["lead-intake-api", "hash", "--file", "lead.json"])
            .expect("parses");
        match cli.command {
            Some(Command::Hash(args)) => assert_eq!(args.file.to_str(), Some("lead.json")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_bind_overrides() {
        let cli = Cli::try_parse_from(["lead-intake-api", "serve", "--port", "8081"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8081));
                assert!(args.host.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
