mod commands;

use clap::{Args, Parser, Subcommand};
use cqlmig_core::{ConsistencyLevel, LogFormat};
use std::path::PathBuf;
use std::process;

use commands::*;

#[derive(Parser)]
#[command(name = "cqlmig")]
#[command(version, about = "Versioned, reversible keyspace migrations for Cassandra and ScyllaDB")]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection and runtime options shared by every command
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Cluster node to connect to
    #[arg(long, visible_alias = "ip", global = true)]
    pub host: Option<String>,

    /// Native protocol port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Ledger consistency (ANY, ONE, LOCAL_ONE, QUORUM, LOCAL_QUORUM, EACH_QUORUM, ALL)
    #[arg(long = "con", global = true)]
    pub consistency: Option<ConsistencyLevel>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Root directory holding one folder of migrations per keyspace
    #[arg(long, global = true)]
    pub migrations_dir: Option<PathBuf>,

    /// Settings file (defaults to ./cqlmig.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// text, pretty or json
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new migration file from the template
    Generate {
        /// Target keyspace
        keyspace: String,

        /// Migration name, CamelCase or snake_case
        #[arg(long)]
        name: Option<String>,
    },

    /// Apply every pending migration
    Migrate { keyspace: String },

    /// Roll back the most recently applied migration
    Rollback { keyspace: String },

    /// Create the keyspace on a local node (SimpleStrategy, RF 1)
    #[command(visible_alias = "createKeyspace")]
    CreateKeyspace { keyspace: String },

    /// Print the most recently applied migration
    Current { keyspace: String },

    /// List migrations with their applied state
    Status { keyspace: String },

    /// Show usage with examples
    Help,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Help = cli.command {
        help::print();
        return Ok(());
    }

    let settings = load_settings(&cli.global)?;

    match cli.command {
        Commands::Generate { keyspace, name } => {
            migrate::generate(&settings, &keyspace, name.as_deref())?;
        }
        Commands::Migrate { keyspace } => {
            migrate::run(&settings, &keyspace).await?;
        }
        Commands::Rollback { keyspace } => {
            migrate::rollback(&settings, &keyspace).await?;
        }
        Commands::CreateKeyspace { keyspace } => {
            admin::create_keyspace(&settings, &keyspace).await?;
        }
        Commands::Current { keyspace } => {
            migrate::current(&settings, &keyspace).await?;
        }
        Commands::Status { keyspace } => {
            migrate::status(&settings, &keyspace).await?;
        }
        Commands::Help => help::print(),
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("ERROR: {:#}", error);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_alias_is_accepted() {
        let cli = Cli::try_parse_from(["cqlmig", "createKeyspace", "global"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::CreateKeyspace { ref keyspace } if keyspace == "global"
        ));

        let cli = Cli::try_parse_from(["cqlmig", "create-keyspace", "global"]).unwrap();
        assert!(matches!(cli.command, Commands::CreateKeyspace { .. }));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cqlmig",
            "migrate",
            "global",
            "--ip",
            "10.0.0.7",
            "--con",
            "each_quorum",
            "--timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.global.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(cli.global.consistency, Some(ConsistencyLevel::EachQuorum));
        assert_eq!(cli.global.timeout, Some(5));
    }

    #[test]
    fn test_unknown_consistency_is_rejected() {
        let parsed = Cli::try_parse_from(["cqlmig", "migrate", "global", "--con", "SOMETIMES"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_keyspace_is_required() {
        assert!(Cli::try_parse_from(["cqlmig", "migrate"]).is_err());
        assert!(Cli::try_parse_from(["cqlmig", "help"]).is_ok());
    }

    #[test]
    fn test_generate_name_flag() {
        let cli =
            Cli::try_parse_from(["cqlmig", "generate", "global", "--name", "AddUsers"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Generate { ref name, .. } if name.as_deref() == Some("AddUsers")
        ));
    }
}
