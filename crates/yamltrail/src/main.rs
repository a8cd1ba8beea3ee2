//! yamltrail - version history for Home Assistant style YAML entities.
//!
//! This is the main entry point for the yamltrail CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::*;
use std::path::PathBuf;
use yamltrail_core::{Config, EntityKind};
use yamltrail_util::path::find_repo_root;

#[derive(Parser)]
#[command(name = "yamltrail")]
#[command(author, version, about = "Entity history and restore for YAML documents", long_about = None)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "directory", global = true)]
    directory: Option<PathBuf>,

    /// Print output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the distinct versions of an entity, newest first
    History {
        /// Document path, relative to the repository
        file: PathBuf,
        /// Entity kind (automation or script)
        kind: EntityKind,
        /// Stable id, array index or map key
        id: String,
        /// Treat the id as a map key
        #[arg(long)]
        key: bool,
    },

    /// Write an entity's value at a commit back into the live document
    Restore {
        file: PathBuf,
        kind: EntityKind,
        id: String,
        /// Commit to take the value from
        commit: String,
        /// Treat the id as a map key
        #[arg(long)]
        key: bool,
        /// Commit the restored document afterwards
        #[arg(long)]
        record: bool,
        /// Message for the recorded commit
        #[arg(short, long, requires = "record")]
        message: Option<String>,
    },

    /// List the entities of a document
    List {
        file: PathBuf,
        kind: EntityKind,
        /// Read the document as of this commit instead of the working tree
        #[arg(long)]
        at: Option<String>,
    },

    /// Print one entity's value
    Show {
        file: PathBuf,
        kind: EntityKind,
        id: String,
        /// Read the document as of this commit instead of the working tree
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        key: bool,
    },

    /// Show configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let root = find_repo_root(&cwd).unwrap_or_else(|| cwd.clone());

    let (config, sources) = Config::load(Some(&root)).await?;
    init_logging(cli.verbose, config.log_level());
    tracing::debug!(root = %root.display(), "Starting yamltrail");

    let ctx = Context {
        root,
        config,
        sources,
        json: cli.json,
    };

    match cli.command {
        Commands::History { file, kind, id, key } => {
            handle_history(&ctx, identity(file, kind, &id, key)).await
        }
        Commands::Restore {
            file,
            kind,
            id,
            commit,
            key,
            record,
            message,
        } => handle_restore(&ctx, identity(file, kind, &id, key), &commit, record, message).await,
        Commands::List { file, kind, at } => handle_list(&ctx, &file, kind, at.as_deref()).await,
        Commands::Show {
            file,
            kind,
            id,
            at,
            key,
        } => handle_show(&ctx, identity(file, kind, &id, key), at.as_deref()).await,
        Commands::Config => show_config(&ctx),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_restore() {
        let cli = Cli::parse_from([
            "yamltrail",
            "-C",
            "/config",
            "restore",
            "automations.yaml",
            "automation",
            "1700000000000",
            "abc1234",
            "--record",
        ]);
        assert_eq!(cli.directory, Some(PathBuf::from("/config")));
        match cli.command {
            Commands::Restore {
                kind, id, record, ..
            } => {
                assert_eq!(kind, EntityKind::Automation);
                assert_eq!(id, "1700000000000");
                assert!(record);
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn test_message_requires_record() {
        let result = Cli::try_parse_from([
            "yamltrail",
            "restore",
            "scripts.yaml",
            "script",
            "morning",
            "abc1234",
            "-m",
            "note",
        ]);
        assert!(result.is_err());
    }
}
