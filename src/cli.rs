//! CLI interface for cadence

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::bot::{self, Bot};
use crate::config::{self, Config};
use crate::shell;
use crate::tracker::Tracker;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Record recurring dates, track intervals and predict the next one", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory (overrides config and CADENCE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Setup user profile and data
    Init {
        /// User ID
        user: String,
    },
    /// Launch an interactive session (default when no command given)
    Shell {
        /// User ID (default: first registered user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List registered users
    Users,
    /// Run the Telegram chat bot
    Bot,
    /// Show configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let data_dir = config.data_dir(cli.data_dir)?;

    match cli.command {
        None => run_shell(&config, &data_dir, None),
        Some(Commands::Shell { user }) => run_shell(&config, &data_dir, user),
        Some(Commands::Init { user }) => {
            let tracker = Tracker::open(&data_dir)?;
            if tracker.register_user(&user)? {
                println!("User \"{}\" added.", user);
            } else {
                println!("User \"{}\" already exists.", user);
            }
            Ok(())
        }
        Some(Commands::Users) => {
            let tracker = Tracker::open(&data_dir)?;
            let users = tracker.list_users()?;
            if users.is_empty() {
                println!("No users registered. Use `cadence init <user>` to add one.");
            }
            for user in users {
                println!("{}", user);
            }
            Ok(())
        }
        Some(Commands::Bot) => {
            let tracker = Tracker::open(&data_dir)?;
            let runtime = tokio::runtime::Runtime::new()
                .context("Failed to start async runtime")?;
            let bot = Bot::new(tracker, &config);
            runtime.block_on(bot::telegram::run(bot, &config.bot))
        }
        Some(Commands::Config { show }) => {
            if show {
                println!("# {}", config::config_path()?.display());
                println!("# data directory: {}", data_dir.display());
                print!("{}", config.to_toml()?);
            } else {
                println!("{}", config::config_path()?.display());
            }
            Ok(())
        }
    }
}

fn run_shell(config: &Config, data_dir: &Path, user: Option<String>) -> Result<()> {
    let tracker = Tracker::open(data_dir)?;
    let user = match user {
        Some(user) => user,
        None => match tracker.list_users()?.into_iter().next() {
            Some(user) => user,
            None => bail!("No users registered. Run `cadence init <user>` first."),
        },
    };

    shell::run(&tracker, &user, config.tracker.view_length())
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
    fn test_parse_init() {
        let cli = Cli::try_parse_from(["cadence", "init", "alice"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Init { ref user }) if user == "alice"));
    }

    #[test]
    fn test_parse_defaults_to_shell() {
        let cli = Cli::try_parse_from(["cadence", "--data-dir", "/tmp/x"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }
}
