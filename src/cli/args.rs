use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::config::{BoardConfig, SourceConfig};
use crate::leaderboard::{SortDirection, SortKey};

/// SUSVIBES-BOARD: leaderboard and trajectory browser backend
///
/// Reads the static SusVibes site (submissions, trajectories, dataset) from a
/// local directory or a web server and serves it as a JSON API or prints it
/// on the terminal.
#[derive(Parser, Debug)]
#[command(name = "susvibes-board")]
#[command(version = "0.1.0")]
#[command(about = "Browse SusVibes benchmark submissions and agent trajectories")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Read the site from this local directory
    #[arg(long, global = true, conflicts_with = "base_url")]
    pub root: Option<PathBuf>,

    /// Read the site from this base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Args {
    /// Config file (or defaults) with the source overridden from flags
    pub fn board_config(&self) -> Result<BoardConfig> {
        let mut config = match &self.config {
            Some(path) => BoardConfig::load(path)?,
            None => BoardConfig::default(),
        };

        if let Some(root) = &self.root {
            config.source = SourceConfig::Fs { root: root.clone() };
        } else if let Some(base_url) = &self.base_url {
            config.source = SourceConfig::Http {
                base_url: base_url.clone(),
            };
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the JSON API server
    Serve(ServeArgs),

    /// Print the leaderboard
    Leaderboard(LeaderboardArgs),

    /// List the trajectory files of a submission
    Trajectories(TrajectoriesArgs),

    /// Show a normalized trajectory or one of its simulations
    Show(ShowArgs),

    /// List benchmark tasks from the dataset
    Tasks(TasksArgs),

    /// Generate a sample config file
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,
}

#[derive(Parser, Debug)]
pub struct LeaderboardArgs {
    /// Include custom-scaffold submissions
    #[arg(long)]
    pub custom: bool,

    /// Hide standard submissions
    #[arg(long)]
    pub no_standard: bool,

    /// Sort column: funcpass1, secpass1, llmbackbone or agentframework
    #[arg(long, default_value = "funcpass1")]
    pub sort: SortKey,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    pub direction: SortDirection,
}

#[derive(Parser, Debug)]
pub struct TrajectoriesArgs {
    /// Agent key, e.g. "GPT-5::openhands"
    pub agent_key: String,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Submission directory
    pub submission_dir: String,

    /// Trajectory file inside the submission's trajectories folder
    pub file: String,

    /// Simulation to print messages for
    #[arg(short, long)]
    pub simulation: Option<String>,

    /// Page of messages (1-based)
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Messages per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct TasksArgs {
    /// Limit number of tasks shown
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output path for the config file
    #[arg(short, long, default_value = "susvibes-board.yaml")]
    pub output: PathBuf,
}
