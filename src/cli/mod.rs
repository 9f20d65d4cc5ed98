//! Command line arguments and the YAML configuration

mod args;
mod config;

pub use args::{
    Args, Command, InitArgs, LeaderboardArgs, ServeArgs, ShowArgs, TasksArgs, TrajectoriesArgs,
};
pub use config::{BoardConfig, SourceConfig};
