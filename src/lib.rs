//! Backend for the SusVibes benchmark dashboard: the submission leaderboard
//! and the agent trajectory browser.

pub mod catalog;
pub mod cli;
pub mod dataset;
mod de;
pub mod error;
pub mod leaderboard;
pub mod source;
pub mod trajectory;
pub mod view;
pub mod web;

pub use error::{BoardError, Result};
