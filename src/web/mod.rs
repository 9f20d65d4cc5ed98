//! JSON API over the dashboard data
//!
//! Serves the leaderboard, the scatter chart data, the submission browser,
//! normalized trajectories and the task list.

mod handlers;
mod server;
mod state;

pub use handlers::ApiError;
pub use server::{build_router, start_server};
pub use state::{AppState, LatestSlot, RefreshSummary};
