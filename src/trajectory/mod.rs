//! Trajectory transcripts: locating them, loading them and normalizing them
//! into simulations and tasks.

pub mod loader;
pub mod model;
pub mod raw;
pub mod resolver;
pub mod transform;

pub use loader::{load_trajectory, summary_file_for, TrajectoryRequest};
pub use model::{
    AgentInfo, Instructions, Message, RewardInfo, Simulation, Task, TaskDescription, TokenUsage,
    TrajectoryDocument, TrajectoryInfo, UserScenario,
};
pub use raw::{RawTranscript, Transcript, TrialSummary};
pub use resolver::{resolve_trajectories, PatternTable, ResolvedTrajectory};
pub use transform::{transform, TransformContext};
