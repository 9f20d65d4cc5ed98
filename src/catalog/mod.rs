//! Submission catalog: the documents behind the leaderboard and the
//! trajectory browser.

mod loader;
mod submission;

pub use loader::{load_catalog, Catalog, CatalogOptions, Manifest};
pub use submission::{
    AgentKey, ContactInfo, LanguageResults, Methodology, Reference, Submission,
    SubmissionMetrics, SubmissionRecord, SubmissionType, Verification,
};
