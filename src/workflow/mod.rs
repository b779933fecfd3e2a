pub mod edit_job;
pub mod retry;
pub mod section_flow;

pub use edit_job::{EditJob, JobMode};
pub use retry::RetryPolicy;
pub use section_flow::{FailureReason, SectionFlow, SectionOutcome};
