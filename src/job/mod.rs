mod record;
mod tracker;

pub use record::{JobCounters, JobId, JobStatus, JobType};
pub use tracker::{JobTracker, record_nothing_to_process};
