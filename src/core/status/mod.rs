pub mod cache;
pub mod probes;
pub mod task;

pub use cache::{PLACEHOLDER_INITIALIZING, PLACEHOLDER_UNKNOWN, StatusCache, StatusEntry};
pub use probes::{PROBES, ProbeContext, ProbeKind, ProbePaths, ProbeSpec, Stage};
pub use task::{FetchFn, FetchFuture, ThrottledTask};
