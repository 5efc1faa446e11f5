//! Domain model (ids, task state, task record).

pub mod ids;
pub mod state;
pub mod task;

pub use ids::TaskId;
pub use state::TaskState;
pub use task::TaskRecord;

/// Scheduling priority. Higher values are granted a slot first.
///
/// The queue treats this as an opaque ordering key; conventions such as
/// "writes before reads" belong to callers.
pub type Priority = i32;
