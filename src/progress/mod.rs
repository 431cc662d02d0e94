//! Per-user listening progress.

pub mod store;

pub use store::{
    resume_index, JsonProgressStore, MemoryProgressStore, ProgressError, ProgressSnapshot,
    ProgressStore,
};
