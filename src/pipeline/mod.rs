//! Poll cycle orchestration.
//!
//! One cycle: fetch -> extract -> keyword gate -> novelty gate -> notify or
//! seed -> mark seen -> prune. The loop repeats until the process is stopped.

mod poll;

pub use poll::{CycleReport, Sleeper, TokioSleeper, Watcher};
