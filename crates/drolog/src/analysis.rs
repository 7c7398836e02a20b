//! Read-only analyses over a parsed song.
//!
//! Everything here treats the song as immutable: loop-point heuristics,
//! delay bookkeeping checks, and the per-instruction register state
//! differ with its cooperative cancellation token.
pub mod delay;
pub mod loops;
pub mod registers;

pub use loops::{AnalysisReport, LoopAnalyzer, Region};
pub use registers::{CancelToken, RegisterStateTracker};
