//! DRO document handling.
//!
//! This module exposes the song and stream types and re-exports
//! submodules for per-instruction codec rules, container I/O and the
//! v2-to-v1 downgrade.
pub mod convert;
pub mod instruction;
mod io;
mod song;
mod stream;

pub use instruction::Instruction;
pub use song::{FormatVersion, OplType, SearchTarget, Song};
pub use stream::InstructionStream;
