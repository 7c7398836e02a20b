#![doc = include_str!("../README.md")]
//! drolog — parser, editor and analyzer for DOSBox Raw OPL (DRO) register-write logs
//!
//! `drolog` reads the two DRO container formats (v1 and v2), exposes
//! the body as a logically-indexed, editable instruction stream, and
//! writes the result back losslessly. On top of the codec it provides
//! loop-point heuristics and a per-register state differ for inspecting
//! what a capture actually does to the chip.
//!
//! Key features:
//! - Bit-exact decode and encode of both container formats, including
//!   the delay run-length bias and the v2 register codemap.
//! - Logical indexing over the raw byte stream: delete and insert whole
//!   instructions by index while offsets and totals stay consistent,
//!   with the removed raw bytes returned for an external undo layer.
//! - Five loop-detection heuristics producing human-readable reports.
//! - A register state tracker describing, per instruction, which named
//!   bit fields of the touched OPL register changed.
//!
//! Example: parse, inspect and re-serialize
//!
//! ```rust
//! use drolog::{Instruction, Song};
//!
//! // A minimal v2 file: one 10 ms delay.
//! let mut bytes: Vec<u8> = Vec::new();
//! bytes.extend_from_slice(b"DBRAWOPL");
//! bytes.extend_from_slice(&2u16.to_le_bytes());
//! bytes.extend_from_slice(&0u16.to_le_bytes());
//! bytes.extend_from_slice(&1u32.to_le_bytes()); // pair count
//! bytes.extend_from_slice(&10u32.to_le_bytes()); // length in ms
//! bytes.extend_from_slice(&[0, 0, 0, 2, 3, 1, 0x20]); // header + codemap
//! bytes.extend_from_slice(&[2, 9]); // short delay, 9 + 1 ms
//!
//! let song: Song = bytes.as_slice().try_into().expect("well-formed DRO");
//! assert_eq!(
//!     song.instruction(0).unwrap(),
//!     Instruction::Delay { milliseconds: 10 }
//! );
//!
//! // Unedited songs round-trip byte for byte.
//! let written: Vec<u8> = (&song).into();
//! assert_eq!(written, bytes);
//! ```
//!
//! Example: loop analysis
//!
//! ```rust
//! use drolog::analysis::LoopAnalyzer;
//! # use drolog::{FormatVersion, InstructionStream, OplType, Song};
//! # let song = Song {
//! #     format: FormatVersion::V1,
//! #     name: String::new(),
//! #     stream: InstructionStream::from_v1_bytes(vec![0x00, 0x09]).unwrap(),
//! #     ms_length: 10,
//! #     hardware: OplType::Opl2,
//! # };
//!
//! let analyzer = LoopAnalyzer::new();
//! for report in analyzer.analyze(&song) {
//!     println!("{}", report);
//! }
//! ```
mod binutil;
pub mod analysis;
pub mod dro;
pub mod regdata;

pub use binutil::DroError;
pub use dro::{FormatVersion, Instruction, InstructionStream, OplType, SearchTarget, Song};
