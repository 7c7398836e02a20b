//! Per-instruction register state descriptions.
//!
//! Replays a song and reports, for every instruction, which named bit
//! fields of the touched register actually changed. The replay can be
//! long for big captures, so it checks a cooperative cancellation token
//! once per instruction and returns whatever has been produced so far
//! when cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dro::{Instruction, Song};
use crate::regdata;

/// Shared cancellation flag for a running analysis.
///
/// Clones observe the same flag; cancelling from any thread makes the
/// analysis stop at the next instruction boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Replays register writes against a (bank, address) state table.
///
/// The table covers both banks of the full 8-bit address range; the
/// 0x100-aliased names are resolved at lookup time, not stored
/// separately.
#[derive(Debug)]
pub struct RegisterStateTracker {
    state: [Option<u8>; 0x200],
    current_bank: u8,
}

impl Default for RegisterStateTracker {
    fn default() -> Self {
        RegisterStateTracker::new()
    }
}

impl RegisterStateTracker {
    pub fn new() -> Self {
        RegisterStateTracker {
            state: [None; 0x200],
            current_bank: 0,
        }
    }

    /// Describe every instruction in stream order.
    ///
    /// Returns one `(bank, description)` entry per instruction, or a
    /// partial prefix when the token is cancelled mid-run.
    pub fn analyze(&mut self, song: &Song, cancel: &CancelToken) -> Vec<(u8, String)> {
        let mut descriptions = Vec::with_capacity(song.len());
        for inst in song.stream.iter() {
            if cancel.is_cancelled() {
                return descriptions;
            }
            match inst {
                Instruction::Delay { milliseconds } => {
                    descriptions.push((self.current_bank, format!("Delay: {} ms", milliseconds)));
                }
                Instruction::BankSwitch { bank } => {
                    self.current_bank = bank;
                    descriptions.push((
                        bank,
                        format!("Bank switch: {}", if bank == 0 { "low" } else { "high" }),
                    ));
                }
                Instruction::Register { command, value, bank } => {
                    if let Some(bank) = bank {
                        self.current_bank = bank;
                    }
                    let description = self.describe_write(command, value);
                    descriptions.push((self.current_bank, description));
                }
            }
        }
        descriptions
    }

    /// Diff a register write against the stored state and record it.
    ///
    /// An address with no reference entry is reported as unknown and
    /// not stored, matching how an unrecognized write is ignored when
    /// replaying on real hardware docs.
    fn describe_write(&mut self, command: u16, value: u8) -> String {
        let info = if self.current_bank == 1 {
            regdata::register_info(0x100 | command).or_else(|| regdata::register_info(command))
        } else {
            regdata::register_info(command)
        };
        let Some(info) = info else {
            return format!("Unknown register: {}", command);
        };

        let key = ((self.current_bank as usize) << 8) | (command as usize & 0xFF);
        let old = self.state[key];
        let mut changed: Vec<&str> = Vec::new();
        for field in info.fields {
            let differs = match old {
                None => true,
                Some(old) => (field.mask & old) ^ (field.mask & value) != 0,
            };
            if differs {
                changed.push(field.label);
            }
        }
        self.state[key] = Some(value);

        if changed.is_empty() {
            "(no changes)".to_string()
        } else {
            changed.join(" / ")
        }
    }
}
