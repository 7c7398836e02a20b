//! In-memory DRO document: header metadata plus the instruction stream.

use crate::binutil::DroError;
use crate::dro::instruction::Instruction;
use crate::dro::stream::InstructionStream;

/// The two on-disk DRO container layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Versions (0,1) and (1,0): variable-length instructions.
    V1,
    /// Version (2,0): fixed register/value pairs plus a codemap.
    V2,
}

/// Canonical OPL hardware designation.
///
/// The two container formats number these differently; the numeric
/// translation lives at the file boundary and everything above it uses
/// this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OplType {
    Opl2,
    DualOpl2,
    Opl3,
}

impl OplType {
    /// Decode a v1 hardware value (0 = OPL2, 1 = OPL3, 2 = dual OPL2).
    pub fn from_v1(value: u32) -> Result<OplType, DroError> {
        match value {
            0 => Ok(OplType::Opl2),
            1 => Ok(OplType::Opl3),
            2 => Ok(OplType::DualOpl2),
            _ => Err(DroError::CorruptFile(format!(
                "unknown v1 hardware type: {}",
                value
            ))),
        }
    }

    /// Decode a v2 hardware value (0 = OPL2, 1 = dual OPL2, 2 = OPL3).
    pub fn from_v2(value: u8) -> Result<OplType, DroError> {
        match value {
            0 => Ok(OplType::Opl2),
            1 => Ok(OplType::DualOpl2),
            2 => Ok(OplType::Opl3),
            _ => Err(DroError::CorruptFile(format!(
                "unknown v2 hardware type: {}",
                value
            ))),
        }
    }

    /// The v1 numeric value for this hardware type.
    pub fn to_v1(self) -> u32 {
        match self {
            OplType::Opl2 => 0,
            OplType::Opl3 => 1,
            OplType::DualOpl2 => 2,
        }
    }

    /// The v2 numeric value for this hardware type.
    pub fn to_v2(self) -> u8 {
        match self {
            OplType::Opl2 => 0,
            OplType::DualOpl2 => 1,
            OplType::Opl3 => 2,
        }
    }
}

impl std::fmt::Display for OplType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OplType::Opl2 => "OPL2",
            OplType::DualOpl2 => "Dual OPL2",
            OplType::Opl3 => "OPL3",
        };
        write!(f, "{}", name)
    }
}

/// What `Song::find_next` looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    /// A one-byte (v1) or short-code (v2) delay.
    ShortDelay,
    /// A two-byte (v1) or long-code (v2) delay.
    LongDelay,
    /// Any delay instruction.
    AnyDelay,
    /// A bank switch (v1 only; never matches in v2 streams).
    BankSwitch,
    /// A write to the given canonical register address.
    Register(u16),
}

/// A parsed DRO song: header metadata and the mutable instruction
/// stream.
///
/// `ms_length` mirrors the header's declared playback length and is
/// kept in step by [`delete_instructions`](Song::delete_instructions)
/// and [`insert_instructions`](Song::insert_instructions); whether it
/// matches the stream's actual summed delay is a separate question the
/// analysis layer answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub format: FormatVersion,
    pub name: String,
    pub stream: InstructionStream,
    pub ms_length: u32,
    pub hardware: OplType,
}

impl Song {
    /// Number of instructions in the song.
    pub fn len(&self) -> usize {
        self.stream.len()
    }

    /// True when the song holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Decode the instruction at `index`.
    pub fn instruction(&self, index: usize) -> Result<Instruction, DroError> {
        self.stream.decode(index)
    }

    /// Delete the instructions at the given indices and keep the
    /// declared length in step by subtracting the deleted delay time.
    ///
    /// Returns the removed `(index, raw bytes)` pairs in ascending
    /// order, suitable for feeding back into
    /// [`insert_instructions`](Song::insert_instructions) to undo.
    pub fn delete_instructions(
        &mut self,
        indices: &[usize],
    ) -> Result<Vec<(usize, Vec<u8>)>, DroError> {
        let mut removed_ms: u32 = 0;
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &i in &sorted {
            if let Instruction::Delay { milliseconds } = self.stream.decode(i)? {
                removed_ms += milliseconds;
            }
        }
        let removed = self.stream.delete_multiple(&sorted)?;
        self.ms_length = self.ms_length.saturating_sub(removed_ms);
        Ok(removed)
    }

    /// Insert raw instruction bytes at the given ascending indices and
    /// keep the declared length in step by adding the inserted delay
    /// time.
    pub fn insert_instructions(&mut self, pairs: &[(usize, Vec<u8>)]) -> Result<(), DroError> {
        self.stream.insert_multiple(pairs)?;
        for (index, _) in pairs {
            if let Instruction::Delay { milliseconds } = self.stream.decode(*index)? {
                self.ms_length += milliseconds;
            }
        }
        Ok(())
    }

    /// Find the next instruction matching `target`, starting at `start`.
    ///
    /// A backward search begins two positions before `start` so that a
    /// repeated search does not re-find the instruction it just left.
    /// Returns the matching index, or `None` when the search runs off
    /// either end of the stream.
    pub fn find_next(
        &self,
        start: usize,
        target: SearchTarget,
        backwards: bool,
    ) -> Result<Option<usize>, DroError> {
        let len = self.stream.len();
        if backwards {
            let mut i = match start.checked_sub(2) {
                Some(i) => i,
                None => return Ok(None),
            };
            loop {
                if self.matches(i, target)? {
                    return Ok(Some(i));
                }
                match i.checked_sub(1) {
                    Some(prev) => i = prev,
                    None => return Ok(None),
                }
            }
        } else {
            for i in start..len {
                if self.matches(i, target)? {
                    return Ok(Some(i));
                }
            }
            Ok(None)
        }
    }

    fn matches(&self, index: usize, target: SearchTarget) -> Result<bool, DroError> {
        let inst = self.stream.decode(index)?;
        Ok(match target {
            SearchTarget::AnyDelay => inst.is_delay(),
            SearchTarget::ShortDelay => match inst {
                Instruction::Delay { .. } => {
                    self.stream.raw_slice(index)?[0] == self.stream.short_delay_code()
                }
                _ => false,
            },
            SearchTarget::LongDelay => match inst {
                Instruction::Delay { .. } => {
                    self.stream.raw_slice(index)?[0] == self.stream.long_delay_code()
                }
                _ => false,
            },
            SearchTarget::BankSwitch => matches!(inst, Instruction::BankSwitch { .. }),
            SearchTarget::Register(wanted) => {
                matches!(inst, Instruction::Register { command, .. } if command == wanted)
            }
        })
    }

    /// Short mnemonic column for an instruction listing.
    pub fn register_display(&self, index: usize) -> Result<String, DroError> {
        Ok(match self.stream.decode(index)? {
            Instruction::Delay { .. } => {
                if self.stream.raw_slice(index)?[0] == self.stream.short_delay_code() {
                    "DLYS".to_string()
                } else {
                    "DLYL".to_string()
                }
            }
            Instruction::BankSwitch { .. } => "BANK".to_string(),
            Instruction::Register { command, .. } => format!("0x{:02X}", command),
        })
    }

    /// Value column for an instruction listing.
    pub fn value_display(&self, index: usize) -> Result<String, DroError> {
        Ok(match self.stream.decode(index)? {
            Instruction::Delay { milliseconds } => format!("{} ms", milliseconds),
            Instruction::BankSwitch { bank } => {
                if bank == 0 { "low".to_string() } else { "high".to_string() }
            }
            Instruction::Register { value, .. } => format!("0x{:02X} ({})", value, value),
        })
    }

    /// Human-readable description of an instruction, resolving register
    /// names where known.
    pub fn instruction_description(&self, index: usize) -> Result<String, DroError> {
        Ok(match self.stream.decode(index)? {
            Instruction::Delay { milliseconds } => format!("Delay: {} ms", milliseconds),
            Instruction::BankSwitch { bank } => format!(
                "Bank switch: {}",
                if bank == 0 { "low" } else { "high" }
            ),
            Instruction::Register { command, value, bank } => {
                // High-bank registers first try their 0x1xx alias.
                let name = if bank == Some(1) {
                    crate::regdata::register_name(0x100 | command)
                        .or_else(|| crate::regdata::register_name(command))
                } else {
                    crate::regdata::register_name(command)
                };
                match name {
                    Some(name) => format!("{} <- 0x{:02X}", name, value),
                    None => format!("Unknown register 0x{:02X} <- 0x{:02X}", command, value),
                }
            }
        })
    }
}
