//! Logical DRO instructions and the per-format codec rules.
//!
//! A DRO body is a flat byte stream of variable-length (v1) or fixed
//! two-byte (v2) events. This module defines the decoded `Instruction`
//! type and the bit-exact decode/encode rules for both physical
//! encodings. `InstructionStream` drives these on demand; nothing here
//! owns buffer state.
//!
//! Delay run-length bias: stored delay bytes are `actual - 1` so the
//! full 0-255 range is usable. V2 long delays store `(ms >> 8) - 1`.

use crate::binutil::DroError;

/// V1 opcode for a one-byte delay.
pub const V1_SHORT_DELAY: u8 = 0x00;
/// V1 opcode for a two-byte delay.
pub const V1_LONG_DELAY: u8 = 0x01;
/// V1 opcode switching writes to the low register bank.
pub const V1_BANK_LOW: u8 = 0x02;
/// V1 opcode switching writes to the high register bank.
pub const V1_BANK_HIGH: u8 = 0x03;
/// V1 escape opcode for register addresses that collide with opcodes
/// 0x00-0x04.
pub const V1_REGISTER_OVERRIDE: u8 = 0x04;

/// A single decoded DRO event.
///
/// `command` is the canonical chip register address. For v2 streams the
/// 7-bit in-file code has already been resolved through the codemap and
/// the bank bit extracted; for v1 streams the bank is carried by
/// separate `BankSwitch` events and `bank` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// A register write.
    Register {
        command: u16,
        value: u8,
        bank: Option<u8>,
    },
    /// A pause, in milliseconds.
    Delay { milliseconds: u32 },
    /// A switch to the low (0) or high (1) register bank. V1 only.
    BankSwitch { bank: u8 },
}

impl Instruction {
    /// True for delay instructions.
    pub fn is_delay(&self) -> bool {
        matches!(self, Instruction::Delay { .. })
    }

    /// True for register writes in the key-on/off range 0xB0-0xB8.
    pub fn is_key_on_off(&self) -> bool {
        matches!(self, Instruction::Register { command, .. } if (0xB0..=0xB8).contains(command))
    }

    /// Encode this instruction into v1 physical form.
    ///
    /// Delays pick the shortest encoding: the one-byte form for delays
    /// up to 256 ms, the two-byte form beyond that. Register commands
    /// below 0x05 use the 0x04 override so they cannot be mistaken for
    /// opcodes.
    pub fn encode_v1(&self) -> Vec<u8> {
        match *self {
            Instruction::Delay { milliseconds } => {
                if milliseconds <= 256 {
                    vec![V1_SHORT_DELAY, milliseconds.saturating_sub(1) as u8]
                } else {
                    let stored = (milliseconds - 1) as u16;
                    let [lo, hi] = stored.to_le_bytes();
                    vec![V1_LONG_DELAY, lo, hi]
                }
            }
            Instruction::BankSwitch { bank } => vec![V1_BANK_LOW + (bank & 1)],
            Instruction::Register { command, value, .. } => {
                if command < 0x05 {
                    vec![V1_REGISTER_OVERRIDE, command as u8, value]
                } else {
                    vec![command as u8, value]
                }
            }
        }
    }

    /// Encode this instruction into a v2 register/value pair.
    ///
    /// The register command must be present in `codemap`; the bank bit
    /// is folded into the high bit of the code. Bank switches have no
    /// v2 representation.
    pub fn encode_v2(
        &self,
        codemap: &[u8],
        short_delay_code: u8,
        long_delay_code: u8,
    ) -> Result<[u8; 2], DroError> {
        match *self {
            Instruction::Delay { milliseconds } => {
                if milliseconds <= 256 {
                    Ok([short_delay_code, milliseconds.saturating_sub(1) as u8])
                } else {
                    Ok([long_delay_code, ((milliseconds >> 8) - 1) as u8])
                }
            }
            Instruction::BankSwitch { .. } => Err(DroError::CorruptFile(
                "bank switches have no v2 encoding".into(),
            )),
            Instruction::Register { command, value, bank } => {
                let code = codemap
                    .iter()
                    .position(|&reg| reg as u16 == command)
                    .ok_or_else(|| {
                        DroError::CorruptFile(format!(
                            "register 0x{:02X} is not present in the codemap",
                            command
                        ))
                    })?;
                Ok([code as u8 | (bank.unwrap_or(0) << 7), value])
            }
        }
    }
}

/// Physical size in bytes of the v1 instruction starting with `opcode`.
pub(crate) fn v1_size(opcode: u8) -> usize {
    match opcode {
        V1_SHORT_DELAY => 2,
        V1_LONG_DELAY => 3,
        V1_BANK_LOW | V1_BANK_HIGH => 1,
        V1_REGISTER_OVERRIDE => 3,
        _ => 2,
    }
}

/// Decode the v1 instruction at `off` within `data`.
///
/// Returns the instruction and the number of bytes it occupies.
pub(crate) fn decode_v1(data: &[u8], off: usize) -> Result<(Instruction, usize), DroError> {
    let overrun = |needed: usize| {
        DroError::CorruptFile(format!(
            "instruction at offset 0x{:X} overruns the body ({} bytes needed)",
            off, needed
        ))
    };
    let opcode = *data.get(off).ok_or_else(|| overrun(1))?;
    let size = v1_size(opcode);
    if off + size > data.len() {
        return Err(overrun(size));
    }
    let inst = match opcode {
        V1_SHORT_DELAY => Instruction::Delay {
            milliseconds: data[off + 1] as u32 + 1,
        },
        V1_LONG_DELAY => Instruction::Delay {
            milliseconds: (data[off + 1] as u32 | (data[off + 2] as u32) << 8) + 1,
        },
        V1_BANK_LOW | V1_BANK_HIGH => Instruction::BankSwitch {
            bank: opcode - V1_BANK_LOW,
        },
        V1_REGISTER_OVERRIDE => Instruction::Register {
            command: data[off + 1] as u16,
            value: data[off + 2],
            bank: None,
        },
        _ => Instruction::Register {
            command: opcode as u16,
            value: data[off + 1],
            bank: None,
        },
    };
    Ok((inst, size))
}

/// Decode a v2 register/value pair against the stream's codemap and
/// delay codes.
pub(crate) fn decode_v2(
    code: u8,
    value: u8,
    codemap: &[u8],
    short_delay_code: u8,
    long_delay_code: u8,
) -> Result<Instruction, DroError> {
    if code == short_delay_code {
        Ok(Instruction::Delay {
            milliseconds: value as u32 + 1,
        })
    } else if code == long_delay_code {
        Ok(Instruction::Delay {
            milliseconds: (value as u32 + 1) << 8,
        })
    } else {
        let command = *codemap.get((code & 0x7F) as usize).ok_or_else(|| {
            DroError::CorruptFile(format!(
                "register code 0x{:02X} is outside the codemap ({} entries)",
                code & 0x7F,
                codemap.len()
            ))
        })?;
        Ok(Instruction::Register {
            command: command as u16,
            value,
            bank: Some((code & 0x80) >> 7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_delay_roundtrip_bias() {
        let (inst, size) = decode_v1(&[0x00, 0x09], 0).unwrap();
        assert_eq!(inst, Instruction::Delay { milliseconds: 10 });
        assert_eq!(size, 2);
        assert_eq!(inst.encode_v1(), vec![0x00, 0x09]);
    }

    #[test]
    fn v1_long_delay() {
        let (inst, size) = decode_v1(&[0x01, 0x34, 0x12], 0).unwrap();
        assert_eq!(
            inst,
            Instruction::Delay {
                milliseconds: 0x1234 + 1
            }
        );
        assert_eq!(size, 3);
        assert_eq!(inst.encode_v1(), vec![0x01, 0x34, 0x12]);
    }

    #[test]
    fn v1_register_override() {
        let (inst, size) = decode_v1(&[0x04, 0x20, 0x01], 0).unwrap();
        assert_eq!(
            inst,
            Instruction::Register {
                command: 0x20,
                value: 1,
                bank: None
            }
        );
        assert_eq!(size, 3);
        // Plain registers skip the override.
        assert_eq!(inst.encode_v1(), vec![0x20, 0x01]);
        let low = Instruction::Register {
            command: 0x02,
            value: 0x7F,
            bank: None,
        };
        assert_eq!(low.encode_v1(), vec![0x04, 0x02, 0x7F]);
    }

    #[test]
    fn v1_truncated_instruction() {
        assert!(matches!(
            decode_v1(&[0x01, 0x34], 0),
            Err(DroError::CorruptFile(_))
        ));
    }

    #[test]
    fn v2_codemap_and_bank_bit() {
        let codemap = [0x20u8, 0xB0];
        let inst = decode_v2(0x81, 0x2D, &codemap, 2, 3).unwrap();
        assert_eq!(
            inst,
            Instruction::Register {
                command: 0xB0,
                value: 0x2D,
                bank: Some(1)
            }
        );
        assert_eq!(inst.encode_v2(&codemap, 2, 3).unwrap(), [0x81, 0x2D]);
    }

    #[test]
    fn v2_long_delay_bias() {
        let inst = decode_v2(3, 0x01, &[], 2, 3).unwrap();
        assert_eq!(inst, Instruction::Delay { milliseconds: 512 });
        assert_eq!(inst.encode_v2(&[], 2, 3).unwrap(), [3, 0x01]);
    }
}
