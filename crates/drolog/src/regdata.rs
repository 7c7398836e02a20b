//! OPL2/OPL3 register reference data.
//!
//! Names and bit-level field breakdowns for the register addresses a
//! DRO stream can touch. Addresses are canonical: high-bank-only
//! registers carry a 0x100 prefix (0x104, 0x105), everything else is
//! the plain 8-bit address and applies to either bank.

/// One named bit field within a register.
#[derive(Debug, Clone, Copy)]
pub struct BitField {
    pub mask: u8,
    pub label: &'static str,
}

/// Name and field layout of a register.
#[derive(Debug, Clone, Copy)]
pub struct RegisterInfo {
    pub name: &'static str,
    pub fields: &'static [BitField],
}

/// Look up the name and field layout for a register address.
pub fn register_info(address: u16) -> Option<RegisterInfo> {
    let info = match address {
        0x01 => RegisterInfo {
            name: "Test LSI / Enable waveform control",
            fields: &[
                BitField { mask: 0x20, label: "Waveform Select Enable" },
                BitField { mask: 0x1F, label: "Test LSI Register" },
            ],
        },
        0x02 => RegisterInfo {
            name: "Timer 1 count",
            fields: &[BitField { mask: 0xFF, label: "Timer 1 Count" }],
        },
        0x03 => RegisterInfo {
            name: "Timer 2 count",
            fields: &[BitField { mask: 0xFF, label: "Timer 2 Count" }],
        },
        0x04 => RegisterInfo {
            name: "Timer control flags",
            fields: &[
                BitField { mask: 0x80, label: "IRQ Reset" },
                BitField { mask: 0x40, label: "Timer 1 Mask" },
                BitField { mask: 0x20, label: "Timer 2 Mask" },
                BitField { mask: 0x02, label: "Timer 2 Start" },
                BitField { mask: 0x01, label: "Timer 1 Start" },
            ],
        },
        0x104 => RegisterInfo {
            name: "Four-operator enable",
            fields: &[BitField { mask: 0x3F, label: "Four-Operator Enable" }],
        },
        0x105 => RegisterInfo {
            name: "OPL3 mode enable",
            fields: &[BitField { mask: 0x01, label: "OPL3 Mode Enable" }],
        },
        0x08 => RegisterInfo {
            name: "Speech synthesis / Keyboard split note select",
            fields: &[
                BitField { mask: 0x80, label: "CSW" },
                BitField { mask: 0x40, label: "NOTE-SEL" },
            ],
        },
        0x20..=0x35 => RegisterInfo {
            name: "Tremolo / Vibrato / Sustain / KSR / Multiplication",
            fields: &[
                BitField { mask: 0x80, label: "Tremolo" },
                BitField { mask: 0x40, label: "Vibrato" },
                BitField { mask: 0x20, label: "Sustain" },
                BitField { mask: 0x10, label: "KSR" },
                BitField { mask: 0x0F, label: "Frequency Multiplication Factor" },
            ],
        },
        0x40..=0x55 => RegisterInfo {
            name: "Key scale level / Output level",
            fields: &[
                BitField { mask: 0xC0, label: "Key Scale Level" },
                BitField { mask: 0x3F, label: "Output Level" },
            ],
        },
        0x60..=0x75 => RegisterInfo {
            name: "Attack rate / Decay rate",
            fields: &[
                BitField { mask: 0xF0, label: "Attack" },
                BitField { mask: 0x0F, label: "Decay" },
            ],
        },
        0x80..=0x95 => RegisterInfo {
            name: "Sustain level / Release rate",
            fields: &[
                BitField { mask: 0xF0, label: "Sustain Level" },
                BitField { mask: 0x0F, label: "Release Rate" },
            ],
        },
        0xA0..=0xA8 => RegisterInfo {
            name: "Frequency (low 8 bits)",
            fields: &[BitField { mask: 0xFF, label: "Frequency Number (low 8 bits)" }],
        },
        0xB0..=0xB8 => RegisterInfo {
            name: "Key on / Octave / Frequency (high 2 bits)",
            fields: &[
                BitField { mask: 0x20, label: "Key On" },
                BitField { mask: 0x1C, label: "Octave (Block)" },
                BitField { mask: 0x03, label: "Frequency (high 2 bits)" },
            ],
        },
        0xBD => RegisterInfo {
            name: "Tremolo depth / Vibrato depth / Percussion",
            fields: &[
                BitField { mask: 0x80, label: "AM Depth" },
                BitField { mask: 0x40, label: "Vibrato Depth" },
                BitField { mask: 0x20, label: "Percussion Mode" },
                BitField { mask: 0x10, label: "Bass Drum" },
                BitField { mask: 0x08, label: "Snare Drum" },
                BitField { mask: 0x04, label: "Tom-Tom" },
                BitField { mask: 0x02, label: "Cymbal" },
                BitField { mask: 0x01, label: "Hi-Hat" },
            ],
        },
        0xC0..=0xC8 => RegisterInfo {
            name: "Panning / Feedback / Synthesis type",
            fields: &[
                BitField { mask: 0x30, label: "Panning" },
                BitField { mask: 0x0E, label: "Feedback" },
                BitField { mask: 0x01, label: "Synthesis Type" },
            ],
        },
        0xE0..=0xF5 => RegisterInfo {
            name: "Waveform select",
            fields: &[BitField { mask: 0x07, label: "Waveform Select" }],
        },
        _ => return None,
    };
    Some(info)
}

/// The human-readable name for a register address, if it is known.
pub fn register_name(address: u16) -> Option<&'static str> {
    register_info(address).map(|info| info.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_and_operator_ranges_resolve() {
        assert_eq!(
            register_name(0xB3),
            Some("Key on / Octave / Frequency (high 2 bits)")
        );
        assert_eq!(register_name(0x31), register_name(0x20));
        assert!(register_name(0x09).is_none());
        assert!(register_name(0x1F).is_none());
    }

    #[test]
    fn high_bank_specials_use_the_prefixed_address() {
        assert_eq!(register_name(0x105), Some("OPL3 mode enable"));
        assert!(register_name(0x05).is_none());
    }

    #[test]
    fn field_masks_cover_the_percussion_register() {
        let info = register_info(0xBD).unwrap();
        let combined = info.fields.iter().fold(0u8, |acc, f| acc | f.mask);
        assert_eq!(combined, 0xFF);
    }
}
