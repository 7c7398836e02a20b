//! Delay bookkeeping checks.
//!
//! Captures frequently declare a playback length that disagrees with
//! the delays actually present in the body, or open with a delay
//! before any register write. Both conditions are worth surfacing
//! before trimming.

use crate::dro::{Instruction, Song};

/// Sum of all decoded delay milliseconds in the song body.
pub fn total_delay(song: &Song) -> u32 {
    song.stream
        .iter()
        .filter_map(|inst| match inst {
            Instruction::Delay { milliseconds } => Some(milliseconds),
            _ => None,
        })
        .sum()
}

/// True when the very first instruction is a delay.
pub fn has_leading_delay(song: &Song) -> bool {
    song.stream
        .decode(0)
        .map(|inst| inst.is_delay())
        .unwrap_or(false)
}

/// True when the summed body delay disagrees with the header's
/// declared length.
pub fn length_mismatch(song: &Song) -> bool {
    total_delay(song) != song.ms_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dro::{FormatVersion, InstructionStream, OplType, Song};

    fn v1_song(body: Vec<u8>, ms_length: u32) -> Song {
        Song {
            format: FormatVersion::V1,
            name: String::new(),
            stream: InstructionStream::from_v1_bytes(body).unwrap(),
            ms_length,
            hardware: OplType::Opl2,
        }
    }

    #[test]
    fn totals_and_mismatch() {
        let song = v1_song(vec![0x20, 0x01, 0x00, 0x09, 0x01, 0xFF, 0x00], 266);
        assert_eq!(total_delay(&song), 266);
        assert!(!length_mismatch(&song));
        let lying = v1_song(vec![0x00, 0x09], 500);
        assert!(length_mismatch(&lying));
    }

    #[test]
    fn leading_delay() {
        assert!(has_leading_delay(&v1_song(vec![0x00, 0x09], 10)));
        assert!(!has_leading_delay(&v1_song(vec![0x20, 0x01], 0)));
        assert!(!has_leading_delay(&v1_song(vec![], 0)));
    }
}
