//! Downgrading v2 songs to the v1 container.
//!
//! Some players only understand the original format. The conversion is
//! loss-free at the event level: each decoded instruction is re-encoded
//! in v1 form, with explicit bank switch events emitted wherever the
//! v2 bank bit changes. The v2 bank state starts low, matching how a
//! player initializes.

use crate::binutil::DroError;
use crate::dro::instruction::Instruction;
use crate::dro::song::{FormatVersion, Song};
use crate::dro::stream::InstructionStream;

/// Convert a v2 song to an equivalent v1 song.
///
/// Fails with `CorruptFile` when given anything but a v2 song.
pub fn convert_v2_to_v1(song: &Song) -> Result<Song, DroError> {
    if song.format != FormatVersion::V2 {
        return Err(DroError::CorruptFile(
            "only v2 songs can be converted to v1".to_string(),
        ));
    }

    let mut body = Vec::with_capacity(song.stream.raw().len());
    let mut last_bank: u8 = 0;
    for i in 0..song.stream.len() {
        let inst = song.stream.decode(i)?;
        if let Instruction::Register { bank: Some(bank), .. } = inst {
            if bank != last_bank {
                body.extend_from_slice(&Instruction::BankSwitch { bank }.encode_v1());
                last_bank = bank;
            }
        }
        body.extend_from_slice(&inst.encode_v1());
    }

    Ok(Song {
        format: FormatVersion::V1,
        name: song.name.clone(),
        stream: InstructionStream::from_v1_bytes(body)?,
        ms_length: song.ms_length,
        hardware: song.hardware,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dro::song::OplType;

    #[test]
    fn rejects_v1_input() {
        let song = Song {
            format: FormatVersion::V1,
            name: String::new(),
            stream: InstructionStream::from_v1_bytes(vec![]).unwrap(),
            ms_length: 0,
            hardware: OplType::Opl2,
        };
        assert!(convert_v2_to_v1(&song).is_err());
    }

    #[test]
    fn emits_bank_switches_where_the_bank_bit_changes() {
        // codemap: [0x20, 0xB0]; writes on bank 0, 1, 1, 0 plus a delay.
        let body = vec![0x00, 0x01, 0x81, 0x2D, 0x81, 0x0D, 0x02, 0x09, 0x01, 0x2D];
        let stream = InstructionStream::from_v2_bytes(body, vec![0x20, 0xB0], 2, 3).unwrap();
        let song = Song {
            format: FormatVersion::V2,
            name: "test".to_string(),
            stream,
            ms_length: 10,
            hardware: OplType::Opl3,
        };
        let converted = convert_v2_to_v1(&song).unwrap();
        assert_eq!(converted.format, FormatVersion::V1);
        assert_eq!(converted.name, "test");
        assert_eq!(converted.hardware, OplType::Opl3);
        assert_eq!(
            converted.stream.raw(),
            &[
                0x20, 0x01, // register 0x20 <- 0x01 on bank 0
                0x03, // switch high
                0xB0, 0x2D, 0xB0, 0x0D, // two high-bank writes
                0x00, 0x09, // delay 10 ms
                0x02, // switch low
                0xB0, 0x2D,
            ]
        );
    }
}
