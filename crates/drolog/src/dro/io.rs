//! Reading and writing the two DRO container formats.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! offset 0   "DBRAWOPL"          8-byte magic
//! offset 8   major: u16, minor: u16
//!
//! v1 ((0,1) or (1,0)):
//! offset 12  total delay in ms: u32
//! offset 16  body length in bytes: u32
//! offset 20  hardware type: u32 (some writers emit a single byte;
//!            a value above 0xFF means bytes 21..24 are body data)
//! then       variable-length instruction body, exactly the declared
//!            number of bytes
//!
//! v2 ((2,0)):
//! offset 12  pair count: u32
//! offset 16  total delay in ms: u32
//! offset 20  hardware: u8, format: u8, compression: u8,
//!            short delay code: u8, long delay code: u8,
//!            codemap length: u8 (at most 128)
//! offset 26  codemap, then pair count * 2 body bytes
//! ```

use crate::binutil::{self, DroError};
use crate::dro::song::{FormatVersion, OplType, Song};
use crate::dro::stream::InstructionStream;

const MAGIC: &[u8; 8] = b"DBRAWOPL";
const MAX_CODEMAP_LEN: u8 = 128;

impl TryFrom<&[u8]> for Song {
    type Error = DroError;

    /// Parse a DRO file image.
    ///
    /// The song's `name` is left empty; callers usually fill it in from
    /// the file name.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let magic = binutil::read_slice(bytes, 0, 8, "file magic")?;
        if magic != MAGIC {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(magic);
            return Err(DroError::InvalidHeader(raw));
        }
        let major = binutil::read_u16_le_at(bytes, 8, "major version")?;
        let minor = binutil::read_u16_le_at(bytes, 10, "minor version")?;
        match (major, minor) {
            (0, 1) | (1, 0) => read_v1(bytes),
            (2, 0) => read_v2(bytes),
            (major, minor) => Err(DroError::UnsupportedVersion { major, minor }),
        }
    }
}

fn read_v1(bytes: &[u8]) -> Result<Song, DroError> {
    let ms_length = binutil::read_u32_le_at(bytes, 12, "total delay")?;
    let byte_length = binutil::read_u32_le_at(bytes, 16, "body length")? as usize;

    // The hardware field is nominally a u32 but early writers emitted a
    // single byte. A value above 0xFF can only mean the upper three
    // bytes already belong to the body.
    let hardware_word = binutil::read_u32_le_at(bytes, 20, "hardware type")?;
    let (hardware, body_off) = if hardware_word > 0xFF {
        (OplType::from_v1(binutil::read_u8_at(bytes, 20, "hardware type")? as u32)?, 21)
    } else {
        (OplType::from_v1(hardware_word)?, 24)
    };

    let body = binutil::read_slice(bytes, body_off, byte_length, "instruction body")?;
    if bytes.len() > body_off + byte_length {
        return Err(DroError::CorruptFile(format!(
            "{} bytes left over after the declared body",
            bytes.len() - body_off - byte_length
        )));
    }
    let stream = InstructionStream::from_v1_bytes(body.to_vec())?;
    Ok(Song {
        format: FormatVersion::V1,
        name: String::new(),
        stream,
        ms_length,
        hardware,
    })
}

fn read_v2(bytes: &[u8]) -> Result<Song, DroError> {
    let pair_count = binutil::read_u32_le_at(bytes, 12, "pair count")? as usize;
    let ms_length = binutil::read_u32_le_at(bytes, 16, "total delay")?;
    let hardware = OplType::from_v2(binutil::read_u8_at(bytes, 20, "hardware type")?)?;
    let format = binutil::read_u8_at(bytes, 21, "format")?;
    if format != 0 {
        return Err(DroError::UnsupportedFeature {
            field: "format",
            value: format,
        });
    }
    let compression = binutil::read_u8_at(bytes, 22, "compression")?;
    if compression != 0 {
        return Err(DroError::UnsupportedFeature {
            field: "compression",
            value: compression,
        });
    }
    let short_delay_code = binutil::read_u8_at(bytes, 23, "short delay code")?;
    let long_delay_code = binutil::read_u8_at(bytes, 24, "long delay code")?;
    let codemap_len = binutil::read_u8_at(bytes, 25, "codemap length")?;
    if codemap_len > MAX_CODEMAP_LEN {
        return Err(DroError::CorruptFile(format!(
            "codemap length {} exceeds the 7-bit code space",
            codemap_len
        )));
    }
    let codemap = binutil::read_slice(bytes, 26, codemap_len as usize, "codemap")?.to_vec();
    let body_off = 26 + codemap_len as usize;
    let body = binutil::read_slice(bytes, body_off, pair_count * 2, "instruction body")?;
    let stream =
        InstructionStream::from_v2_bytes(body.to_vec(), codemap, short_delay_code, long_delay_code)?;
    Ok(Song {
        format: FormatVersion::V2,
        name: String::new(),
        stream,
        ms_length,
        hardware,
    })
}

impl From<&Song> for Vec<u8> {
    /// Serialize a song back into its container format.
    ///
    /// The instruction bytes are written verbatim, so a file read and
    /// written without edits round-trips byte for byte (modulo the v1
    /// header totals, which are recomputed from the body).
    fn from(song: &Song) -> Self {
        match song.format {
            FormatVersion::V1 => write_v1(song),
            FormatVersion::V2 => write_v2(song),
        }
    }
}

fn write_v1(song: &Song) -> Vec<u8> {
    let raw = song.stream.raw();
    let mut total_delay: u32 = 0;
    for inst in song.stream.iter() {
        if let crate::dro::instruction::Instruction::Delay { milliseconds } = inst {
            total_delay += milliseconds;
        }
    }

    let mut buf = Vec::with_capacity(24 + raw.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&[0; 8]);
    buf.extend_from_slice(&song.hardware.to_v1().to_le_bytes());
    buf.extend_from_slice(raw);
    binutil::write_u32(&mut buf, 12, total_delay);
    binutil::write_u32(&mut buf, 16, raw.len() as u32);
    buf
}

fn write_v2(song: &Song) -> Vec<u8> {
    let raw = song.stream.raw();
    let codemap = song.stream.codemap();
    let mut buf = Vec::with_capacity(26 + codemap.len() + raw.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&(song.stream.len() as u32).to_le_bytes());
    buf.extend_from_slice(&song.ms_length.to_le_bytes());
    buf.push(song.hardware.to_v2());
    buf.push(0); // format
    buf.push(0); // compression
    buf.push(song.stream.short_delay_code());
    buf.push(song.stream.long_delay_code());
    buf.push(codemap.len() as u8);
    buf.extend_from_slice(codemap);
    buf.extend_from_slice(raw);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let bytes = b"NOTADRO!\x00\x01";
        assert!(matches!(
            Song::try_from(&bytes[..]),
            Err(DroError::InvalidHeader(_))
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = Vec::from(&MAGIC[..]);
        bytes.extend_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        assert!(matches!(
            Song::try_from(&bytes[..]),
            Err(DroError::UnsupportedVersion { major: 3, minor: 0 })
        ));
    }

    #[test]
    fn v1_single_byte_hardware_quirk() {
        // Hardware stored as one byte; the following three bytes are
        // already body data (register 0x20 <- 0x01, delay 10ms needs
        // byte_length = 4, but only 3 bytes follow the one-byte field,
        // so one more trails).
        let mut bytes = Vec::from(&MAGIC[..]);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.push(0); // hardware byte
        bytes.extend_from_slice(&[0x20, 0x01, 0x00, 0x09]);
        let song = Song::try_from(&bytes[..]).unwrap();
        assert_eq!(song.format, FormatVersion::V1);
        assert_eq!(song.hardware, OplType::Opl2);
        assert_eq!(song.len(), 2);
    }

    #[test]
    fn v1_leftover_bytes_rejected() {
        let mut bytes = Vec::from(&MAGIC[..]);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0x00, 0x09, 0xFF]);
        assert!(matches!(
            Song::try_from(&bytes[..]),
            Err(DroError::CorruptFile(_))
        ));
    }

    #[test]
    fn v2_unsupported_compression() {
        let mut bytes = Vec::from(&MAGIC[..]);
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 1, 2, 3, 0]);
        assert!(matches!(
            Song::try_from(&bytes[..]),
            Err(DroError::UnsupportedFeature {
                field: "compression",
                value: 1
            })
        ));
    }

    #[test]
    fn v2_roundtrip_is_byte_identical() {
        let mut bytes = Vec::from(&MAGIC[..]);
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&266u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 2, 3, 1]);
        bytes.push(0x20); // codemap
        bytes.extend_from_slice(&[0x00, 0x10, 0x02, 0x09]);
        let song = Song::try_from(&bytes[..]).unwrap();
        assert_eq!(song.format, FormatVersion::V2);
        assert_eq!(song.ms_length, 266);
        let written: Vec<u8> = (&song).into();
        assert_eq!(written, bytes);
    }

    #[test]
    fn v1_write_recomputes_totals() {
        let stream =
            InstructionStream::from_v1_bytes(vec![0x20, 0x01, 0x00, 0x09, 0x01, 0xFF, 0x00])
                .unwrap();
        let song = Song {
            format: FormatVersion::V1,
            name: String::new(),
            stream,
            ms_length: 9999, // stale on purpose
            hardware: OplType::DualOpl2,
        };
        let bytes: Vec<u8> = (&song).into();
        assert_eq!(&bytes[0..8], MAGIC);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 10 + 256);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 7);
        assert_eq!(u32::from_le_bytes(bytes[20..24].try_into().unwrap()), 2);
        // Reading the written image yields the same body.
        let reread = Song::try_from(&bytes[..]).unwrap();
        assert_eq!(reread.stream.raw(), song.stream.raw());
        assert_eq!(reread.ms_length, 266);
    }
}
