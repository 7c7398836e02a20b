//! Ordered, mutable, logically-indexed view over a raw DRO body.
//!
//! `InstructionStream` owns the instruction bytes exactly as they
//! appear on disk and decodes them on demand. Logical indices address
//! whole instructions; physical offsets address bytes. For v1 (the
//! variable-length encoding) an explicit index map translates between
//! the two and is regenerated after every mutation; for v2 translation
//! is simply `index * 2`.
//!
//! The stream itself provides no locking. If one thread mutates a
//! stream while another analyzes it, the caller must serialize the two.

use crate::binutil::DroError;
use crate::dro::instruction::{self, Instruction};

/// Per-format layout state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    /// Variable-length encoding: logical index -> physical offset.
    V1 { index_map: Vec<usize> },
    /// Fixed two-byte stride plus the register codemap (at most 128
    /// entries, enforced by the reader).
    V2 { codemap: Vec<u8> },
}

/// A mutable, logically-indexed instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionStream {
    data: Vec<u8>,
    short_delay_code: u8,
    long_delay_code: u8,
    layout: Layout,
}

impl InstructionStream {
    /// Build a v1 stream from raw body bytes.
    ///
    /// Walks the body once to build the index map; an instruction
    /// overrunning the body yields `CorruptFile`.
    pub fn from_v1_bytes(data: Vec<u8>) -> Result<Self, DroError> {
        let mut stream = InstructionStream {
            data,
            short_delay_code: instruction::V1_SHORT_DELAY,
            long_delay_code: instruction::V1_LONG_DELAY,
            layout: Layout::V1 { index_map: Vec::new() },
        };
        stream.regenerate_index_map()?;
        Ok(stream)
    }

    /// Build a v2 stream from raw pair bytes and its format metadata.
    ///
    /// `data` must hold whole register/value pairs, and every non-delay
    /// code must resolve through the codemap.
    pub fn from_v2_bytes(
        data: Vec<u8>,
        codemap: Vec<u8>,
        short_delay_code: u8,
        long_delay_code: u8,
    ) -> Result<Self, DroError> {
        if data.len() % 2 != 0 {
            return Err(DroError::CorruptFile(format!(
                "v2 body length {} is not a whole number of pairs",
                data.len()
            )));
        }
        for pair in data.chunks_exact(2) {
            instruction::decode_v2(pair[0], pair[1], &codemap, short_delay_code, long_delay_code)?;
        }
        Ok(InstructionStream {
            data,
            short_delay_code,
            long_delay_code,
            layout: Layout::V2 { codemap },
        })
    }

    /// Number of logical instructions in the stream.
    pub fn len(&self) -> usize {
        match &self.layout {
            Layout::V1 { index_map } => index_map.len(),
            Layout::V2 { .. } => self.data.len() / 2,
        }
    }

    /// True when the stream holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw instruction bytes, exactly as serialized.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// The in-file code marking a short delay.
    pub fn short_delay_code(&self) -> u8 {
        self.short_delay_code
    }

    /// The in-file code marking a long delay.
    pub fn long_delay_code(&self) -> u8 {
        self.long_delay_code
    }

    /// The v2 codemap; empty for v1 streams.
    pub fn codemap(&self) -> &[u8] {
        match &self.layout {
            Layout::V1 { .. } => &[],
            Layout::V2 { codemap } => codemap,
        }
    }

    /// Translate a logical index to its physical byte offset.
    ///
    /// Fails with `IndexOutOfRange` for any index at or past the end,
    /// including one-past-the-end; callers use that to detect the last
    /// element.
    pub fn translate(&self, index: usize) -> Result<usize, DroError> {
        let len = self.len();
        if index >= len {
            return Err(DroError::IndexOutOfRange { index, len });
        }
        Ok(match &self.layout {
            Layout::V1 { index_map } => index_map[index],
            Layout::V2 { .. } => index * 2,
        })
    }

    /// Decode the instruction at a logical index.
    pub fn decode(&self, index: usize) -> Result<Instruction, DroError> {
        let off = self.translate(index)?;
        match &self.layout {
            Layout::V1 { .. } => instruction::decode_v1(&self.data, off).map(|(inst, _)| inst),
            Layout::V2 { codemap } => instruction::decode_v2(
                self.data[off],
                self.data[off + 1],
                codemap,
                self.short_delay_code,
                self.long_delay_code,
            ),
        }
    }

    /// Iterate over all decoded instructions.
    ///
    /// Decoding errors cannot occur once the stream is constructed, so
    /// the iterator yields plain instructions.
    pub fn iter(&self) -> impl Iterator<Item = Instruction> + '_ {
        (0..self.len()).map(move |i| {
            self.decode(i)
                .unwrap_or(Instruction::Delay { milliseconds: 0 })
        })
    }

    /// The physical byte range occupied by the instruction at `index`.
    fn raw_range(&self, index: usize) -> Result<std::ops::Range<usize>, DroError> {
        let start = self.translate(index)?;
        let end = match self.translate(index + 1) {
            Ok(off) => off,
            Err(DroError::IndexOutOfRange { .. }) => self.data.len(),
            Err(e) => return Err(e),
        };
        Ok(start..end)
    }

    /// The raw bytes of the instruction at `index`.
    pub fn raw_slice(&self, index: usize) -> Result<&[u8], DroError> {
        Ok(&self.data[self.raw_range(index)?])
    }

    /// Delete the instructions at the given logical indices.
    ///
    /// Accepts unsorted input. Raw bytes are captured in ascending index
    /// order (the pairs an external undo layer feeds back into
    /// `insert_multiple`), then deletion proceeds from the highest index
    /// down so earlier offsets stay valid against the stale index map.
    /// The index map is regenerated afterward.
    pub fn delete_multiple(
        &mut self,
        indices: &[usize],
    ) -> Result<Vec<(usize, Vec<u8>)>, DroError> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut removed = Vec::with_capacity(sorted.len());
        for &i in &sorted {
            removed.push((i, self.raw_slice(i)?.to_vec()));
        }
        for &i in sorted.iter().rev() {
            let range = self.raw_range(i)?;
            self.data.drain(range);
        }
        self.regenerate_index_map()?;
        Ok(removed)
    }

    /// Insert raw instruction bytes at the given logical indices.
    ///
    /// Pairs must be in ascending index order and each index refers to
    /// the stream as it stands once the preceding pairs of the same call
    /// have been applied (the shape `delete_multiple` returns). Two
    /// running adjustments keep the stale index map usable: the count of
    /// pairs already applied and the cumulative byte drift they caused.
    /// An index equal to the (adjusted) length appends at the end. The
    /// index map is regenerated afterward.
    pub fn insert_multiple(&mut self, pairs: &[(usize, Vec<u8>)]) -> Result<(), DroError> {
        let stale_len = self.len();
        let stale_raw_len = self.data.len();
        let mut applied = 0usize;
        let mut drift = 0usize;
        for (index, bytes) in pairs {
            let logical = index - applied.min(*index);
            if logical > stale_len {
                return Err(DroError::IndexOutOfRange {
                    index: *index,
                    len: stale_len + applied,
                });
            }
            let base = if logical == stale_len {
                stale_raw_len
            } else {
                match &self.layout {
                    Layout::V1 { index_map } => index_map[logical],
                    Layout::V2 { .. } => logical * 2,
                }
            };
            let at = base + drift;
            self.data.splice(at..at, bytes.iter().copied());
            applied += 1;
            drift += bytes.len();
        }
        self.regenerate_index_map()?;
        Ok(())
    }

    /// Copy the stream's format metadata without its instruction bytes.
    ///
    /// A replacement buffer, when supplied, becomes the copy's data and
    /// (for v1) has its index map rebuilt. Analyses use this to run the
    /// decode rules over a filtered sub-stream.
    pub fn shallow_copy(&self, new_data: Option<Vec<u8>>) -> Result<InstructionStream, DroError> {
        let data = new_data.unwrap_or_default();
        match &self.layout {
            Layout::V1 { .. } => InstructionStream::from_v1_bytes(data),
            Layout::V2 { codemap } => InstructionStream::from_v2_bytes(
                data,
                codemap.clone(),
                self.short_delay_code,
                self.long_delay_code,
            ),
        }
    }

    /// Rebuild the logical-index -> physical-offset map (v1), or check
    /// the pair alignment still holds (v2).
    fn regenerate_index_map(&mut self) -> Result<(), DroError> {
        match &mut self.layout {
            Layout::V1 { index_map } => {
                index_map.clear();
                let mut off = 0;
                while off < self.data.len() {
                    index_map.push(off);
                    let size = instruction::v1_size(self.data[off]);
                    if off + size > self.data.len() {
                        return Err(DroError::CorruptFile(format!(
                            "instruction at offset 0x{:X} overruns the body ({} bytes needed)",
                            off, size
                        )));
                    }
                    off += size;
                }
            }
            Layout::V2 { .. } => {
                if self.data.len() % 2 != 0 {
                    return Err(DroError::CorruptFile(format!(
                        "v2 body length {} is not a whole number of pairs",
                        self.data.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_stream() -> InstructionStream {
        // Register 0x20<-0x01, short delay 10ms, bank high, long delay
        // 0x1235ms, register 0xB0<-0x2D.
        InstructionStream::from_v1_bytes(vec![
            0x20, 0x01, 0x00, 0x09, 0x03, 0x01, 0x34, 0x12, 0xB0, 0x2D,
        ])
        .unwrap()
    }

    #[test]
    fn v1_index_map_and_translate() {
        let s = v1_stream();
        assert_eq!(s.len(), 5);
        assert_eq!(s.translate(0).unwrap(), 0);
        assert_eq!(s.translate(2).unwrap(), 4);
        assert_eq!(s.translate(4).unwrap(), 8);
        assert!(matches!(
            s.translate(5),
            Err(DroError::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn v1_truncated_body_rejected() {
        assert!(matches!(
            InstructionStream::from_v1_bytes(vec![0x20, 0x01, 0x01, 0x34]),
            Err(DroError::CorruptFile(_))
        ));
    }

    #[test]
    fn v2_translate_is_pure_stride() {
        let s = InstructionStream::from_v2_bytes(vec![0x00, 0x10, 0x02, 0x09], vec![0x20], 2, 3)
            .unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.translate(1).unwrap(), 2);
        assert!(s.translate(2).is_err());
    }

    #[test]
    fn delete_then_reinsert_is_byte_identical() {
        let mut s = v1_stream();
        let before = s.raw().to_vec();
        let removed = s.delete_multiple(&[3, 1]).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0], (1, vec![0x00, 0x09]));
        assert_eq!(removed[1], (3, vec![0x01, 0x34, 0x12]));
        assert_eq!(s.len(), 3);
        s.insert_multiple(&removed).unwrap();
        assert_eq!(s.raw(), &before[..]);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn delete_last_then_reinsert() {
        let mut s = v1_stream();
        let before = s.raw().to_vec();
        let removed = s.delete_multiple(&[4]).unwrap();
        s.insert_multiple(&removed).unwrap();
        assert_eq!(s.raw(), &before[..]);
    }

    #[test]
    fn shallow_copy_keeps_metadata_only() {
        let s = InstructionStream::from_v2_bytes(vec![0x00, 0x10], vec![0x20], 2, 3).unwrap();
        let copy = s.shallow_copy(None).unwrap();
        assert_eq!(copy.len(), 0);
        assert_eq!(copy.codemap(), &[0x20]);
        assert_eq!(copy.short_delay_code(), 2);
        let copy2 = s.shallow_copy(Some(vec![0x02, 0x04])).unwrap();
        assert_eq!(copy2.len(), 1);
        assert_eq!(
            copy2.decode(0).unwrap(),
            Instruction::Delay { milliseconds: 5 }
        );
    }
}
