use drolog::Song;
use drolog::analysis::{CancelToken, RegisterStateTracker};

fn v2_file(pairs: &[(u8, u8)], codemap: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"DBRAWOPL");
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&[2, 0, 0, 2, 3, codemap.len() as u8]);
    bytes.extend_from_slice(codemap);
    for (code, value) in pairs {
        bytes.push(*code);
        bytes.push(*value);
    }
    bytes
}

#[test]
fn v2_bank_bit_drives_the_tracker() {
    // codemap: [0xB0]. Same write on bank 0 and bank 1, then repeated.
    let bytes = v2_file(&[(0x00, 0x2D), (0x80, 0x2D), (0x80, 0x2D)], &[0xB0]);
    let song = Song::try_from(bytes.as_slice()).unwrap();
    let mut tracker = RegisterStateTracker::new();
    let out = tracker.analyze(&song, &CancelToken::new());
    assert_eq!(out.len(), 3);
    // Per-bank state is independent: the bank-1 write is a first touch.
    assert_eq!(out[0].0, 0);
    assert_eq!(out[1].0, 1);
    assert_eq!(out[1].1, "Key On / Octave (Block) / Frequency (high 2 bits)");
    assert_eq!(out[2].1, "(no changes)");
}

#[test]
fn delays_report_their_milliseconds() {
    let bytes = v2_file(&[(2, 9), (3, 1)], &[0xB0]);
    let song = Song::try_from(bytes.as_slice()).unwrap();
    let mut tracker = RegisterStateTracker::new();
    let out = tracker.analyze(&song, &CancelToken::new());
    assert_eq!(out[0].1, "Delay: 10 ms");
    assert_eq!(out[1].1, "Delay: 512 ms");
}

#[test]
fn partial_field_change_names_only_the_changed_fields() {
    // 0xC0: panning 0x30, feedback 0x0E, synthesis type 0x01.
    let bytes = v2_file(&[(0x00, 0x0E), (0x00, 0x0F), (0x00, 0x3F)], &[0xC0]);
    let song = Song::try_from(bytes.as_slice()).unwrap();
    let mut tracker = RegisterStateTracker::new();
    let out = tracker.analyze(&song, &CancelToken::new());
    assert_eq!(out[0].1, "Panning / Feedback / Synthesis Type");
    assert_eq!(out[1].1, "Synthesis Type");
    assert_eq!(out[2].1, "Panning");
}

#[test]
fn cancelled_token_stops_the_replay() {
    let bytes = v2_file(&[(2, 9), (2, 9), (2, 9)], &[0xB0]);
    let song = Song::try_from(bytes.as_slice()).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let mut tracker = RegisterStateTracker::new();
    assert!(tracker.analyze(&song, &token).is_empty());
}
