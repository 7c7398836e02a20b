use drolog::{DroError, Instruction, InstructionStream};

fn v1_stream() -> InstructionStream {
    // reg 0x20<-0x01, delay 10, bank high, long delay 0x1235, reg 0xB0<-0x2D
    InstructionStream::from_v1_bytes(vec![
        0x20, 0x01, 0x00, 0x09, 0x03, 0x01, 0x34, 0x12, 0xB0, 0x2D,
    ])
    .unwrap()
}

#[test]
fn decode_and_translate_agree() {
    let s = v1_stream();
    assert_eq!(s.len(), 5);
    let expected = [
        Instruction::Register {
            command: 0x20,
            value: 0x01,
            bank: None,
        },
        Instruction::Delay { milliseconds: 10 },
        Instruction::BankSwitch { bank: 1 },
        Instruction::Delay {
            milliseconds: 0x1236,
        },
        Instruction::Register {
            command: 0xB0,
            value: 0x2D,
            bank: None,
        },
    ];
    for (i, want) in expected.iter().enumerate() {
        assert_eq!(&s.decode(i).unwrap(), want);
        let off = s.translate(i).unwrap();
        assert!(off < s.raw().len());
    }
    assert!(matches!(
        s.decode(5),
        Err(DroError::IndexOutOfRange { index: 5, len: 5 })
    ));
}

#[test]
fn bulk_delete_accepts_unsorted_duplicate_indices() {
    let mut s = v1_stream();
    let removed = s.delete_multiple(&[4, 0, 4]).unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(removed[0].0, 0);
    assert_eq!(removed[1].0, 4);
    assert_eq!(s.len(), 3);
    assert_eq!(s.decode(0).unwrap(), Instruction::Delay { milliseconds: 10 });
}

#[test]
fn reinserting_removed_bytes_restores_the_buffer() {
    let mut s = v1_stream();
    let before = s.raw().to_vec();
    let removed = s.delete_multiple(&[0, 2, 3]).unwrap();
    assert_eq!(s.len(), 2);
    s.insert_multiple(&removed).unwrap();
    assert_eq!(s.raw(), &before[..]);
}

#[test]
fn insert_appends_at_one_past_the_end() {
    let mut s = v1_stream();
    s.insert_multiple(&[(5, vec![0x00, 0x00])]).unwrap();
    assert_eq!(s.len(), 6);
    assert_eq!(s.decode(5).unwrap(), Instruction::Delay { milliseconds: 1 });
    assert!(s.insert_multiple(&[(9, vec![0x00, 0x00])]).is_err());
}

#[test]
fn v2_stream_rejects_unmapped_codes() {
    // code 5 is neither a delay code nor inside the one-entry codemap.
    assert!(matches!(
        InstructionStream::from_v2_bytes(vec![0x05, 0x10], vec![0x20], 2, 3),
        Err(DroError::CorruptFile(_))
    ));
    assert!(InstructionStream::from_v2_bytes(vec![0x00, 0x10], vec![0x20], 2, 3).is_ok());
}

#[test]
fn shallow_copy_reuses_decode_rules_on_new_bytes() {
    let s = InstructionStream::from_v2_bytes(vec![0x80, 0x55], vec![0xC0], 2, 3).unwrap();
    let filtered = s.shallow_copy(Some(vec![0x00, 0x11])).unwrap();
    assert_eq!(
        filtered.decode(0).unwrap(),
        Instruction::Register {
            command: 0xC0,
            value: 0x11,
            bank: Some(0)
        }
    );
}
