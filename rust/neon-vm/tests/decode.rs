//! Module image decoding through the public API.

mod common;

use common::{Assembler, Handler};
use neon_core::ByteString;
use neon_vm::bytecode::{ExportFunction, Import};
use neon_vm::{Bytecode, DecodeError, OpCode};

fn sample() -> Assembler {
    let mut asm = Assembler::new();
    asm.global_size = 3;
    asm.push_str("hello").call("print");
    asm.function("main", 0);
    asm.export("main", "F()", 0);
    asm.import("lib", [0x11; 32]);
    asm.handler(Handler {
        start: 0,
        end: 5,
        name: "AnyException",
        handler: 10,
    });
    asm
}

#[test]
fn decode_assembled_module() {
    let module = Bytecode::decode(&sample().build()).expect("should decode");
    assert_eq!(module.source_hash, [0x5a; 32]);
    assert_eq!(module.global_size, 3);
    assert_eq!(
        module.strings,
        vec![
            ByteString::from("hello"),
            ByteString::from("print"),
            ByteString::from("main"),
            ByteString::from("F()"),
            ByteString::from("lib"),
            ByteString::from("AnyException"),
        ]
    );
    assert_eq!(module.function_entry("main"), Some(0));
    assert_eq!(
        module.export_functions,
        vec![ExportFunction {
            name: 2,
            descriptor: 3,
            entry: 0
        }]
    );
    assert_eq!(
        module.imports,
        vec![Import {
            name: 4,
            hash: [0x11; 32]
        }]
    );
    assert_eq!(module.exceptions.len(), 1);
    assert!(module.exceptions[0].covers(4));
    assert!(!module.exceptions[0].covers(5));
    assert_eq!(module.code.len(), 10);
    assert_eq!(module.code[0], OpCode::PushS as u8);
}

#[test]
fn decode_rejects_every_truncated_header() {
    let asm = sample();
    let full = asm.build();
    let header_len = full.len() - asm.code.len();
    for cut in 0..header_len {
        match Bytecode::decode(&full[..cut]) {
            Err(DecodeError::ReadPastEnd { len, .. }) => assert_eq!(len, cut),
            other => panic!("cut at {}: expected ReadPastEnd, got {:?}", cut, other),
        }
    }
}

#[test]
fn decode_rejects_cut_inside_export_and_import_records() {
    let full = sample().build();
    let table: usize = ["hello", "print", "main", "F()", "lib", "AnyException"]
        .iter()
        .map(|s| 4 + s.len())
        .sum();
    // hash, global size, table size, table, type/constant/variable counts
    let export_count_at = 32 + 2 + 4 + table + 6;
    let export_at = export_count_at + 2;
    for cut in [export_at + 3, export_at + 6] {
        assert!(matches!(
            Bytecode::decode(&full[..cut]),
            Err(DecodeError::ReadPastEnd { .. })
        ));
    }
    // one 8-byte export record, then exception and interface export counts
    let import_at = export_at + 8 + 4 + 2;
    let cut = import_at + 2 + 16;
    match Bytecode::decode(&full[..cut]) {
        Err(DecodeError::ReadPastEnd { offset, needed, len }) => {
            assert_eq!(offset, import_at + 2);
            assert_eq!(needed, 32);
            assert_eq!(len, cut);
        }
        other => panic!("expected ReadPastEnd, got {:?}", other),
    }
}

#[test]
fn decode_empty_input_fails() {
    assert!(Bytecode::decode(&[]).is_err());
}

#[test]
fn decode_strings_may_hold_any_bytes() {
    let mut image = vec![0; 32];
    image.extend_from_slice(&0u16.to_be_bytes());
    let raw = [0xffu8, 0x00, 0x80];
    image.extend_from_slice(&(4 + raw.len() as u32).to_be_bytes());
    image.extend_from_slice(&(raw.len() as u32).to_be_bytes());
    image.extend_from_slice(&raw);
    image.extend_from_slice(&[0; 20]);
    let module = Bytecode::decode(&image).unwrap();
    assert_eq!(module.strings, vec![ByteString::from_bytes(&raw)]);
    assert!(module.code.is_empty());
}
