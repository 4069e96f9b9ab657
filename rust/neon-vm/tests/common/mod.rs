//! A small assembler for building module images in tests.
#![allow(dead_code)]

use neon_vm::OpCode;

/// Exception table entry, offsets into the code.
pub struct Handler {
    pub start: u16,
    pub end: u16,
    pub name: &'static str,
    pub handler: u16,
}

#[derive(Default)]
pub struct Assembler {
    pub global_size: u16,
    strings: Vec<String>,
    exports: Vec<(String, u16, u32)>,
    imports: Vec<(String, [u8; 32])>,
    functions: Vec<(String, u32)>,
    handlers: Vec<(u16, u16, u16, u16)>,
    pub code: Vec<u8>,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            global_size: 4,
            ..Default::default()
        }
    }

    /// Index of `s` in the string table, adding it if needed.
    pub fn string(&mut self, s: &str) -> u32 {
        if let Some(i) = self.strings.iter().position(|x| x == s) {
            return i as u32;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u32
    }

    pub fn here(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn op(&mut self, op: OpCode) -> &mut Self {
        self.code.push(op as u8);
        self
    }

    pub fn op_u32(&mut self, op: OpCode, operand: u32) -> &mut Self {
        self.code.push(op as u8);
        self.code.extend_from_slice(&operand.to_be_bytes());
        self
    }

    pub fn op_u32x2(&mut self, op: OpCode, a: u32, b: u32) -> &mut Self {
        self.code.push(op as u8);
        self.code.extend_from_slice(&a.to_be_bytes());
        self.code.extend_from_slice(&b.to_be_bytes());
        self
    }

    pub fn push_bool(&mut self, b: bool) -> &mut Self {
        self.code.push(OpCode::PushB as u8);
        self.code.push(u8::from(b));
        self
    }

    pub fn push_int(&mut self, v: i32) -> &mut Self {
        self.op_u32(OpCode::PushI, v as u32)
    }

    pub fn push_str(&mut self, s: &str) -> &mut Self {
        let i = self.string(s);
        self.op_u32(OpCode::PushS, i)
    }

    pub fn push_num(&mut self, literal: &str) -> &mut Self {
        let i = self.string(literal);
        self.op_u32(OpCode::PushN, i)
    }

    pub fn call(&mut self, name: &str) -> &mut Self {
        let i = self.string(name);
        self.op_u32(OpCode::CallP, i)
    }

    pub fn except(&mut self, name: &str) -> &mut Self {
        let i = self.string(name);
        self.op_u32(OpCode::Except, i)
    }

    /// Emit a jump-type instruction with a placeholder target; returns the
    /// offset of the operand for [`Assembler::patch`].
    pub fn jump(&mut self, op: OpCode) -> usize {
        self.op_u32(op, 0);
        self.code.len() - 4
    }

    pub fn patch(&mut self, operand_at: usize, target: u32) {
        self.code[operand_at..operand_at + 4].copy_from_slice(&target.to_be_bytes());
    }

    pub fn function(&mut self, name: &str, entry: u32) {
        self.string(name);
        self.functions.push((name.to_string(), entry));
    }

    pub fn export(&mut self, name: &str, descriptor: &str, entry: u32) {
        self.string(name);
        let descriptor = self.string(descriptor) as u16;
        self.exports.push((name.to_string(), descriptor, entry));
    }

    pub fn import(&mut self, name: &str, hash: [u8; 32]) {
        self.string(name);
        self.imports.push((name.to_string(), hash));
    }

    fn index_of(&self, name: &str) -> u16 {
        self.strings
            .iter()
            .position(|s| s == name)
            .expect("name interned") as u16
    }

    pub fn handler(&mut self, h: Handler) {
        let exid = self.string(h.name) as u16;
        self.handlers.push((h.start, h.end, exid, h.handler));
    }

    /// The complete module image.
    pub fn build(&self) -> Vec<u8> {
        let mut b = vec![0x5a; 32];
        b.extend_from_slice(&self.global_size.to_be_bytes());

        let mut table = Vec::new();
        for s in &self.strings {
            table.extend_from_slice(&(s.len() as u32).to_be_bytes());
            table.extend_from_slice(s.as_bytes());
        }
        b.extend_from_slice(&(table.len() as u32).to_be_bytes());
        b.extend_from_slice(&table);

        b.extend_from_slice(&[0; 6]); // types, constants, variables
        b.extend_from_slice(&(self.exports.len() as u16).to_be_bytes());
        for (name, descriptor, entry) in &self.exports {
            b.extend_from_slice(&self.index_of(name).to_be_bytes());
            b.extend_from_slice(&descriptor.to_be_bytes());
            b.extend_from_slice(&entry.to_be_bytes());
        }
        b.extend_from_slice(&[0; 4]); // exception exports, interface exports
        b.extend_from_slice(&(self.imports.len() as u16).to_be_bytes());
        for (name, hash) in &self.imports {
            b.extend_from_slice(&self.index_of(name).to_be_bytes());
            b.extend_from_slice(hash);
        }

        b.extend_from_slice(&(self.functions.len() as u16).to_be_bytes());
        for (name, entry) in &self.functions {
            b.extend_from_slice(&self.index_of(name).to_be_bytes());
            b.extend_from_slice(&entry.to_be_bytes());
        }

        b.extend_from_slice(&(self.handlers.len() as u16).to_be_bytes());
        for (start, end, exid, handler) in &self.handlers {
            for v in [start, end, exid, handler] {
                b.extend_from_slice(&v.to_be_bytes());
            }
        }

        b.extend_from_slice(&0u16.to_be_bytes()); // classes
        b.extend_from_slice(&self.code);
        b
    }
}
