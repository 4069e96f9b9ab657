//! Decoding of compiled Neon modules.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! source_hash            32 bytes
//! global_size            u16
//! string_table_size      u32, then that many bytes of {len: u32, bytes}
//! type_count             u16
//! constant_count         u16
//! variable_count         u16
//! export_function_count  u16, then {name: u16, descriptor: u16, entry: u32}
//! exception_export_count u16
//! interface_export_count u16
//! import_count           u16, then {name: u16, hash: 32 bytes}
//! function_count         u16, then {name: u16, entry: u32}
//! exception_count        u16, then {start: u16, end: u16, exid: u16, handler: u16}
//! class_count            u16
//! code                   rest of the buffer
//! ```

use neon_core::ByteString;
use serde::Serialize;
use thiserror::Error;

pub const HASH_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("read past end of buffer: {needed} bytes at offset {offset}, buffer is {len} bytes")]
    ReadPastEnd {
        offset: usize,
        needed: usize,
        len: usize,
    },
}

/// Bounds-checked big-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    /// Position of `bytes[0]` in the whole module, for error reporting.
    base: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader {
            bytes,
            offset: 0,
            base: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let past_end = || DecodeError::ReadPastEnd {
            offset: self.base + self.offset,
            needed: len,
            len: self.base + self.bytes.len(),
        };
        let end = self.offset.checked_add(len).ok_or_else(past_end)?;
        let slice = self.bytes.get(self.offset..end).ok_or_else(past_end)?;
        self.offset = end;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_hash(&mut self) -> Result<[u8; HASH_LEN], DecodeError> {
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(self.take(HASH_LEN)?);
        Ok(hash)
    }

    /// A reader over the next `len` bytes; this reader skips past them.
    fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, DecodeError> {
        let base = self.base + self.offset;
        let bytes = self.take(len)?;
        Ok(Reader {
            bytes,
            offset: 0,
            base,
        })
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn rest(self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFunction {
    pub name: u16,
    pub descriptor: u16,
    pub entry: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub name: u16,
    pub hash: [u8; HASH_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: u16,
    pub entry: u32,
}

/// Handler covering code offsets `start..end` for exceptions named by `exid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionEntry {
    pub start: u16,
    pub end: u16,
    pub exid: u16,
    pub handler: u16,
}

impl ExceptionEntry {
    pub fn covers(&self, ip: usize) -> bool {
        usize::from(self.start) <= ip && ip < usize::from(self.end)
    }
}

/// A decoded module. Immutable once built; executors borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bytecode {
    pub source_hash: [u8; HASH_LEN],
    pub global_size: u16,
    pub strings: Vec<ByteString>,
    pub type_count: u16,
    pub constant_count: u16,
    pub variable_count: u16,
    pub export_functions: Vec<ExportFunction>,
    pub exception_export_count: u16,
    pub interface_export_count: u16,
    pub imports: Vec<Import>,
    pub functions: Vec<Function>,
    pub exceptions: Vec<ExceptionEntry>,
    pub class_count: u16,
    pub code: Vec<u8>,
}

impl Bytecode {
    /// Decode a whole module. Any truncated field fails the decode; no
    /// partially filled object is ever returned.
    pub fn decode(bytes: &[u8]) -> Result<Bytecode, DecodeError> {
        let mut r = Reader::new(bytes);

        let source_hash = r.read_hash()?;
        let global_size = r.read_u16()?;

        let table_size = r.read_u32()? as usize;
        let mut table = r.sub_reader(table_size)?;
        let mut strings = Vec::new();
        while !table.is_empty() {
            let len = table.read_u32()? as usize;
            strings.push(ByteString::from_bytes(table.take(len)?));
        }

        let type_count = r.read_u16()?;
        let constant_count = r.read_u16()?;
        let variable_count = r.read_u16()?;

        let export_count = r.read_u16()?;
        let mut export_functions = Vec::with_capacity(usize::from(export_count));
        for _ in 0..export_count {
            export_functions.push(ExportFunction {
                name: r.read_u16()?,
                descriptor: r.read_u16()?,
                entry: r.read_u32()?,
            });
        }

        let exception_export_count = r.read_u16()?;
        let interface_export_count = r.read_u16()?;

        let import_count = r.read_u16()?;
        let mut imports = Vec::with_capacity(usize::from(import_count));
        for _ in 0..import_count {
            imports.push(Import {
                name: r.read_u16()?,
                hash: r.read_hash()?,
            });
        }

        let function_count = r.read_u16()?;
        let mut functions = Vec::with_capacity(usize::from(function_count));
        for _ in 0..function_count {
            functions.push(Function {
                name: r.read_u16()?,
                entry: r.read_u32()?,
            });
        }

        let exception_count = r.read_u16()?;
        let mut exceptions = Vec::with_capacity(usize::from(exception_count));
        for _ in 0..exception_count {
            exceptions.push(ExceptionEntry {
                start: r.read_u16()?,
                end: r.read_u16()?,
                exid: r.read_u16()?,
                handler: r.read_u16()?,
            });
        }

        let class_count = r.read_u16()?;
        let code = r.rest().to_vec();

        tracing::info!(
            globals = global_size,
            strings = strings.len(),
            functions = functions.len(),
            exceptions = exceptions.len(),
            code_len = code.len(),
            "decoded module"
        );

        Ok(Bytecode {
            source_hash,
            global_size,
            strings,
            type_count,
            constant_count,
            variable_count,
            export_functions,
            exception_export_count,
            interface_export_count,
            imports,
            functions,
            exceptions,
            class_count,
            code,
        })
    }

    pub fn string(&self, index: usize) -> Option<&ByteString> {
        self.strings.get(index)
    }

    /// Entry offset of the function whose name is `name`.
    pub fn function_entry(&self, name: &str) -> Option<u32> {
        self.functions
            .iter()
            .find(|f| {
                self.string(usize::from(f.name))
                    .is_some_and(|s| s.as_bytes() == name.as_bytes())
            })
            .map(|f| f.entry)
    }
}

/// A module with no tables, for unit tests that drive the executor directly.
#[cfg(test)]
pub(crate) fn test_module(strings: &[&str], global_size: u16, code: Vec<u8>) -> Bytecode {
    Bytecode {
        source_hash: [0; HASH_LEN],
        global_size,
        strings: strings.iter().map(|s| ByteString::from(*s)).collect(),
        type_count: 0,
        constant_count: 0,
        variable_count: 0,
        export_functions: Vec::new(),
        exception_export_count: 0,
        interface_export_count: 0,
        imports: Vec::new(),
        functions: Vec::new(),
        exceptions: Vec::new(),
        class_count: 0,
        code,
    }
}
