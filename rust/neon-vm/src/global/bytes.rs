//! Byte-buffer routines. Bytes and strings share the String cell, so the
//! string methods that only count or cut bytes are registered here too.

use neon_core::range;
use neon_core::{ByteString, Cell, Number};

use super::{index_arg, Bounds};
use crate::error::VmError;
use crate::exec::Executor;

pub(super) fn append(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let tail = exec.stack.pop_string()?;
    let addr = exec.stack.pop_address()?;
    exec.referent_mut(&addr)?.string_for_write()?.append(&tail);
    Ok(())
}

pub(super) fn decode_utf8(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_string()?;
    if let Err(e) = std::str::from_utf8(b.as_bytes()) {
        return Err(VmError::raise(
            "Utf8DecodingException",
            format!("invalid UTF-8 at byte {}", e.valid_up_to()),
        ));
    }
    exec.stack.push(Cell::String(b))
}

pub(super) fn index(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let index = exec.stack.pop_number()?;
    let b = exec.stack.pop_string()?;
    let i = index_arg(&index, b.len(), "ArrayIndexException")?;
    exec.stack.push_number(Number::from(i64::from(b.as_bytes()[i])))
}

pub(super) fn range(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let bounds = Bounds::pop(exec)?;
    let b = exec.stack.pop_string()?;
    let span = bounds.span(b.len());
    exec.stack
        .push(Cell::String(ByteString::from(range::slice(b.as_bytes(), span))))
}

pub(super) fn size(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_string()?;
    exec.stack.push_number(Number::from(b.len()))
}

pub(super) fn splice(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let bounds = Bounds::pop(exec)?;
    let b = exec.stack.pop_string()?;
    let replacement = exec.stack.pop_string()?;
    let span = bounds.span(b.len());
    let spliced = range::splice(b.as_bytes(), replacement.as_bytes(), span);
    exec.stack.push(Cell::String(ByteString::from(spliced)))
}

pub(super) fn to_array(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_string()?;
    let items = b
        .as_bytes()
        .iter()
        .map(|&byte| Cell::Number(Number::from(i64::from(byte))))
        .collect();
    exec.stack.push(Cell::new_array(items))
}

pub(super) fn to_string(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_string()?;
    exec.stack.push_string(b.hex_literal())
}
