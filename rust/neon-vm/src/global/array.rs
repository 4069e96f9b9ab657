use neon_core::range;
use neon_core::{ByteString, Cell, Number};

use super::{index_arg, integer_arg, Bounds};
use crate::error::VmError;
use crate::exec::Executor;

pub(super) fn append(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let element = exec.stack.pop()?;
    let addr = exec.stack.pop_address()?;
    exec.referent_mut(&addr)?.array_for_write()?.push(element);
    Ok(())
}

pub(super) fn concat(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_array()?;
    let mut a = exec.stack.pop_array()?;
    a.extend(b);
    exec.stack.push(Cell::new_array(a))
}

pub(super) fn extend(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_array()?;
    let addr = exec.stack.pop_address()?;
    exec.referent_mut(&addr)?.array_for_write()?.extend(b);
    Ok(())
}

pub(super) fn find(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let element = exec.stack.pop()?;
    let a = exec.stack.pop_array()?;
    match a.iter().position(|e| *e == element) {
        Some(i) => exec.stack.push_number(Number::from(i)),
        None => Err(VmError::raise(
            "ArrayValueNotFoundException",
            "value not found in array",
        )),
    }
}

/// `array__range(first, last, step)`: inclusive arithmetic progression.
pub(super) fn range(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let step = exec.stack.pop_number()?;
    let last = exec.stack.pop_number()?;
    let first = exec.stack.pop_number()?;
    if step.is_zero() {
        return Err(VmError::raise("ValueRangeException", step.to_string()));
    }
    let mut items = Vec::new();
    let mut x = first;
    if step.is_negative() {
        while x >= last {
            let next = advance(&x, &step)?;
            items.push(Cell::Number(x));
            x = next;
        }
    } else {
        while x <= last {
            let next = advance(&x, &step)?;
            items.push(Cell::Number(x));
            x = next;
        }
    }
    exec.stack.push(Cell::new_array(items))
}

/// `x + step`, refusing a step too small to change `x` at full precision.
fn advance(x: &Number, step: &Number) -> Result<Number, VmError> {
    let next = x + step;
    if next == *x {
        return Err(VmError::raise("ValueRangeException", step.to_string()));
    }
    Ok(next)
}

pub(super) fn remove(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let index = exec.stack.pop_number()?;
    let addr = exec.stack.pop_address()?;
    let items = exec.referent_mut(&addr)?.array_for_write()?;
    let i = index_arg(&index, items.len(), "ArrayIndexException")?;
    items.remove(i);
    Ok(())
}

pub(super) fn resize(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let size = exec.stack.pop_number()?;
    let addr = exec.stack.pop_address()?;
    let n = integer_arg(&size)?;
    let n = usize::try_from(n).map_err(|_| VmError::raise("ValueRangeException", size.to_string()))?;
    exec.check_alloc(n)?;
    exec.referent_mut(&addr)?
        .array_for_write()?
        .resize(n, Cell::Nothing);
    Ok(())
}

pub(super) fn reversed(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let mut a = exec.stack.pop_array()?;
    a.reverse();
    exec.stack.push(Cell::new_array(a))
}

pub(super) fn size(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let a = exec.stack.pop_array()?;
    exec.stack.push_number(Number::from(a.len()))
}

pub(super) fn slice(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let bounds = Bounds::pop(exec)?;
    let a = exec.stack.pop_array()?;
    let span = bounds.span(a.len());
    exec.stack.push(Cell::new_array(range::slice(&a, span)))
}

pub(super) fn splice(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let bounds = Bounds::pop(exec)?;
    let a = exec.stack.pop_array()?;
    let replacement = exec.stack.pop_array()?;
    let span = bounds.span(a.len());
    exec.stack
        .push(Cell::new_array(range::splice(&a, &replacement, span)))
}

pub(super) fn to_bytes(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let a = exec.stack.pop_array()?;
    let mut out = ByteString::new();
    for e in &a {
        let n = e.as_number()?;
        match n.to_i64() {
            Ok(b @ 0..=255) if n.is_integer() => out.push(b as u8),
            _ => {
                return Err(VmError::raise(
                    "ByteOutOfRangeException",
                    n.to_string(),
                ))
            }
        }
    }
    exec.stack.push(Cell::String(out))
}

pub(super) fn to_string(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let a = exec.stack.pop_array()?;
    exec.stack.push_string(Cell::new_array(a).to_string())
}
