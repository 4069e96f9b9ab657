use neon_core::{Cell, CellError, Number};

use crate::error::VmError;
use crate::exec::Executor;

pub(super) fn keys(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let keys = match exec.stack.pop()? {
        Cell::Dictionary(d) => d.keys().into_iter().map(Cell::String).collect(),
        Cell::Nothing => Vec::new(),
        other => return Err(CellError::mismatch("dictionary", other.type_name()).into()),
    };
    exec.stack.push(Cell::new_array(keys))
}

pub(super) fn remove(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let key = exec.stack.pop_string()?;
    let addr = exec.stack.pop_address()?;
    let cell = exec.referent_mut(&addr)?;
    if !cell.is_nothing() {
        cell.dictionary_for_write()?.remove(&key);
    }
    Ok(())
}

pub(super) fn size(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let len = match exec.stack.pop()? {
        Cell::Nothing => 0,
        other => other.as_dictionary()?.len(),
    };
    exec.stack.push_number(Number::from(len))
}
