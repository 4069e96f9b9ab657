use neon_core::Number;

use crate::error::VmError;
use crate::exec::Executor;

fn unary(exec: &mut Executor<'_>, f: fn(&Number) -> Number) -> Result<(), VmError> {
    let x = exec.stack.pop_number()?;
    exec.stack.push_number(f(&x))
}

pub(super) fn abs(exec: &mut Executor<'_>) -> Result<(), VmError> {
    unary(exec, Number::abs)
}

pub(super) fn ceil(exec: &mut Executor<'_>) -> Result<(), VmError> {
    unary(exec, Number::ceil)
}

pub(super) fn floor(exec: &mut Executor<'_>) -> Result<(), VmError> {
    unary(exec, Number::floor)
}

pub(super) fn sign(exec: &mut Executor<'_>) -> Result<(), VmError> {
    unary(exec, Number::sign)
}

pub(super) fn trunc(exec: &mut Executor<'_>) -> Result<(), VmError> {
    unary(exec, Number::trunc)
}

pub(super) fn odd(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let x = exec.stack.pop_number()?;
    if !x.is_integer() {
        return Err(VmError::raise(
            "ValueRangeException",
            format!("odd() requires integer: {}", x),
        ));
    }
    let two = Number::from(2);
    let odd = x
        .checked_rem(&two)
        .is_some_and(|r| !r.is_zero());
    exec.stack.push_bool(odd)
}

/// Integer division, truncating toward zero.
pub(super) fn intdiv(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let y = exec.stack.pop_number()?;
    let x = exec.stack.pop_number()?;
    let q = x
        .checked_div_trunc(&y)
        .ok_or_else(|| VmError::raise("DivideByZeroException", ""))?;
    exec.stack.push_number(q)
}

pub(super) fn max(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let y = exec.stack.pop_number()?;
    let x = exec.stack.pop_number()?;
    exec.stack.push_number(x.max(y))
}

pub(super) fn min(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let y = exec.stack.pop_number()?;
    let x = exec.stack.pop_number()?;
    exec.stack.push_number(x.min(y))
}
