//! Global dispatch table: the native routines reachable through `CALLP`.
//!
//! Each routine pops its arguments (last declared argument on top) and pushes
//! its result, if any. Names follow the compiler's mangling: `type__method`
//! for methods and `module$function` for library functions.

mod array;
mod bytes;
mod base;
mod dictionary;
mod math;
mod string;

use std::collections::HashMap;

use neon_core::range::{self, Span};
use neon_core::Number;
use once_cell::sync::Lazy;

use crate::error::VmError;
use crate::exec::{index_of, Executor};

pub type NativeFn = fn(&mut Executor<'_>) -> Result<(), VmError>;

static FUNCTIONS: Lazy<HashMap<&'static str, NativeFn>> = Lazy::new(|| {
    let table: &[(&'static str, NativeFn)] = &[
        ("print", base::print),
        ("concat", base::concat),
        ("str", base::str),
        ("strb", base::strb),
        ("num", base::num),
        ("sys$exit", base::exit),
        ("boolean__toString", base::strb),
        ("number__toString", base::str),
        ("array__append", array::append),
        ("array__concat", array::concat),
        ("array__extend", array::extend),
        ("array__find", array::find),
        ("array__range", array::range),
        ("array__remove", array::remove),
        ("array__resize", array::resize),
        ("array__reversed", array::reversed),
        ("array__size", array::size),
        ("array__slice", array::slice),
        ("array__splice", array::splice),
        ("array__toBytes__number", array::to_bytes),
        ("array__toString__number", array::to_string),
        ("array__toString__string", array::to_string),
        ("bytes__append", bytes::append),
        ("bytes__concat", base::concat),
        ("bytes__decodeUTF8", bytes::decode_utf8),
        ("bytes__index", bytes::index),
        ("bytes__range", bytes::range),
        ("bytes__size", bytes::size),
        ("bytes__splice", bytes::splice),
        ("bytes__toArray", bytes::to_array),
        ("bytes__toString", bytes::to_string),
        ("dictionary__keys", dictionary::keys),
        ("dictionary__remove", dictionary::remove),
        ("dictionary__size", dictionary::size),
        ("string__append", bytes::append),
        ("string__concat", base::concat),
        ("string__encodeUTF8", string::identity),
        ("string__index", string::index),
        ("string__length", bytes::size),
        ("string__splice", bytes::splice),
        ("string__substring", bytes::range),
        ("string__toString", string::identity),
        ("string$find", string::find),
        ("string$lower", string::lower),
        ("string$split", string::split),
        ("string$trimCharacters", string::trim_characters),
        ("string$upper", string::upper),
        ("math$abs", math::abs),
        ("math$ceil", math::ceil),
        ("math$floor", math::floor),
        ("math$intdiv", math::intdiv),
        ("math$max", math::max),
        ("math$min", math::min),
        ("math$odd", math::odd),
        ("math$sign", math::sign),
        ("math$trunc", math::trunc),
    ];
    table.iter().copied().collect()
});

pub fn lookup(name: &str) -> Option<NativeFn> {
    FUNCTIONS.get(name).copied()
}

/// Run the routine `name` against `exec`. `None` when no such routine exists.
pub fn call_function(name: &str, exec: &mut Executor<'_>) -> Option<Result<(), VmError>> {
    lookup(name).map(|f| f(exec))
}

/// Every registered name, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = FUNCTIONS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Integer argument for a bound or size; fractions raise `ValueRangeException`.
fn integer_arg(n: &Number) -> Result<i64, VmError> {
    if !n.is_integer() {
        return Err(VmError::raise("ValueRangeException", n.to_string()));
    }
    n.to_i64()
        .map_err(|_| VmError::raise("ValueRangeException", n.to_string()))
}

/// Index argument: fractions raise `ValueRangeException`, anything outside
/// `0..len` raises `exception`.
fn index_arg(n: &Number, len: usize, exception: &str) -> Result<usize, VmError> {
    if !n.is_integer() {
        return Err(VmError::raise("ValueRangeException", n.to_string()));
    }
    let i = index_of(n, exception)?;
    if i >= len {
        return Err(VmError::raise(exception, n.to_string()));
    }
    Ok(i)
}

/// The trailing `first, first_from_end, last, last_from_end` arguments of the
/// subrange routines. They sit above the sequence, so they are popped first.
struct Bounds {
    first: i64,
    first_from_end: bool,
    last: i64,
    last_from_end: bool,
}

impl Bounds {
    fn pop(exec: &mut Executor<'_>) -> Result<Bounds, VmError> {
        let last_from_end = exec.stack.pop_bool()?;
        let last = integer_arg(&exec.stack.pop_number()?)?;
        let first_from_end = exec.stack.pop_bool()?;
        let first = integer_arg(&exec.stack.pop_number()?)?;
        Ok(Bounds {
            first,
            first_from_end,
            last,
            last_from_end,
        })
    }

    fn span(&self, len: usize) -> Span {
        range::span(
            len,
            self.first,
            self.first_from_end,
            self.last,
            self.last_from_end,
        )
    }
}
