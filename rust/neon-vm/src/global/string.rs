use neon_core::{ByteString, Cell, Number};

use super::index_arg;
use crate::error::VmError;
use crate::exec::Executor;

/// `string__toString` and `string__encodeUTF8`: strings already are bytes.
pub(super) fn identity(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let s = exec.stack.pop_string()?;
    exec.stack.push(Cell::String(s))
}

pub(super) fn index(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let index = exec.stack.pop_number()?;
    let s = exec.stack.pop_string()?;
    let i = index_arg(&index, s.len(), "StringIndexException")?;
    exec.stack
        .push(Cell::String(ByteString::from_bytes(&s.as_bytes()[i..=i])))
}

/// Byte offset of the first occurrence, or -1.
pub(super) fn find(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let needle = exec.stack.pop_string()?;
    let s = exec.stack.pop_string()?;
    let at = match s.find(&needle) {
        Some(i) => Number::from(i),
        None => Number::from(-1),
    };
    exec.stack.push_number(at)
}

fn map_case(exec: &mut Executor<'_>, upper: bool) -> Result<(), VmError> {
    let s = exec.stack.pop_string()?;
    let mapped = match std::str::from_utf8(s.as_bytes()) {
        Ok(text) if upper => text.to_uppercase().into_bytes(),
        Ok(text) => text.to_lowercase().into_bytes(),
        Err(_) if upper => s.as_bytes().to_ascii_uppercase(),
        Err(_) => s.as_bytes().to_ascii_lowercase(),
    };
    exec.stack.push(Cell::String(ByteString::from(mapped)))
}

pub(super) fn lower(exec: &mut Executor<'_>) -> Result<(), VmError> {
    map_case(exec, false)
}

pub(super) fn upper(exec: &mut Executor<'_>) -> Result<(), VmError> {
    map_case(exec, true)
}

/// Split on every occurrence of the delimiter. An empty delimiter yields the
/// whole string as the only piece.
pub(super) fn split(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let delimiter = exec.stack.pop_string()?;
    let s = exec.stack.pop_string()?;
    let bytes = s.as_bytes();
    let d = delimiter.as_bytes();
    let mut pieces = Vec::new();
    if d.is_empty() {
        pieces.push(Cell::String(s.clone()));
    } else {
        let mut start = 0;
        let mut i = 0;
        while i + d.len() <= bytes.len() {
            if &bytes[i..i + d.len()] == d {
                pieces.push(Cell::String(ByteString::from_bytes(&bytes[start..i])));
                i += d.len();
                start = i;
            } else {
                i += 1;
            }
        }
        pieces.push(Cell::String(ByteString::from_bytes(&bytes[start..])));
    }
    exec.stack.push(Cell::new_array(pieces))
}

/// `string$trimCharacters(s, leading, trailing)`: strip any bytes found in
/// `leading` from the front and any found in `trailing` from the back.
pub(super) fn trim_characters(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let trailing = exec.stack.pop_string()?;
    let leading = exec.stack.pop_string()?;
    let s = exec.stack.pop_string()?;
    let bytes = s.as_bytes();
    let start = bytes
        .iter()
        .position(|b| !leading.as_bytes().contains(b))
        .unwrap_or(bytes.len());
    let end = bytes[start..]
        .iter()
        .rposition(|b| !trailing.as_bytes().contains(b))
        .map_or(start, |i| start + i + 1);
    exec.stack
        .push(Cell::String(ByteString::from_bytes(&bytes[start..end])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::test_module;
    use crate::config::ExecutorConfig;

    fn strings(values: &[&str]) -> Cell {
        Cell::new_array(values.iter().map(|s| Cell::from_string(*s)).collect())
    }

    #[test]
    fn split_on_delimiter() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_string("a,,b,").unwrap();
        vm.stack.push_string(",").unwrap();
        split(&mut vm).unwrap();
        assert_eq!(vm.stack.pop().unwrap(), strings(&["a", "", "b", ""]));

        vm.stack.push_string("abc").unwrap();
        vm.stack.push_string("").unwrap();
        split(&mut vm).unwrap();
        assert_eq!(vm.stack.pop().unwrap(), strings(&["abc"]));
    }

    #[test]
    fn find_and_case() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_string("hello").unwrap();
        vm.stack.push_string("ll").unwrap();
        find(&mut vm).unwrap();
        assert_eq!(vm.stack.pop_number().unwrap(), Number::from(2));

        vm.stack.push_string("hello").unwrap();
        vm.stack.push_string("z").unwrap();
        find(&mut vm).unwrap();
        assert_eq!(vm.stack.pop_number().unwrap(), Number::from(-1));

        vm.stack.push_string("MiXeD").unwrap();
        lower(&mut vm).unwrap();
        upper(&mut vm).unwrap();
        assert_eq!(vm.stack.pop_string().unwrap(), ByteString::from("MIXED"));
    }

    #[test]
    fn trim_each_side_separately() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_string("  xx hi xx  ").unwrap();
        vm.stack.push_string(" x").unwrap();
        vm.stack.push_string(" ").unwrap();
        trim_characters(&mut vm).unwrap();
        assert_eq!(vm.stack.pop_string().unwrap(), ByteString::from("hi xx"));

        vm.stack.push_string("   ").unwrap();
        vm.stack.push_string(" ").unwrap();
        vm.stack.push_string(" ").unwrap();
        trim_characters(&mut vm).unwrap();
        assert!(vm.stack.pop_string().unwrap().is_empty());
    }

    #[test]
    fn index_out_of_range_is_a_string_exception() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_string("ab").unwrap();
        vm.stack.push_number(Number::from(1)).unwrap();
        index(&mut vm).unwrap();
        assert_eq!(vm.stack.pop_string().unwrap(), ByteString::from("b"));

        vm.stack.push_string("ab").unwrap();
        vm.stack.push_number(Number::from(5)).unwrap();
        assert!(matches!(index(&mut vm), Err(VmError::Raise(e)) if e.name == "StringIndexException"));
    }
}
