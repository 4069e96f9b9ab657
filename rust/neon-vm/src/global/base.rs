use neon_core::{Cell, Number};

use crate::error::VmError;
use crate::exec::Executor;

/// Strings print as their raw bytes; anything else prints its display form.
pub(super) fn print(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let line = match exec.stack.pop()? {
        Cell::String(s) => s.to_string_lossy(),
        other => other.to_string(),
    };
    exec.emit(line);
    Ok(())
}

pub(super) fn concat(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_string()?;
    let mut a = exec.stack.pop_string()?;
    a.append(&b);
    exec.stack.push(Cell::String(a))
}

pub(super) fn str(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let n = exec.stack.pop_number()?;
    exec.stack.push_string(n.to_string())
}

pub(super) fn strb(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let b = exec.stack.pop_bool()?;
    exec.stack.push_string(if b { "TRUE" } else { "FALSE" })
}

pub(super) fn num(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let s = exec.stack.pop_string()?.to_string_lossy();
    let n = Number::parse(s.trim())
        .map_err(|_| VmError::raise("ValueRangeException", format!("num() argument not a number: {}", s)))?;
    exec.stack.push_number(n)
}

/// `sys$exit(n)`: ends the run with status `n`.
pub(super) fn exit(exec: &mut Executor<'_>) -> Result<(), VmError> {
    let n = exec.stack.pop_number()?;
    let code = if n.is_integer() { n.to_i64().ok() } else { None };
    match code {
        Some(code @ 0..=255) => Err(VmError::Exit(code as i32)),
        _ => Err(VmError::raise(
            "InvalidValueException",
            format!("sys.exit invalid parameter value: {}", n),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::test_module;
    use crate::config::ExecutorConfig;

    #[test]
    fn print_records_output() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_string("hi").unwrap();
        print(&mut vm).unwrap();
        vm.stack.push_number(Number::from(3)).unwrap();
        print(&mut vm).unwrap();
        assert_eq!(vm.output(), &["hi".to_string(), "3".to_string()]);
    }

    #[test]
    fn conversions() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_string(" 12.50 ").unwrap();
        num(&mut vm).unwrap();
        str(&mut vm).unwrap();
        assert_eq!(vm.stack.pop_string().unwrap().to_string_lossy(), "12.5");

        vm.stack.push_string("twelve").unwrap();
        match num(&mut vm).unwrap_err() {
            VmError::Raise(e) => assert_eq!(e.name, "ValueRangeException"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn exit_codes() {
        let m = test_module(&[], 0, Vec::new());
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.stack.push_number(Number::from(3)).unwrap();
        assert!(matches!(exit(&mut vm), Err(VmError::Exit(3))));
        vm.stack.push_number(Number::from(256)).unwrap();
        assert!(matches!(exit(&mut vm), Err(VmError::Raise(e)) if e.name == "InvalidValueException"));
    }
}
