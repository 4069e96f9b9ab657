use std::fmt;

use neon_core::{CellError, Number};
use thiserror::Error;

use crate::bytecode::DecodeError;
use crate::opcode::OpCode;

/// A language-level exception on its way to a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct NeonException {
    pub name: String,
    pub info: String,
    pub code: Number,
}

impl NeonException {
    pub fn new(name: impl Into<String>, info: impl Into<String>) -> Self {
        NeonException {
            name: name.into(),
            info: info.into(),
            code: Number::zero(),
        }
    }

    /// True when a handler for `handler` catches this exception: an exact
    /// match, or `handler` is a dotted prefix (`Foo` catches `Foo.Bar`).
    pub fn is_handled_by(&self, handler: &str) -> bool {
        self.name == handler
            || (self.name.len() > handler.len()
                && self.name.starts_with(handler)
                && self.name.as_bytes()[handler.len()] == b'.')
    }
}

impl fmt::Display for NeonException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.info.is_empty() {
            write!(f, " ({})", self.info)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum VmError {
    #[error("bytecode: {0}")]
    Decode(#[from] DecodeError),
    #[error("operand stack overflow: capacity {0}")]
    StackOverflow(usize),
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("frame stack overflow: depth {0}")]
    FrameStackOverflow(usize),
    #[error("frame stack underflow")]
    FrameStackUnderflow,
    #[error("call stack overflow: depth {0}")]
    CallStackOverflow(usize),
    #[error("return with empty call stack")]
    CallStackUnderflow,
    #[error("allocation of {requested} cells exceeds the limit of {limit}")]
    AllocationLimit { requested: usize, limit: usize },
    #[error("unknown opcode {opcode} at {ip}")]
    UnknownOpcode { opcode: u8, ip: usize },
    #[error("unsupported opcode {opcode} at {ip}")]
    UnsupportedOpcode { opcode: OpCode, ip: usize },
    #[error("truncated operand for {opcode} at {ip}")]
    TruncatedOperand { opcode: OpCode, ip: usize },
    #[error("string table index {0} out of range")]
    InvalidStringIndex(usize),
    #[error("global slot {0} out of range")]
    InvalidGlobal(usize),
    #[error("local slot {slot} out of range (frame has {size})")]
    InvalidLocal { slot: usize, size: usize },
    #[error("no frame {0} levels out")]
    NoFrame(usize),
    #[error("unknown predefined variable {0:?}")]
    UnknownPredefined(String),
    #[error("invalid or unsupported predefined function call {0:?}")]
    UnknownFunction(String),
    #[error("type error at runtime: {0}")]
    TypeError(String),
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error("unhandled exception {0}")]
    UnhandledException(NeonException),
    #[error("exception {0}")]
    Raise(NeonException),
    #[error("exit({0})")]
    Exit(i32),
}

impl VmError {
    pub fn raise(name: &str, info: impl Into<String>) -> Self {
        VmError::Raise(NeonException::new(name, info))
    }

    /// Everything except a catchable raise or a requested exit.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VmError::Raise(_) | VmError::Exit(_))
    }

    pub fn is_stack_discipline(&self) -> bool {
        matches!(
            self,
            VmError::StackOverflow(_)
                | VmError::StackUnderflow
                | VmError::FrameStackOverflow(_)
                | VmError::FrameStackUnderflow
                | VmError::CallStackOverflow(_)
                | VmError::CallStackUnderflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_prefix_handles_subexceptions() {
        let e = NeonException::new("IoException.FileNotFound", "x");
        assert!(e.is_handled_by("IoException"));
        assert!(e.is_handled_by("IoException.FileNotFound"));
        assert!(!e.is_handled_by("IoExc"));
        assert!(!e.is_handled_by("Io"));
        assert!(!NeonException::new("Io", "").is_handled_by("IoException"));
    }

    #[test]
    fn classification() {
        assert!(VmError::StackUnderflow.is_fatal());
        assert!(VmError::StackUnderflow.is_stack_discipline());
        assert!(!VmError::raise("DivideByZeroException", "").is_fatal());
        assert!(!VmError::Exit(3).is_fatal());
        assert_eq!(
            VmError::UnknownFunction("nope".into()).to_string(),
            "invalid or unsupported predefined function call \"nope\""
        );
    }
}
