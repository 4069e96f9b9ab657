//! Neon VM: bytecode decoding and the stack-machine executor.

pub mod bytecode;
pub mod config;
pub mod error;
pub mod exec;
pub mod framestack;
pub mod global;
pub mod opcode;
pub mod stack;

pub use bytecode::{Bytecode, DecodeError};
pub use config::ExecutorConfig;
pub use error::{NeonException, VmError};
pub use exec::{Diagnostics, Executor, RunOutcome};
pub use opcode::OpCode;
