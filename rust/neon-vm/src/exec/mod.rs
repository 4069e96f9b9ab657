//! The executor: fetch, decode and dispatch over a decoded module.

mod ops;

use std::time::{Duration, Instant};

use neon_core::{Address, ByteString, Cell, CellStore, Dictionary, Number, Root};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::bytecode::Bytecode;
use crate::config::ExecutorConfig;
use crate::error::{NeonException, VmError};
use crate::framestack::{Frame, FrameStack};
use crate::global;
use crate::opcode::OpCode;
use crate::stack::{CallRecord, CallStack, OperandStack};

pub(crate) use ops::index_of;
use ops::{ArithOp, Kind, Relation};

/// Predefined globals, resolved by name through `PUSHPPG`.
pub const PREDEFINED_ARGS: &str = "sys$args";

/// Everything addresses can point into.
#[derive(Debug)]
pub struct Storage {
    pub globals: Vec<Cell>,
    pub frames: FrameStack,
    pub predefined: Vec<(String, Cell)>,
}

impl CellStore for Storage {
    fn root(&self, root: Root) -> Option<&Cell> {
        match root {
            Root::Global(slot) => self.globals.get(slot),
            Root::Local { frame, serial, slot } => self
                .frames
                .get(frame)
                .filter(|f| f.serial() == serial)?
                .local(slot),
            Root::Predefined(slot) => self.predefined.get(slot).map(|(_, cell)| cell),
        }
    }

    fn root_mut(&mut self, root: Root) -> Option<&mut Cell> {
        match root {
            Root::Global(slot) => self.globals.get_mut(slot),
            Root::Local { frame, serial, slot } => self
                .frames
                .get_mut(frame)
                .filter(|f| f.serial() == serial)?
                .local_mut(slot),
            Root::Predefined(slot) => self.predefined.get_mut(slot).map(|(_, cell)| cell),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The instruction pointer ran off the end of the code.
    Completed,
    /// `sys$exit` was called.
    Exit(i32),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub opcodes: u64,
    pub max_stack: usize,
    pub max_call_depth: usize,
    pub elapsed: Duration,
}

pub struct Executor<'a> {
    object: &'a Bytecode,
    ip: usize,
    /// Start of the instruction being executed.
    current: usize,
    pub(crate) stack: OperandStack,
    callstack: CallStack,
    pub(crate) storage: Storage,
    config: ExecutorConfig,
    opcodes: u64,
    elapsed: Duration,
    output: Vec<String>,
}

impl<'a> Executor<'a> {
    pub fn new(object: &'a Bytecode, config: ExecutorConfig) -> Self {
        let storage = Storage {
            globals: vec![Cell::Nothing; usize::from(object.global_size)],
            frames: FrameStack::new(config.frame_depth),
            predefined: vec![(PREDEFINED_ARGS.to_string(), Cell::new_array(Vec::new()))],
        };
        Executor {
            object,
            ip: 0,
            current: 0,
            stack: OperandStack::new(config.stack_capacity),
            callstack: CallStack::new(config.call_depth),
            storage,
            config,
            opcodes: 0,
            elapsed: Duration::ZERO,
            output: Vec::new(),
        }
    }

    /// Program arguments, visible to Neon code as `sys$args`.
    pub fn set_args(&mut self, args: Vec<String>) {
        let args = args.into_iter().map(Cell::from_string).collect();
        if let Some((_, cell)) = self
            .storage
            .predefined
            .iter_mut()
            .find(|(name, _)| name == PREDEFINED_ARGS)
        {
            *cell = Cell::new_array(args);
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn globals(&self) -> &[Cell] {
        &self.storage.globals
    }

    /// Lines written by `print`, in order.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            opcodes: self.opcodes,
            max_stack: self.stack.max_height(),
            max_call_depth: self.callstack.max_depth(),
            elapsed: self.elapsed,
        }
    }

    /// Run until the code is exhausted, `sys$exit` is called, or a fatal
    /// error or unhandled exception stops execution.
    pub fn run(&mut self) -> Result<RunOutcome, VmError> {
        let start = Instant::now();
        // A stray top-level RET lands on the end of the code and halts.
        self.callstack.push(CallRecord {
            return_ip: self.object.code.len(),
            frame_depth: 0,
        })?;
        let result = self.run_loop();
        self.elapsed = start.elapsed();
        debug!(
            opcodes = self.opcodes,
            elapsed_us = self.elapsed.as_micros() as u64,
            "run finished"
        );
        match result {
            Ok(()) => Ok(RunOutcome::Completed),
            Err(VmError::Exit(code)) => Ok(RunOutcome::Exit(code)),
            Err(e) => Err(e),
        }
    }

    fn run_loop(&mut self) -> Result<(), VmError> {
        while self.ip < self.object.code.len() {
            match self.step() {
                Ok(()) => {}
                Err(VmError::Raise(exception)) => self.dispatch_exception(exception)?,
                Err(e) => return Err(e),
            }
            self.opcodes += 1;
        }
        Ok(())
    }

    /// Execute the single instruction at `ip`.
    pub fn step(&mut self) -> Result<(), VmError> {
        let ip = self.ip;
        self.current = ip;
        let code = &self.object.code;
        let byte = *code.get(ip).ok_or(VmError::UnknownOpcode { opcode: 0, ip })?;
        let op = OpCode::try_from(byte).map_err(|opcode| VmError::UnknownOpcode { opcode, ip })?;
        if op.is_unsupported() {
            return Err(VmError::UnsupportedOpcode { opcode: op, ip });
        }
        let len = op.operand_len();
        let bytes = code
            .get(ip + 1..ip + 1 + len)
            .ok_or(VmError::TruncatedOperand { opcode: op, ip })?;
        let be = |b: &[u8]| u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        let (a, b) = match len {
            1 => (u32::from(bytes[0]), 0),
            4 => (be(&bytes[0..4]), 0),
            8 => (be(&bytes[0..4]), be(&bytes[4..8])),
            _ => (0, 0),
        };
        trace!(ip, op = %op, a, depth = self.stack.len(), "exec");
        self.ip = ip + 1 + len;
        self.execute(op, a, b)
    }

    fn execute(&mut self, op: OpCode, a: u32, b: u32) -> Result<(), VmError> {
        use OpCode::*;
        match op {
            Enter => {
                let locals = b as usize;
                self.check_alloc(locals)?;
                self.storage.frames.push(a as usize, Frame::new(locals))?;
                debug!(nest = a, locals = b, depth = self.storage.frames.len(), "enter frame");
            }
            Leave => {
                self.storage.frames.pop()?;
                debug!(depth = self.storage.frames.len(), "leave frame");
            }
            PushB => self.stack.push_bool(a != 0)?,
            PushN => {
                let literal = self.string_at(a)?;
                let n = Number::parse(&literal.to_string_lossy())?;
                self.stack.push_number(n)?;
            }
            PushS => {
                let s = self.string_at(a)?.clone();
                self.stack.push(Cell::String(s))?;
            }
            PushPG => {
                let slot = a as usize;
                if slot >= self.storage.globals.len() {
                    return Err(VmError::InvalidGlobal(slot));
                }
                self.stack
                    .push(Cell::from_address(Address::new(Root::Global(slot))))?;
            }
            PushPPG => {
                let name = self.string_at(a)?;
                let slot = self
                    .storage
                    .predefined
                    .iter()
                    .position(|(n, _)| n.as_bytes() == name.as_bytes())
                    .ok_or_else(|| VmError::UnknownPredefined(name.to_string()))?;
                self.stack
                    .push(Cell::from_address(Address::new(Root::Predefined(slot))))?;
            }
            PushPL => self.push_local(0, a as usize)?,
            PushPOL => self.push_local(a as usize, b as usize)?,
            PushI => self.stack.push_number(Number::from(a as i32))?,
            LoadB => self.load(Kind::Boolean)?,
            LoadN => self.load(Kind::Number)?,
            LoadS => self.load(Kind::String)?,
            LoadA => self.load(Kind::Array)?,
            LoadD => self.load(Kind::Dictionary)?,
            LoadP => self.load(Kind::Pointer)?,
            StoreB | StoreN | StoreS | StoreA | StoreD | StoreP => self.store()?,
            NegN => {
                let n = self.stack.pop_number()?;
                self.stack.push_number(-&n)?;
            }
            AddN => self.arith(ArithOp::Add)?,
            SubN => self.arith(ArithOp::Sub)?,
            MulN => self.arith(ArithOp::Mul)?,
            DivN => self.arith(ArithOp::Div)?,
            ModN => self.arith(ArithOp::Mod)?,
            ExpN => self.arith(ArithOp::Pow)?,
            EqB => self.compare(Kind::Boolean, Relation::Eq)?,
            NeB => self.compare(Kind::Boolean, Relation::Ne)?,
            EqN => self.compare(Kind::Number, Relation::Eq)?,
            NeN => self.compare(Kind::Number, Relation::Ne)?,
            LtN => self.compare(Kind::Number, Relation::Lt)?,
            GtN => self.compare(Kind::Number, Relation::Gt)?,
            LeN => self.compare(Kind::Number, Relation::Le)?,
            GeN => self.compare(Kind::Number, Relation::Ge)?,
            EqS => self.compare(Kind::String, Relation::Eq)?,
            NeS => self.compare(Kind::String, Relation::Ne)?,
            LtS => self.compare(Kind::String, Relation::Lt)?,
            GtS => self.compare(Kind::String, Relation::Gt)?,
            LeS => self.compare(Kind::String, Relation::Le)?,
            GeS => self.compare(Kind::String, Relation::Ge)?,
            EqA => self.compare(Kind::Array, Relation::Eq)?,
            NeA => self.compare(Kind::Array, Relation::Ne)?,
            EqD => self.compare(Kind::Dictionary, Relation::Eq)?,
            NeD => self.compare(Kind::Dictionary, Relation::Ne)?,
            EqP => self.compare(Kind::Pointer, Relation::Eq)?,
            NeP => self.compare(Kind::Pointer, Relation::Ne)?,
            AndB => {
                let y = self.stack.pop_bool()?;
                let x = self.stack.pop_bool()?;
                self.stack.push_bool(x && y)?;
            }
            OrB => {
                let y = self.stack.pop_bool()?;
                let x = self.stack.pop_bool()?;
                self.stack.push_bool(x || y)?;
            }
            NotB => {
                let x = self.stack.pop_bool()?;
                self.stack.push_bool(!x)?;
            }
            IndexAR => self.index_array_address(false)?,
            IndexAW => self.index_array_address(true)?,
            IndexAV => self.index_array_value(true)?,
            IndexAN => self.index_array_value(false)?,
            IndexDR => self.index_dictionary_address(false)?,
            IndexDW => self.index_dictionary_address(true)?,
            IndexDV => self.index_dictionary_value()?,
            InA => {
                let array = self.stack.pop_array()?;
                let value = self.stack.pop()?;
                self.stack.push_bool(array.contains(&value))?;
            }
            InD => {
                let dict = self.stack.pop()?;
                let key = self.stack.pop_string()?;
                let found = match &dict {
                    Cell::Nothing => false,
                    other => other.as_dictionary()?.contains_key(&key),
                };
                self.stack.push_bool(found)?;
            }
            CallP => self.call_predefined(a)?,
            CallF => self.call(a as usize)?,
            CallI => {
                let entry = match self.stack.pop()? {
                    Cell::Number(n) => n.to_usize()?,
                    Cell::Array(items) if items.len() == 2 => items[1].as_number()?.to_usize()?,
                    other => {
                        return Err(VmError::TypeError(format!(
                            "CALLI needs a function reference, found {}",
                            other.type_name()
                        )))
                    }
                };
                self.call(entry)?;
            }
            Jump => self.ip = a as usize,
            Jf => {
                if !self.stack.pop_bool()? {
                    self.ip = a as usize;
                }
            }
            Jt => {
                if self.stack.pop_bool()? {
                    self.ip = a as usize;
                }
            }
            JFChain => {
                let x = self.stack.pop()?;
                if !x.as_bool()? {
                    self.ip = a as usize;
                    self.stack.pop()?;
                    self.stack.push(x)?;
                }
            }
            Dup => {
                let top = self.stack.peek()?.clone();
                self.stack.push(top)?;
            }
            DupX1 => {
                let x = self.stack.pop()?;
                let y = self.stack.pop()?;
                self.stack.push(x.clone())?;
                self.stack.push(y)?;
                self.stack.push(x)?;
            }
            Drop => {
                self.stack.pop()?;
            }
            Ret => {
                let record = self.callstack.pop()?;
                debug!(to = record.return_ip, depth = self.callstack.len(), "return");
                self.ip = record.return_ip;
            }
            ConsA => {
                let items = self.stack.pop_n(a as usize)?;
                self.stack.push(Cell::new_array(items))?;
            }
            ConsD => {
                // Declaration order, so the first of two equal keys wins.
                let items = self.stack.pop_n(2 * a as usize)?;
                let mut dict = Dictionary::new();
                let mut pairs = items.into_iter();
                while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
                    dict.insert(key.into_string()?, value);
                }
                self.stack.push(Cell::Dictionary(dict))?;
            }
            Except => return Err(self.exception_from_stack(a)?),
            Alloc => {
                let size = a as usize;
                self.check_alloc(size)?;
                self.stack.push(Cell::new_array(vec![Cell::Nothing; size]))?;
            }
            PushNil => self.stack.push(Cell::Nothing)?,
            JNAssert => {
                if !self.config.enable_assert {
                    self.ip = a as usize;
                }
            }
            ResetC => {
                let addr = self.stack.pop_address()?;
                self.referent_mut(&addr)?.reset();
            }
            JumpTbl => {
                let n = a as usize;
                let k = self.stack.pop_number()?;
                let slot = match k.to_usize() {
                    Ok(i) if i < n => i,
                    _ => n,
                };
                self.ip += slot * (1 + OpCode::Jump.operand_len());
            }
            Swap => {
                let x = self.stack.pop()?;
                let y = self.stack.pop()?;
                self.stack.push(x)?;
                self.stack.push(y)?;
            }
            DropN => {
                self.stack.remove_at(a as usize)?;
            }
            PushPMG | CallMF | CallE | PushPEG | CallX | PushM | CallV | PushCI => {
                return Err(VmError::UnsupportedOpcode {
                    opcode: op,
                    ip: self.current,
                })
            }
        }
        Ok(())
    }

    fn string_at(&self, index: u32) -> Result<&'a ByteString, VmError> {
        let object: &'a Bytecode = self.object;
        object
            .string(index as usize)
            .ok_or(VmError::InvalidStringIndex(index as usize))
    }

    fn push_local(&mut self, back: usize, slot: usize) -> Result<(), VmError> {
        let frame = self
            .storage
            .frames
            .enclosing(back)
            .ok_or(VmError::NoFrame(back))?;
        let (size, serial) = self
            .storage
            .frames
            .get(frame)
            .map_or((0, 0), |f| (f.len(), f.serial()));
        if slot >= size {
            return Err(VmError::InvalidLocal { slot, size });
        }
        self.stack.push(Cell::from_address(Address::new(Root::Local {
            frame,
            serial,
            slot,
        })))
    }

    /// Refuse arrays and frames larger than the configured limit.
    pub(crate) fn check_alloc(&self, cells: usize) -> Result<(), VmError> {
        if cells > self.config.alloc_limit {
            return Err(VmError::AllocationLimit {
                requested: cells,
                limit: self.config.alloc_limit,
            });
        }
        Ok(())
    }

    pub(crate) fn referent(&self, addr: &Address) -> Result<&Cell, VmError> {
        Ok(addr.resolve(&self.storage)?)
    }

    pub(crate) fn referent_mut(&mut self, addr: &Address) -> Result<&mut Cell, VmError> {
        Ok(addr.resolve_mut(&mut self.storage)?)
    }

    /// Write one line of program output.
    pub(crate) fn emit(&mut self, line: String) {
        println!("{}", line);
        self.output.push(line);
    }

    fn call(&mut self, target: usize) -> Result<(), VmError> {
        self.callstack.push(CallRecord {
            return_ip: self.ip,
            frame_depth: self.storage.frames.len(),
        })?;
        debug!(from = self.current, to = target, depth = self.callstack.len(), "call");
        self.ip = target;
        Ok(())
    }

    fn call_predefined(&mut self, index: u32) -> Result<(), VmError> {
        let name = self.string_at(index)?.to_string_lossy();
        trace!(name = %name, "call predefined");
        global::call_function(&name, self).ok_or(VmError::UnknownFunction(name))?
    }

    /// Build the exception raised by `EXCEPT`: the name comes from the string
    /// table, the info from the stack (a string, or `[info, code]`).
    fn exception_from_stack(&mut self, name: u32) -> Result<VmError, VmError> {
        let name = self.string_at(name)?.to_string_lossy();
        let (info, code) = match self.stack.pop()? {
            Cell::String(s) => (s.to_string_lossy(), Number::zero()),
            Cell::Array(items) => {
                let info = match items.first() {
                    Some(cell) => cell.as_string()?.to_string_lossy(),
                    None => String::new(),
                };
                let code = match items.get(1) {
                    Some(cell) => cell.as_number()?.clone(),
                    None => Number::zero(),
                };
                (info, code)
            }
            Cell::Nothing => (String::new(), Number::zero()),
            other => {
                return Err(VmError::TypeError(format!(
                    "EXCEPT needs exception info, found {}",
                    other.type_name()
                )))
            }
        };
        Ok(VmError::Raise(NeonException { name, info, code }))
    }

    fn find_handler(&self, ip: usize, exception: &NeonException) -> Option<usize> {
        self.object
            .exceptions
            .iter()
            .filter(|e| e.covers(ip))
            .find(|e| {
                self.object
                    .string(usize::from(e.exid))
                    .is_some_and(|h| exception.is_handled_by(&h.to_string_lossy()))
            })
            .map(|e| usize::from(e.handler))
    }

    /// Transfer control to the innermost handler for `exception`, unwinding
    /// call levels (and their frames) until one covers the active address.
    fn dispatch_exception(&mut self, exception: NeonException) -> Result<(), VmError> {
        let raised_at = self.current;
        let mut tip = raised_at;
        let mut depth = self.callstack.len();
        let mut frame_depth = self.storage.frames.len();
        loop {
            if let Some(handler) = self.find_handler(tip, &exception) {
                debug!(
                    exception = %exception,
                    handler,
                    unwound = self.callstack.len() - depth,
                    "exception handled"
                );
                self.callstack.truncate(depth);
                self.storage.frames.truncate(frame_depth);
                self.ip = handler;
                let NeonException { name, info, code } = exception;
                return self.stack.push(Cell::new_array(vec![
                    Cell::from_string(name),
                    Cell::from_string(info),
                    Cell::Number(code),
                    Cell::Number(Number::from(raised_at)),
                ]));
            }
            // The bottom record is the sentinel pushed by `run`.
            if depth <= 1 {
                break;
            }
            depth -= 1;
            let record = self
                .callstack
                .get(depth)
                .ok_or(VmError::CallStackUnderflow)?;
            // Inside the CALLF that made this call.
            tip = record.return_ip.saturating_sub(1);
            frame_depth = record.frame_depth;
        }
        warn!(exception = %exception, ip = raised_at, "unhandled exception");
        Err(VmError::UnhandledException(exception))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::test_module;

    /// Append one instruction to `code`.
    fn op(code: &mut Vec<u8>, op: OpCode, operand: Option<u32>) {
        code.push(op as u8);
        if let Some(v) = operand {
            code.extend_from_slice(&v.to_be_bytes());
        }
    }

    #[test]
    fn single_steps_update_ip_and_stack() {
        let mut code = Vec::new();
        op(&mut code, OpCode::PushI, Some(7));
        op(&mut code, OpCode::Dup, None);
        op(&mut code, OpCode::AddN, None);
        let m = test_module(&[], 2, code);
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.step().unwrap();
        assert_eq!(vm.ip(), 5);
        vm.step().unwrap();
        vm.step().unwrap();
        assert_eq!(vm.ip(), 7);
        assert_eq!(vm.stack().peek().unwrap(), &Cell::from_number(Number::from(14)));
    }

    #[test]
    fn push_string_and_print() {
        let mut code = Vec::new();
        op(&mut code, OpCode::PushS, Some(0));
        op(&mut code, OpCode::CallP, Some(1));
        let m = test_module(&["hello", "print"], 2, code);
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        assert_eq!(vm.run().unwrap(), RunOutcome::Completed);
        assert_eq!(vm.output(), &["hello".to_string()]);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn unknown_and_unsupported_opcodes_are_fatal() {
        let m = test_module(&[], 2, vec![200]);
        let err = Executor::new(&m, ExecutorConfig::default()).run().unwrap_err();
        assert!(matches!(err, VmError::UnknownOpcode { opcode: 200, ip: 0 }));

        let m = test_module(&[], 2, vec![OpCode::CallX as u8]);
        let err = Executor::new(&m, ExecutorConfig::default()).run().unwrap_err();
        assert!(matches!(
            err,
            VmError::UnsupportedOpcode {
                opcode: OpCode::CallX,
                ..
            }
        ));
    }

    #[test]
    fn truncated_operand_is_fatal() {
        let m = test_module(&[], 2, vec![OpCode::PushI as u8, 0, 0]);
        let err = Executor::new(&m, ExecutorConfig::default()).run().unwrap_err();
        assert!(matches!(err, VmError::TruncatedOperand { ip: 0, .. }));
    }

    #[test]
    fn globals_store_and_load() {
        let mut code = Vec::new();
        op(&mut code, OpCode::PushI, Some(5));
        op(&mut code, OpCode::PushPG, Some(1));
        op(&mut code, OpCode::StoreN, None);
        op(&mut code, OpCode::PushPG, Some(1));
        op(&mut code, OpCode::LoadN, None);
        op(&mut code, OpCode::PushPG, Some(0));
        op(&mut code, OpCode::LoadS, None);
        let m = test_module(&[], 2, code);
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.run().unwrap();
        assert_eq!(vm.globals()[1], Cell::from_number(Number::from(5)));
        assert_eq!(vm.stack().peek().unwrap(), &Cell::from_string(""));
        assert_eq!(
            vm.stack().peek_at(1).unwrap(),
            &Cell::from_number(Number::from(5))
        );
    }

    #[test]
    fn invalid_global_is_fatal() {
        let mut code = Vec::new();
        op(&mut code, OpCode::PushPG, Some(2));
        let m = test_module(&[], 2, code);
        let err = Executor::new(&m, ExecutorConfig::default()).run().unwrap_err();
        assert!(matches!(err, VmError::InvalidGlobal(2)));
    }

    #[test]
    fn sys_args_are_predefined() {
        let mut code = Vec::new();
        op(&mut code, OpCode::PushPPG, Some(0));
        op(&mut code, OpCode::LoadA, None);
        let m = test_module(&["sys$args"], 2, code);
        let mut vm = Executor::new(&m, ExecutorConfig::default());
        vm.set_args(vec!["a".into(), "b".into()]);
        vm.run().unwrap();
        assert_eq!(
            vm.stack().peek().unwrap(),
            &Cell::new_array(vec![Cell::from_string("a"), Cell::from_string("b")])
        );
    }
}
