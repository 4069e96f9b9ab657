//! Operand stack and return-address call stack.

use neon_core::{Address, ByteString, Cell, Number};

use crate::error::VmError;

/// Bounded LIFO of cells used while evaluating instructions.
#[derive(Debug)]
pub struct OperandStack {
    items: Vec<Cell>,
    capacity: usize,
    max_height: usize,
}

impl OperandStack {
    pub fn new(capacity: usize) -> Self {
        OperandStack {
            items: Vec::with_capacity(capacity),
            capacity,
            max_height: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Highest height reached so far.
    pub fn max_height(&self) -> usize {
        self.max_height
    }

    pub fn push(&mut self, cell: Cell) -> Result<(), VmError> {
        if self.items.len() >= self.capacity {
            return Err(VmError::StackOverflow(self.capacity));
        }
        self.items.push(cell);
        self.max_height = self.max_height.max(self.items.len());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell, VmError> {
        self.items.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn peek(&self) -> Result<&Cell, VmError> {
        self.items.last().ok_or(VmError::StackUnderflow)
    }

    /// The element `depth` below the top (0 is the top).
    pub fn peek_at(&self, depth: usize) -> Result<&Cell, VmError> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .map(|i| &self.items[i])
            .ok_or(VmError::StackUnderflow)
    }

    /// Remove the element `depth` below the top.
    pub fn remove_at(&mut self, depth: usize) -> Result<Cell, VmError> {
        let i = self
            .items
            .len()
            .checked_sub(depth + 1)
            .ok_or(VmError::StackUnderflow)?;
        Ok(self.items.remove(i))
    }

    /// Pop `n` cells, returned in the order they were pushed.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Cell>, VmError> {
        let start = self
            .items
            .len()
            .checked_sub(n)
            .ok_or(VmError::StackUnderflow)?;
        Ok(self.items.split_off(start))
    }

    pub fn pop_bool(&mut self) -> Result<bool, VmError> {
        Ok(self.pop()?.as_bool()?)
    }

    pub fn pop_number(&mut self) -> Result<Number, VmError> {
        Ok(self.pop()?.into_number()?)
    }

    pub fn pop_string(&mut self) -> Result<ByteString, VmError> {
        Ok(self.pop()?.into_string()?)
    }

    pub fn pop_array(&mut self) -> Result<Vec<Cell>, VmError> {
        Ok(self.pop()?.into_array()?)
    }

    pub fn pop_address(&mut self) -> Result<Address, VmError> {
        Ok(self.pop()?.into_address()?)
    }

    pub fn push_bool(&mut self, b: bool) -> Result<(), VmError> {
        self.push(Cell::Boolean(b))
    }

    pub fn push_number(&mut self, n: Number) -> Result<(), VmError> {
        self.push(Cell::Number(n))
    }

    pub fn push_string(&mut self, s: impl Into<ByteString>) -> Result<(), VmError> {
        self.push(Cell::String(s.into()))
    }
}

/// Where a `CALLF` came from: the address to resume at and the number of
/// frames live at the call, so unwinding can drop the callee's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub return_ip: usize,
    pub frame_depth: usize,
}

/// Fixed-depth return-address stack.
#[derive(Debug)]
pub struct CallStack {
    records: Vec<CallRecord>,
    capacity: usize,
    max_depth: usize,
}

impl CallStack {
    pub fn new(capacity: usize) -> Self {
        CallStack {
            records: Vec::with_capacity(capacity),
            capacity,
            max_depth: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn push(&mut self, record: CallRecord) -> Result<(), VmError> {
        if self.records.len() >= self.capacity {
            return Err(VmError::CallStackOverflow(self.capacity));
        }
        self.records.push(record);
        self.max_depth = self.max_depth.max(self.records.len());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<CallRecord, VmError> {
        self.records.pop().ok_or(VmError::CallStackUnderflow)
    }

    pub fn get(&self, index: usize) -> Option<CallRecord> {
        self.records.get(index).copied()
    }

    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }
}
