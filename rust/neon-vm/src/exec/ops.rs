//! Typed instruction families: load/store, arithmetic, comparison, indexing.

use std::cmp::Ordering;

use neon_core::{Address, Cell, Dictionary, Number};

use super::Executor;
use crate::error::VmError;

/// Operand type an instruction family works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Boolean,
    Number,
    String,
    Array,
    Dictionary,
    Pointer,
}

impl Kind {
    /// Value read through an address whose referent was never assigned.
    fn default_cell(self) -> Cell {
        match self {
            Kind::Boolean => Cell::Boolean(false),
            Kind::Number => Cell::Number(Number::zero()),
            Kind::String => Cell::from_string(""),
            Kind::Array => Cell::new_array(Vec::new()),
            Kind::Dictionary => Cell::new_dictionary(),
            Kind::Pointer => Cell::Nothing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Relation {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Relation::Eq => ord == Ordering::Equal,
            Relation::Ne => ord != Ordering::Equal,
            Relation::Lt => ord == Ordering::Less,
            Relation::Gt => ord == Ordering::Greater,
            Relation::Le => ord != Ordering::Greater,
            Relation::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Convert an index operand, raising `exception` when it is not a valid
/// non-negative integer.
pub(crate) fn index_of(index: &Number, exception: &str) -> Result<usize, VmError> {
    if !index.is_integer() || index.is_negative() {
        return Err(VmError::raise(exception, index.to_string()));
    }
    index
        .to_usize()
        .map_err(|_| VmError::raise(exception, index.to_string()))
}

fn equality(equal: bool) -> Ordering {
    if equal {
        Ordering::Equal
    } else {
        Ordering::Less
    }
}

impl<'a> Executor<'a> {
    pub(super) fn load(&mut self, kind: Kind) -> Result<(), VmError> {
        let addr = self.stack.pop_address()?;
        let value = match self.referent(&addr)? {
            Cell::Nothing => kind.default_cell(),
            cell => cell.clone(),
        };
        self.stack.push(value)
    }

    pub(super) fn store(&mut self) -> Result<(), VmError> {
        let addr = self.stack.pop_address()?;
        let value = self.stack.pop()?;
        *self.referent_mut(&addr)? = value;
        Ok(())
    }

    pub(super) fn arith(&mut self, op: ArithOp) -> Result<(), VmError> {
        let b = self.stack.pop_number()?;
        let a = self.stack.pop_number()?;
        let divide_by_zero = || VmError::raise("DivideByZeroException", "");
        let result = match op {
            ArithOp::Add => &a + &b,
            ArithOp::Sub => &a - &b,
            ArithOp::Mul => &a * &b,
            ArithOp::Div => a.checked_div(&b).ok_or_else(divide_by_zero)?,
            ArithOp::Mod => a.checked_rem(&b).ok_or_else(divide_by_zero)?,
            ArithOp::Pow => match a.checked_pow(&b) {
                Some(n) => n,
                None if a.is_zero() => return Err(divide_by_zero()),
                None => {
                    return Err(VmError::raise(
                        "ValueRangeException",
                        format!("{} ^ {}", a, b),
                    ))
                }
            },
        };
        self.stack.push_number(result)
    }

    pub(super) fn compare(&mut self, kind: Kind, rel: Relation) -> Result<(), VmError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let ord = match kind {
            Kind::Boolean => a.as_bool()?.cmp(&b.as_bool()?),
            Kind::Number => a.as_number()?.cmp(b.as_number()?),
            Kind::String => a.as_string()?.cmp(b.as_string()?),
            Kind::Array => equality(a.as_array()? == b.as_array()?),
            Kind::Dictionary => {
                let empty = Dictionary::new();
                let x = match &a {
                    Cell::Nothing => &empty,
                    cell => cell.as_dictionary()?,
                };
                let y = match &b {
                    Cell::Nothing => &empty,
                    cell => cell.as_dictionary()?,
                };
                equality(x == y)
            }
            Kind::Pointer => equality(a == b),
        };
        self.stack.push_bool(rel.holds(ord))
    }

    /// INDEXAR / INDEXAW: push the address of an array element.
    pub(super) fn index_array_address(&mut self, for_write: bool) -> Result<(), VmError> {
        let index = self.stack.pop_number()?;
        let addr = self.stack.pop_address()?;
        let i = index_of(&index, "ArrayIndexException")?;
        if for_write {
            self.check_alloc(i.saturating_add(1))?;
            self.referent_mut(&addr)?.array_index_for_write(i)?;
        } else if i >= self.referent(&addr)?.as_array()?.len() {
            return Err(VmError::raise("ArrayIndexException", index.to_string()));
        }
        self.stack.push(Cell::from_address(addr.index(i)))
    }

    /// INDEXAV / INDEXAN: replace an array value with one of its elements.
    pub(super) fn index_array_value(&mut self, strict: bool) -> Result<(), VmError> {
        let index = self.stack.pop_number()?;
        let mut items = self.stack.pop_array()?;
        let i = index_of(&index, "ArrayIndexException")?;
        let value = if i < items.len() {
            items.swap_remove(i)
        } else if strict {
            return Err(VmError::raise("ArrayIndexException", index.to_string()));
        } else {
            Cell::Nothing
        };
        self.stack.push(value)
    }

    /// INDEXDR / INDEXDW: push the address of a dictionary entry.
    pub(super) fn index_dictionary_address(&mut self, for_write: bool) -> Result<(), VmError> {
        let key = self.stack.pop_string()?;
        let addr: Address = self.stack.pop_address()?;
        if for_write {
            self.referent_mut(&addr)?
                .dictionary_index_for_write(key.clone())?;
        } else {
            let present = match self.referent(&addr)? {
                Cell::Nothing => false,
                cell => cell.as_dictionary()?.contains_key(&key),
            };
            if !present {
                return Err(VmError::raise(
                    "DictionaryIndexException",
                    key.to_string_lossy(),
                ));
            }
        }
        self.stack.push(Cell::from_address(addr.key(key)))
    }

    pub(super) fn index_dictionary_value(&mut self) -> Result<(), VmError> {
        let key = self.stack.pop_string()?;
        let value = match self.stack.pop()? {
            Cell::Dictionary(mut dict) => dict.remove(&key),
            Cell::Nothing => None,
            other => {
                return Err(VmError::TypeError(format!(
                    "INDEXDV needs a dictionary, found {}",
                    other.type_name()
                )))
            }
        };
        match value {
            Some(v) => self.stack.push(v),
            None => Err(VmError::raise(
                "DictionaryIndexException",
                key.to_string_lossy(),
            )),
        }
    }
}
