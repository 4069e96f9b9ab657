//! Non-owning references to cells.
//!
//! An `Address` names a storage root (a global slot, a local slot in a given
//! frame, or a predefined global) plus a path of array indices and dictionary
//! keys below it. It owns nothing; it is resolved against a `CellStore` each
//! time it is used, so a stale address fails cleanly instead of aliasing freed
//! storage.

use std::fmt;

use crate::bytes::ByteString;
use crate::cell::Cell;
use crate::error::CellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Root {
    Global(usize),
    /// `serial` identifies the frame instance, so a frame pushed later at
    /// the same depth does not satisfy an old address.
    Local { frame: usize, serial: u64, slot: usize },
    Predefined(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Index(usize),
    Key(ByteString),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    root: Root,
    path: Vec<Step>,
}

/// Storage that addresses are resolved against.
pub trait CellStore {
    fn root(&self, root: Root) -> Option<&Cell>;
    fn root_mut(&mut self, root: Root) -> Option<&mut Cell>;
}

impl Address {
    pub fn new(root: Root) -> Self {
        Address {
            root,
            path: Vec::new(),
        }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn path(&self) -> &[Step] {
        &self.path
    }

    /// Address of element `index` of the array at this address.
    pub fn index(&self, index: usize) -> Address {
        let mut path = self.path.clone();
        path.push(Step::Index(index));
        Address {
            root: self.root,
            path,
        }
    }

    /// Address of entry `key` of the dictionary at this address.
    pub fn key(&self, key: ByteString) -> Address {
        let mut path = self.path.clone();
        path.push(Step::Key(key));
        Address {
            root: self.root,
            path,
        }
    }

    fn dangling(&self) -> CellError {
        CellError::DanglingAddress(self.to_string())
    }

    pub fn resolve<'s, S: CellStore + ?Sized>(&self, store: &'s S) -> Result<&'s Cell, CellError> {
        let mut cell = store.root(self.root).ok_or_else(|| self.dangling())?;
        for step in &self.path {
            cell = match (step, cell) {
                (Step::Index(i), Cell::Array(items)) => items.get(*i),
                (Step::Key(k), Cell::Dictionary(dict)) => dict.lookup(k),
                _ => None,
            }
            .ok_or_else(|| self.dangling())?;
        }
        Ok(cell)
    }

    pub fn resolve_mut<'s, S: CellStore + ?Sized>(
        &self,
        store: &'s mut S,
    ) -> Result<&'s mut Cell, CellError> {
        let dangling = self.dangling();
        let mut cell = store.root_mut(self.root).ok_or_else(|| dangling.clone())?;
        for step in &self.path {
            cell = match (step, cell) {
                (Step::Index(i), Cell::Array(items)) => items.get_mut(*i),
                (Step::Key(k), Cell::Dictionary(dict)) => dict.lookup_mut(k),
                _ => None,
            }
            .ok_or_else(|| dangling.clone())?;
        }
        Ok(cell)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Root::Global(slot) => write!(f, "global[{}]", slot)?,
            Root::Local { frame, slot, .. } => write!(f, "frame[{}].local[{}]", frame, slot)?,
            Root::Predefined(slot) => write!(f, "predefined[{}]", slot)?,
        }
        for step in &self.path {
            match step {
                Step::Index(i) => write!(f, "[{}]", i)?,
                Step::Key(k) => write!(f, "[{}]", k.quoted())?,
            }
        }
        Ok(())
    }
}
