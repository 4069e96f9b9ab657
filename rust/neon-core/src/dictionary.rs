//! String-keyed hash table with separate chaining.
//!
//! Buckets hold singly linked chains; new entries go to the head of their
//! chain. The bucket array is a power of two and doubles once the load factor
//! passes 3/4. Inserting an existing key leaves the stored value alone.

use std::fmt;

use crate::bytes::ByteString;
use crate::cell::Cell;

const INITIAL_BUCKETS: usize = 8;

#[derive(Clone)]
struct Entry {
    key: ByteString,
    value: Cell,
    next: Option<Box<Entry>>,
}

#[derive(Clone)]
pub struct Dictionary {
    buckets: Vec<Option<Box<Entry>>>,
    len: usize,
}

/// Polynomial rolling hash: `hash = byte + 31 * hash` over the key bytes.
fn hash_key(key: &[u8]) -> u64 {
    key.iter()
        .fold(0u64, |hash, &b| u64::from(b).wrapping_add(hash.wrapping_mul(31)))
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            buckets: vec![None; INITIAL_BUCKETS],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, key: &ByteString) -> usize {
        (hash_key(key.as_bytes()) as usize) & (self.buckets.len() - 1)
    }

    /// Position of `key` within its chain.
    fn depth_of(&self, key: &ByteString) -> Option<usize> {
        let mut link = self.buckets[self.slot(key)].as_deref();
        let mut depth = 0;
        while let Some(entry) = link {
            if entry.key == *key {
                return Some(depth);
            }
            depth += 1;
            link = entry.next.as_deref();
        }
        None
    }

    fn entry_mut(&mut self, key: &ByteString) -> Option<&mut Entry> {
        let depth = self.depth_of(key)?;
        let slot = self.slot(key);
        let mut link = self.buckets[slot].as_deref_mut();
        for _ in 0..depth {
            link = link?.next.as_deref_mut();
        }
        link
    }

    pub fn contains_key(&self, key: &ByteString) -> bool {
        self.depth_of(key).is_some()
    }

    pub fn lookup(&self, key: &ByteString) -> Option<&Cell> {
        let mut link = self.buckets[self.slot(key)].as_deref();
        while let Some(entry) = link {
            if entry.key == *key {
                return Some(&entry.value);
            }
            link = entry.next.as_deref();
        }
        None
    }

    pub fn lookup_mut(&mut self, key: &ByteString) -> Option<&mut Cell> {
        self.entry_mut(key).map(|entry| &mut entry.value)
    }

    /// Insert `value` under `key` unless the key is already present, and
    /// return the stored value either way.
    pub fn insert(&mut self, key: ByteString, value: Cell) -> &mut Cell {
        if !self.contains_key(&key) {
            if (self.len + 1) * 4 > self.buckets.len() * 3 {
                self.grow();
            }
            let slot = self.slot(&key);
            let next = self.buckets[slot].take();
            self.buckets[slot] = Some(Box::new(Entry {
                key: key.clone(),
                value,
                next,
            }));
            self.len += 1;
        }
        match self.entry_mut(&key) {
            Some(entry) => &mut entry.value,
            None => unreachable!("entry for key was just ensured"),
        }
    }

    pub fn remove(&mut self, key: &ByteString) -> Option<Cell> {
        let slot = self.slot(key);
        let mut chain = self.buckets[slot].take();
        let mut kept = Vec::new();
        let mut removed = None;
        while let Some(mut entry) = chain {
            chain = entry.next.take();
            if removed.is_none() && entry.key == *key {
                removed = Some(entry.value);
            } else {
                kept.push(entry);
            }
        }
        for mut entry in kept.into_iter().rev() {
            entry.next = self.buckets[slot].take();
            self.buckets[slot] = Some(entry);
        }
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn grow(&mut self) {
        let doubled = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, vec![None; doubled]);
        for mut chain in old {
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let slot = self.slot(&entry.key);
                entry.next = self.buckets[slot].take();
                self.buckets[slot] = Some(entry);
            }
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buckets: self.buckets.iter(),
            link: None,
        }
    }

    /// Keys in byte order.
    pub fn keys(&self) -> Vec<ByteString> {
        let mut keys: Vec<ByteString> = self.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        keys
    }

    /// Entries ordered by key.
    pub fn sorted(&self) -> Vec<(&ByteString, &Cell)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Dictionary::new()
    }
}

pub struct Iter<'a> {
    buckets: std::slice::Iter<'a, Option<Box<Entry>>>,
    link: Option<&'a Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a ByteString, &'a Cell);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.link {
                self.link = entry.next.as_deref();
                return Some((&entry.key, &entry.value));
            }
            self.link = self.buckets.next()?.as_deref();
        }
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .all(|(k, v)| other.lookup(k).is_some_and(|w| w == v))
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.sorted().into_iter().map(|(k, v)| (k.to_string(), v)))
            .finish()
    }
}
