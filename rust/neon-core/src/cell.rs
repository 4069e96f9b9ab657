//! The tagged runtime value.

use std::cmp::Ordering;
use std::fmt;

use crate::address::Address;
use crate::bytes::ByteString;
use crate::dictionary::Dictionary;
use crate::error::CellError;
use crate::number::Number;

static EMPTY_STRING: ByteString = ByteString::new();

/// A Neon runtime value.
///
/// Reassigning a `Cell` drops whatever the old variant owned. `Clone` is a deep
/// copy for arrays, dictionaries and strings; cloning an `Address` copies the
/// reference only.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Nothing,
    Address(Address),
    Array(Vec<Cell>),
    Boolean(bool),
    Dictionary(Dictionary),
    Number(Number),
    String(ByteString),
}

impl Cell {
    pub fn new() -> Self {
        Cell::Nothing
    }

    pub fn from_number(n: Number) -> Self {
        Cell::Number(n)
    }

    pub fn from_string(s: impl Into<ByteString>) -> Self {
        Cell::String(s.into())
    }

    pub fn from_bool(b: bool) -> Self {
        Cell::Boolean(b)
    }

    /// Deep copy of `other`.
    pub fn from_cell(other: &Cell) -> Self {
        other.clone()
    }

    /// A reference to the cell at `address`; the referent is not copied.
    pub fn from_address(address: Address) -> Self {
        Cell::Address(address)
    }

    pub fn new_array(items: Vec<Cell>) -> Self {
        Cell::Array(items)
    }

    pub fn new_dictionary() -> Self {
        Cell::Dictionary(Dictionary::new())
    }

    /// Drop the payload and go back to `Nothing`.
    pub fn reset(&mut self) {
        *self = Cell::Nothing;
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Nothing => "nothing",
            Cell::Address(_) => "address",
            Cell::Array(_) => "array",
            Cell::Boolean(_) => "boolean",
            Cell::Dictionary(_) => "dictionary",
            Cell::Number(_) => "number",
            Cell::String(_) => "string",
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Cell::Nothing)
    }

    pub fn as_bool(&self) -> Result<bool, CellError> {
        match self {
            Cell::Boolean(b) => Ok(*b),
            other => Err(CellError::mismatch("boolean", other.type_name())),
        }
    }

    pub fn as_number(&self) -> Result<&Number, CellError> {
        match self {
            Cell::Number(n) => Ok(n),
            other => Err(CellError::mismatch("number", other.type_name())),
        }
    }

    /// Strings read from a never-assigned cell are empty.
    pub fn as_string(&self) -> Result<&ByteString, CellError> {
        match self {
            Cell::String(s) => Ok(s),
            Cell::Nothing => Ok(&EMPTY_STRING),
            other => Err(CellError::mismatch("string", other.type_name())),
        }
    }

    /// Arrays read from a never-assigned cell are empty.
    pub fn as_array(&self) -> Result<&[Cell], CellError> {
        match self {
            Cell::Array(items) => Ok(items),
            Cell::Nothing => Ok(&[]),
            other => Err(CellError::mismatch("array", other.type_name())),
        }
    }

    pub fn as_dictionary(&self) -> Result<&Dictionary, CellError> {
        match self {
            Cell::Dictionary(d) => Ok(d),
            other => Err(CellError::mismatch("dictionary", other.type_name())),
        }
    }

    pub fn as_address(&self) -> Result<&Address, CellError> {
        match self {
            Cell::Address(a) => Ok(a),
            other => Err(CellError::mismatch("address", other.type_name())),
        }
    }

    /// The string payload for in-place mutation; `Nothing` becomes `""`.
    pub fn string_for_write(&mut self) -> Result<&mut ByteString, CellError> {
        if self.is_nothing() {
            *self = Cell::String(ByteString::new());
        }
        match self {
            Cell::String(s) => Ok(s),
            other => Err(CellError::mismatch("string", other.type_name())),
        }
    }

    /// The array payload for in-place mutation; `Nothing` becomes `[]`.
    pub fn array_for_write(&mut self) -> Result<&mut Vec<Cell>, CellError> {
        if self.is_nothing() {
            *self = Cell::Array(Vec::new());
        }
        match self {
            Cell::Array(items) => Ok(items),
            other => Err(CellError::mismatch("array", other.type_name())),
        }
    }

    /// The dictionary payload for in-place mutation; `Nothing` becomes `{}`.
    pub fn dictionary_for_write(&mut self) -> Result<&mut Dictionary, CellError> {
        if self.is_nothing() {
            *self = Cell::new_dictionary();
        }
        match self {
            Cell::Dictionary(d) => Ok(d),
            other => Err(CellError::mismatch("dictionary", other.type_name())),
        }
    }

    /// Element `index`, growing the array with `Nothing` cells when needed.
    pub fn array_index_for_write(&mut self, index: usize) -> Result<&mut Cell, CellError> {
        let items = self.array_for_write()?;
        if index >= items.len() {
            items.resize(index + 1, Cell::Nothing);
        }
        Ok(&mut items[index])
    }

    /// Entry `key`, inserting `Nothing` when absent.
    pub fn dictionary_index_for_write(&mut self, key: ByteString) -> Result<&mut Cell, CellError> {
        Ok(self.dictionary_for_write()?.insert(key, Cell::Nothing))
    }

    pub fn into_array(self) -> Result<Vec<Cell>, CellError> {
        match self {
            Cell::Array(items) => Ok(items),
            Cell::Nothing => Ok(Vec::new()),
            other => Err(CellError::mismatch("array", other.type_name())),
        }
    }

    pub fn into_string(self) -> Result<ByteString, CellError> {
        match self {
            Cell::String(s) => Ok(s),
            Cell::Nothing => Ok(ByteString::new()),
            other => Err(CellError::mismatch("string", other.type_name())),
        }
    }

    pub fn into_number(self) -> Result<Number, CellError> {
        match self {
            Cell::Number(n) => Ok(n),
            other => Err(CellError::mismatch("number", other.type_name())),
        }
    }

    pub fn into_address(self) -> Result<Address, CellError> {
        match self {
            Cell::Address(a) => Ok(a),
            other => Err(CellError::mismatch("address", other.type_name())),
        }
    }

    /// Structural ordering within one type. Arrays compare element-wise, then
    /// by length; dictionaries compare their entries in key order.
    pub fn compare(&self, other: &Cell) -> Result<Ordering, CellError> {
        match (self, other) {
            (Cell::Nothing, Cell::Nothing) => Ok(Ordering::Equal),
            (Cell::Boolean(a), Cell::Boolean(b)) => Ok(a.cmp(b)),
            (Cell::Number(a), Cell::Number(b)) => Ok(a.cmp(b)),
            (Cell::String(a), Cell::String(b)) => Ok(a.cmp(b)),
            (Cell::Address(a), Cell::Address(b)) => Ok(a.cmp(b)),
            (Cell::Array(a), Cell::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.compare(y)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (Cell::Dictionary(a), Cell::Dictionary(b)) => {
                let (a, b) = (a.sorted(), b.sorted());
                for ((ka, va), (kb, vb)) in a.iter().zip(&b) {
                    let ord = match ka.cmp(kb) {
                        Ordering::Equal => va.compare(vb)?,
                        ord => ord,
                    };
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(CellError::Incomparable(self.type_name(), other.type_name())),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::String(s) => f.write_str(&s.quoted()),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Nothing => f.write_str("NIL"),
            Cell::Address(_) => f.write_str("<address>"),
            Cell::Boolean(true) => f.write_str("TRUE"),
            Cell::Boolean(false) => f.write_str("FALSE"),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::String(s) => write!(f, "{}", s),
            Cell::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Cell::Dictionary(d) => {
                f.write_str("{")?;
                for (i, (k, v)) in d.sorted().into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", k.quoted())?;
                    v.fmt_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<Number> for Cell {
    fn from(n: Number) -> Self {
        Cell::Number(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Boolean(b)
    }
}

impl From<ByteString> for Cell {
    fn from(s: ByteString) -> Self {
        Cell::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{CellStore, Root};

    fn num(i: i64) -> Cell {
        Cell::from_number(Number::from(i))
    }

    struct Slots(Vec<Cell>);

    impl CellStore for Slots {
        fn root(&self, root: Root) -> Option<&Cell> {
            match root {
                Root::Global(i) => self.0.get(i),
                _ => None,
            }
        }

        fn root_mut(&mut self, root: Root) -> Option<&mut Cell> {
            match root {
                Root::Global(i) => self.0.get_mut(i),
                _ => None,
            }
        }
    }

    #[test]
    fn from_cell_is_a_deep_copy() {
        let a = Cell::new_array(vec![num(1), Cell::from_string("x")]);
        let mut b = Cell::from_cell(&a);
        b.array_for_write().unwrap().push(num(2));
        *b.array_index_for_write(1).unwrap() = Cell::from_string("y");
        assert_eq!(a.as_array().unwrap().len(), 2);
        assert_eq!(a.as_array().unwrap()[1], Cell::from_string("x"));

        let s = Cell::from_string("abc");
        let mut t = Cell::from_cell(&s);
        t.string_for_write().unwrap().push(b'd');
        assert_eq!(s, Cell::from_string("abc"));

        let mut d = Cell::new_dictionary();
        *d.dictionary_index_for_write(ByteString::from("k")).unwrap() = num(1);
        let mut e = Cell::from_cell(&d);
        *e.dictionary_index_for_write(ByteString::from("k2")).unwrap() = num(2);
        assert_eq!(d.as_dictionary().unwrap().len(), 1);
    }

    #[test]
    fn from_address_shares_the_referent() {
        let mut store = Slots(vec![Cell::from_string("before")]);
        let a = Cell::from_address(Address::new(Root::Global(0)));
        let b = Cell::from_cell(&a);
        let target = b.as_address().unwrap().resolve_mut(&mut store).unwrap();
        *target = Cell::from_string("after");
        let seen = a.as_address().unwrap().resolve(&store).unwrap();
        assert_eq!(seen, &Cell::from_string("after"));
    }

    #[test]
    fn reassignment_replaces_payload() {
        let mut c = Cell::new_array(vec![num(1)]);
        assert_eq!(c.type_name(), "array");
        c = Cell::from_bool(true);
        assert_eq!(c.type_name(), "boolean");
        c.reset();
        assert!(c.is_nothing());
    }

    #[test]
    fn array_write_extends_with_nothing() {
        let mut c = Cell::new();
        *c.array_index_for_write(2).unwrap() = num(5);
        assert_eq!(c.as_array().unwrap(), &[Cell::Nothing, Cell::Nothing, num(5)]);
    }

    #[test]
    fn compare_within_type() {
        assert_eq!(num(1).compare(&num(2)), Ok(Ordering::Less));
        assert_eq!(
            Cell::from_string("b").compare(&Cell::from_string("a")),
            Ok(Ordering::Greater)
        );
        let a = Cell::new_array(vec![num(1), num(2)]);
        let b = Cell::new_array(vec![num(1)]);
        assert_eq!(a.compare(&b), Ok(Ordering::Greater));
        assert_eq!(a.compare(&a.clone()), Ok(Ordering::Equal));
    }

    #[test]
    fn compare_across_types_is_an_error() {
        let err = num(1).compare(&Cell::from_string("1")).unwrap_err();
        assert_eq!(err, CellError::Incomparable("number", "string"));
        assert!(err.is_type_error());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Cell::new().to_string(), "NIL");
        assert_eq!(Cell::from_bool(true).to_string(), "TRUE");
        assert_eq!(Cell::from_string("hi").to_string(), "hi");
        let arr = Cell::new_array(vec![num(1), Cell::from_string("a"), Cell::from_bool(false)]);
        assert_eq!(arr.to_string(), "[1, \"a\", FALSE]");
        let mut d = Cell::new_dictionary();
        *d.dictionary_index_for_write(ByteString::from("b")).unwrap() = num(2);
        *d.dictionary_index_for_write(ByteString::from("a")).unwrap() = Cell::from_string("x");
        assert_eq!(d.to_string(), "{\"a\": \"x\", \"b\": 2}");
    }

    #[test]
    fn typed_accessors_report_mismatch() {
        assert_eq!(
            Cell::from_bool(true).as_number().unwrap_err(),
            CellError::mismatch("number", "boolean")
        );
        assert_eq!(Cell::new().as_string().unwrap().len(), 0);
        assert!(Cell::new().as_array().unwrap().is_empty());
    }
}
