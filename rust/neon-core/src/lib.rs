//! Neon Core
//!
//! The runtime value model shared by the bytecode loader and the executor:
//! decimal numbers, byte strings, dictionaries and the tagged `Cell`.

pub mod address;
pub mod bytes;
pub mod cell;
pub mod dictionary;
pub mod error;
pub mod number;
pub mod range;

pub use address::{Address, CellStore, Root, Step};
pub use bytes::ByteString;
pub use cell::Cell;
pub use dictionary::Dictionary;
pub use error::CellError;
pub use number::Number;
