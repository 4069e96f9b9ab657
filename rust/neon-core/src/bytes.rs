use std::fmt;

use serde::{Deserialize, Serialize};

/// Length-prefixed byte buffer backing Neon strings and `Bytes` values.
///
/// Contents are arbitrary bytes; nothing here assumes UTF-8 or a terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteString(Vec<u8>);

impl ByteString {
    pub const fn new() -> Self {
        ByteString(Vec::new())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        ByteString(bytes.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn append(&mut self, other: &ByteString) {
        self.0.extend_from_slice(&other.0);
    }

    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    pub fn concat(&self, other: &ByteString) -> ByteString {
        let mut out = Vec::with_capacity(self.len() + other.len());
        out.extend_from_slice(&self.0);
        out.extend_from_slice(&other.0);
        ByteString(out)
    }

    /// Byte offset of the first occurrence of `needle`.
    pub fn find(&self, needle: &ByteString) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        self.0
            .windows(needle.len())
            .position(|window| window == needle.as_bytes())
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Double-quoted rendering used inside array and dictionary text.
    pub fn quoted(&self) -> String {
        let mut out = String::with_capacity(self.len() + 2);
        out.push('"');
        for c in self.to_string_lossy().chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }

    /// `HEXBYTES "de ad be ef"`.
    pub fn hex_literal(&self) -> String {
        let hex: Vec<String> = self.0.iter().map(|b| format!("{:02x}", b)).collect();
        format!("HEXBYTES \"{}\"", hex.join(" "))
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        ByteString(s.as_bytes().to_vec())
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        ByteString(s.into_bytes())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        ByteString(bytes)
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_nul_is_kept() {
        let s = ByteString::from_bytes(b"a\0b");
        assert_eq!(s.len(), 3);
        assert_eq!(s.as_bytes(), b"a\0b");
    }

    #[test]
    fn compare_is_bytewise() {
        assert!(ByteString::from("abc") < ByteString::from("abd"));
        assert!(ByteString::from("ab") < ByteString::from("abc"));
        assert!(ByteString::from("B") < ByteString::from("a"));
    }

    #[test]
    fn append_and_concat() {
        let mut s = ByteString::from("foo");
        s.append(&ByteString::from("bar"));
        assert_eq!(s, ByteString::from("foobar"));
        assert_eq!(s.concat(&ByteString::from("!")).to_string(), "foobar!");
    }

    #[test]
    fn find_substring() {
        let s = ByteString::from("hello world");
        assert_eq!(s.find(&ByteString::from("o w")), Some(4));
        assert_eq!(s.find(&ByteString::from("xyz")), None);
    }

    #[test]
    fn quoting_and_hex() {
        assert_eq!(ByteString::from("say \"hi\"").quoted(), r#""say \"hi\"""#);
        assert_eq!(
            ByteString::from_bytes(&[0xde, 0xad]).hex_literal(),
            "HEXBYTES \"de ad\""
        );
    }
}
