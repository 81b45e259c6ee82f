//! Core types: Symbol

use std::fmt;

/// Maximum symbol length in bytes.
pub const SYMBOL_CAPACITY: usize = 8;

/// Asset ticker stored inline (no heap allocation), up to 8 ASCII bytes.
///
/// `Symbol` is `Copy`, so maps keyed by it stay cheap to clone and compare.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; SYMBOL_CAPACITY],
    len: u8,
}

impl Symbol {
    /// Create a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than 8 bytes, or not ASCII.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol {s:?}: must be 1-8 ASCII bytes"),
        }
    }

    /// Create a symbol, returning `None` if `s` does not fit.
    pub fn try_new(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > SYMBOL_CAPACITY || !s.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; SYMBOL_CAPACITY];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// The symbol as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Symbol::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid symbol {s:?}")))
    }
}
