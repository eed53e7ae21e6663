//! Name types and string interning.

use lasso::{Key, Rodeo, Spur};
use smol_str::SmolStr;

/// A lightweight owned identifier.
///
/// Backed by [`smol_str::SmolStr`], which stores short strings inline; Java
/// identifiers are almost always short enough to avoid the heap entirely.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Name(SmolStr);

impl Name {
    #[inline]
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Self(text.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Name").field(&self.0.as_str()).finish()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A symbolic handle for a string stored in a [`NameInterner`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct InternedStr(Spur);

impl InternedStr {
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0.into_usize() as u32
    }
}

impl std::fmt::Debug for InternedStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InternedStr({})", self.to_raw())
    }
}

/// A string interner owning identifier and literal text for the lifetime of
/// a compilation. Leaves of the parse tree refer into it by handle.
#[derive(Default)]
pub struct NameInterner {
    rodeo: Rodeo,
}

impl NameInterner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&mut self, text: &str) -> InternedStr {
        InternedStr(self.rodeo.get_or_intern(text))
    }

    #[inline]
    pub fn resolve(&self, handle: InternedStr) -> &str {
        self.rodeo.resolve(&handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_round_trips() {
        let mut interner = NameInterner::new();
        let a = interner.intern("length");
        let b = interner.intern("length");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "length");
    }

    #[test]
    fn name_compares_with_str() {
        let n = Name::from("Object");
        assert_eq!(n, "Object");
        assert_eq!(n.to_string(), "Object");
    }
}
