//! Source files, locations and ranges.
//!
//! Files are opaque handles handed out by the driver's source manager; the
//! middle-end only threads them through so diagnostics can point somewhere.

use std::fmt;

/// Opaque identifier for a source file, assigned by the source manager.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct SourceFile(u32);

impl SourceFile {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceFile({})", self.0)
    }
}

/// A (line, column) position in a source file. Lines and columns are 1-based;
/// a default-constructed location is invalid and means "no location".
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: SourceFile,
    pub line: i32,
    pub column: i32,
}

impl SourceLocation {
    pub const fn new(file: SourceFile, line: i32, column: i32) -> Self {
        Self { file, line, column }
    }

    /// True unless this location was default-constructed.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.line != -1
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self {
            file: SourceFile::from_raw(0),
            line: -1,
            column: -1,
        }
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}:{}", self.file, self.line, self.column)
    }
}

/// A pair of locations in one source file.
///
/// Invalid ranges propagate: merging with an invalid range yields the other
/// operand, so positions survive best-effort through partially-built trees.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct SourceRange {
    begin: SourceLocation,
    end: SourceLocation,
}

impl SourceRange {
    pub fn new(begin: SourceLocation, end: SourceLocation) -> Self {
        debug_assert!(
            begin.file == end.file,
            "SourceRange spans multiple files"
        );
        Self { begin, end }
    }

    /// A zero-width range covering the start of `file`.
    pub fn for_file(file: SourceFile) -> Self {
        let loc = SourceLocation::new(file, 0, 0);
        Self {
            begin: loc,
            end: loc,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.begin.is_valid() && self.end.is_valid()
    }

    #[inline]
    pub fn start(&self) -> SourceLocation {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> SourceLocation {
        self.end
    }

    /// The smallest range covering both operands: min start, max end.
    pub fn merge(a: SourceRange, b: SourceRange) -> SourceRange {
        if !a.is_valid() {
            return b;
        }
        if !b.is_valid() {
            return a;
        }
        debug_assert!(
            a.begin.file == b.begin.file,
            "tried to merge SourceRanges from different files"
        );
        let file = a.begin.file;
        SourceRange {
            begin: SourceLocation::new(
                file,
                a.begin.line.min(b.begin.line),
                a.begin.column.min(b.begin.column),
            ),
            end: SourceLocation::new(
                file,
                a.end.line.max(b.end.line),
                a.end.column.max(b.end.column),
            ),
        }
    }
}

impl fmt::Debug for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "<no location>");
        }
        write!(
            f,
            "{:?} - {}:{}",
            self.begin, self.end.line, self.end.column
        )
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(l0: i32, c0: i32, l1: i32, c1: i32) -> SourceRange {
        let file = SourceFile::from_raw(1);
        SourceRange::new(
            SourceLocation::new(file, l0, c0),
            SourceLocation::new(file, l1, c1),
        )
    }

    #[test]
    fn default_range_is_invalid() {
        assert!(!SourceRange::default().is_valid());
    }

    #[test]
    fn merge_takes_min_start_max_end() {
        let merged = SourceRange::merge(range(2, 5, 2, 9), range(1, 8, 3, 1));
        assert_eq!(merged.start().line, 1);
        assert_eq!(merged.start().column, 5);
        assert_eq!(merged.end().line, 3);
        assert_eq!(merged.end().column, 9);
    }

    #[test]
    fn merge_with_invalid_keeps_valid_operand() {
        let r = range(4, 1, 4, 7);
        assert_eq!(SourceRange::merge(SourceRange::default(), r), r);
        assert_eq!(SourceRange::merge(r, SourceRange::default()), r);
    }
}
