//! Lexical positions that survive AST construction.
//!
//! A `ScopeId` captures where a declaration sits in its enclosing scope
//! once the lexical structure itself is gone: a parent link plus a
//! position counter. The static checker uses [`ScopeTable::can_view`] to
//! enforce the forward-reference rule for field initializers.

use espresso_core::{Arena, Idx};

#[derive(Debug)]
pub struct ScopePos {
    parent: Option<ScopeId>,
    pos: u32,
}

pub type ScopeId = Idx<ScopePos>;

#[derive(Debug, Default)]
pub struct ScopeTable {
    positions: Arena<ScopePos>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh scope at position 0 under `parent` (none for a scope root).
    pub fn fresh(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.positions.alloc(ScopePos { parent, pos: 0 })
    }

    /// The position following `prev` in the same scope chain.
    pub fn next(&mut self, prev: ScopeId) -> ScopeId {
        let parent = self.positions[prev].parent;
        let pos = self.positions[prev].pos + 1;
        self.positions.alloc(ScopePos { parent, pos })
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.positions[id].parent
    }

    pub fn pos(&self, id: ScopeId) -> u32 {
        self.positions[id].pos
    }

    /// Whether a use at `from` may see the declaration at `target`.
    ///
    /// Walks `from` outward through its parents; at the level sharing
    /// `target`'s parent, `target` must *strictly* precede. A declaration
    /// therefore cannot see itself, which is exactly the self-forward-
    /// reference case (`int a = a + 1;`).
    #[must_use]
    pub fn can_view(&self, from: ScopeId, target: ScopeId) -> bool {
        let target_parent = self.positions[target].parent;
        let mut cur = Some(from);
        while let Some(scope) = cur {
            if self.positions[scope].parent == target_parent {
                return self.positions[target].pos < self.positions[scope].pos;
            }
            cur = self.positions[scope].parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_position_sees_earlier() {
        let mut table = ScopeTable::new();
        let a = table.fresh(None);
        let b = table.next(a);
        assert!(table.can_view(b, a));
        assert!(!table.can_view(a, b));
    }

    #[test]
    fn a_declaration_cannot_see_itself() {
        let mut table = ScopeTable::new();
        let a = table.fresh(None);
        assert!(!table.can_view(a, a));
    }

    #[test]
    fn nested_scope_sees_earlier_outer_position() {
        let mut table = ScopeTable::new();
        let outer_a = table.fresh(None);
        let outer_b = table.next(outer_a);
        let inner = table.fresh(Some(outer_b));
        assert!(table.can_view(inner, outer_a));

        let outer_c = table.next(outer_b);
        assert!(!table.can_view(inner, outer_c));
    }
}
