//! Arena-backed tree storage and the builder used by the parser.

use espresso_core::{Arena, Idx, InternedStr, NameInterner, SourceRange};

use crate::node::{
    BasicTypeKind, LiteralKind, ModifierKind, NodeKind, OperatorKind, Payload,
};

pub type NodeId = Idx<Node>;

#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    range: SourceRange,
    /// Ordered children; optional grammar positions may be absent.
    children: Vec<Option<NodeId>>,
    payload: Payload,
}

impl Node {
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn range(&self) -> SourceRange {
        self.range
    }

    #[inline]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn child(&self, i: usize) -> Option<NodeId> {
        self.children[i]
    }

    pub fn children(&self) -> impl Iterator<Item = Option<NodeId>> + '_ {
        self.children.iter().copied()
    }

    #[inline]
    pub fn payload(&self) -> Payload {
        self.payload
    }
}

/// One parsed source file's tree plus the interner owning its strings.
#[derive(Default)]
pub struct Tree {
    nodes: Arena<Node>,
    interner: NameInterner,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn text(&self, handle: InternedStr) -> &str {
        self.interner.resolve(handle)
    }

    /// The identifier text of a leaf, if `id` is an identifier.
    pub fn identifier_text(&self, id: NodeId) -> Option<&str> {
        match self.node(id).payload() {
            Payload::Identifier { text } => Some(self.text(text)),
            _ => None,
        }
    }

    /// A tree is poisoned iff any node under `root` has kind `Poison`.
    pub fn is_poisoned(&self, root: NodeId) -> bool {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.kind() == NodeKind::Poison {
                return true;
            }
            stack.extend(node.children().flatten());
        }
        false
    }
}

/// Construction surface for the parser (and tests).
///
/// The builder is the only way to create nodes; once the parser drops it,
/// the tree is read-only.
pub struct TreeBuilder {
    tree: Tree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    pub fn node(
        &mut self,
        kind: NodeKind,
        range: SourceRange,
        children: Vec<Option<NodeId>>,
    ) -> NodeId {
        debug_assert!(
            !matches!(
                kind,
                NodeKind::Literal
                    | NodeKind::Identifier
                    | NodeKind::Operator
                    | NodeKind::Modifier
                    | NodeKind::BasicType
            ),
            "leaf kinds take a payload constructor"
        );
        self.tree.nodes.alloc(Node {
            kind,
            range,
            children,
            payload: Payload::None,
        })
    }

    pub fn identifier(&mut self, text: &str, range: SourceRange) -> NodeId {
        let text = self.tree.interner.intern(text);
        self.leaf(NodeKind::Identifier, range, Payload::Identifier { text })
    }

    pub fn literal(
        &mut self,
        kind: LiteralKind,
        text: &str,
        range: SourceRange,
    ) -> NodeId {
        let text = self.tree.interner.intern(text);
        self.leaf(
            NodeKind::Literal,
            range,
            Payload::Literal {
                kind,
                negative: false,
                text,
            },
        )
    }

    pub fn operator(&mut self, kind: OperatorKind, range: SourceRange) -> NodeId {
        self.leaf(NodeKind::Operator, range, Payload::Operator(kind))
    }

    pub fn modifier(&mut self, kind: ModifierKind, range: SourceRange) -> NodeId {
        self.leaf(NodeKind::Modifier, range, Payload::Modifier(kind))
    }

    pub fn basic_type(&mut self, kind: BasicTypeKind, range: SourceRange) -> NodeId {
        self.leaf(NodeKind::BasicType, range, Payload::BasicType(kind))
    }

    pub fn poison(&mut self, range: SourceRange) -> NodeId {
        self.tree.nodes.alloc(Node {
            kind: NodeKind::Poison,
            range,
            children: Vec::new(),
            payload: Payload::None,
        })
    }

    pub fn finish(self) -> Tree {
        self.tree
    }

    fn leaf(&mut self, kind: NodeKind, range: SourceRange, payload: Payload) -> NodeId {
        self.tree.nodes.alloc(Node {
            kind,
            range,
            children: Vec::new(),
            payload,
        })
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a decimal integer literal, honouring the folded sign.
///
/// `-2147483648` is representable only with the sign applied, so validation
/// must happen after sign folding, never on the bare token.
pub fn parse_integer_literal(text: &str, negative: bool) -> Option<i32> {
    let magnitude: i64 = text.parse().ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn poison_detection_walks_the_whole_tree() {
        let mut b = TreeBuilder::new();
        let ok = b.identifier("x", SourceRange::default());
        let bad = b.poison(SourceRange::default());
        let parent = b.node(
            NodeKind::Expression,
            SourceRange::default(),
            vec![Some(ok), None, Some(bad)],
        );
        let clean = b.node(NodeKind::Expression, SourceRange::default(), vec![Some(ok)]);
        let tree = b.finish();
        assert!(tree.is_poisoned(parent));
        assert!(!tree.is_poisoned(clean));
    }

    #[test]
    fn integer_literal_bounds() {
        assert_eq!(parse_integer_literal("2147483647", false), Some(i32::MAX));
        assert_eq!(parse_integer_literal("2147483648", false), None);
        assert_eq!(parse_integer_literal("2147483648", true), Some(i32::MIN));
        assert_eq!(parse_integer_literal("0", true), Some(0));
    }

    #[test]
    fn identifier_text_resolves_through_interner() {
        let mut b = TreeBuilder::new();
        let id = b.identifier("foo", SourceRange::default());
        let tree = b.finish();
        assert_eq!(tree.identifier_text(id), Some("foo"));
    }
}
