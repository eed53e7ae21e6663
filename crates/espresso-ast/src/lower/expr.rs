//! Expression linearisation.
//!
//! Expressions lower to reverse-Polish order by post-order emission: visit
//! children, append their RPN, then append the operator node. The only
//! constant folding at this layer is flipping the sign of an integer
//! literal under unary plus/minus; `-2147483648` is otherwise unrepresentable.

use espresso_core::Name;
use espresso_parsetree::{
    LiteralKind, NodeId, NodeKind, OperatorKind, Payload,
};

use crate::expr::{BinOp, Expr, ExprId, ExprNode, ExprNodeKind, LiteralValue, UnaryOp};
use crate::lower::{LowerCtx, LowerError};
use crate::ty::{BuiltInKind, Type, UnresolvedType};

impl LowerCtx<'_> {
    pub(crate) fn lower_expr(&mut self, node: NodeId) -> Result<ExprId, LowerError> {
        let mut ops = Vec::new();
        self.visit_expr(node, &mut ops)?;
        let range = self.range(node);
        Ok(self.ast.alloc_expr(Expr::new(ops, range)))
    }

    fn visit_expr(&mut self, id: NodeId, ops: &mut Vec<ExprNode>) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::Expression)?;
        self.check_children(id, 1, 3)?;
        match self.tree.node(id).num_children() {
            1 => {
                let child = self.require_child(id, 0)?;
                self.visit_expr_child(child, ops)
            }
            2 => {
                let op_node = self.require_child(id, 0)?;
                let operand = self.require_child(id, 1)?;
                let op = self.operator(op_node)?;
                self.visit_unary(id, op, operand, ops)
            }
            3 => {
                let lhs = self.require_child(id, 0)?;
                let op_node = self.require_child(id, 1)?;
                let rhs = self.require_child(id, 2)?;
                self.visit_expr_child(lhs, ops)?;
                self.visit_expr_child(rhs, ops)?;
                let op = self.operator(op_node)?;
                let Some(op) = binary_op(op) else {
                    self.sink.report_error(
                        "builder",
                        format!("operator {op:?} is not binary"),
                        self.range(op_node),
                    );
                    return Err(LowerError::Shape);
                };
                ops.push(ExprNode::new(
                    ExprNodeKind::Binary(op),
                    self.range(op_node),
                ));
                Ok(())
            }
            _ => unreachable!(),
        }
    }

    fn visit_unary(
        &mut self,
        parent: NodeId,
        op: OperatorKind,
        operand: NodeId,
        ops: &mut Vec<ExprNode>,
    ) -> Result<(), LowerError> {
        // Fold the sign into an integer literal operand; everything else
        // stays a real op node.
        if matches!(op, OperatorKind::Minus | OperatorKind::Plus) {
            if let Payload::Literal {
                kind: LiteralKind::Integer,
                negative: false,
                text,
            } = self.tree.node(operand).payload()
            {
                let negative = op == OperatorKind::Minus;
                let text = self.tree.text(text).to_owned();
                ops.push(self.integer_literal(&text, negative, self.range(parent)));
                return Ok(());
            }
        }

        self.visit_expr_child(operand, ops)?;
        let unary = match op {
            OperatorKind::Not => UnaryOp::Not,
            OperatorKind::BitwiseNot => UnaryOp::BitwiseNot,
            OperatorKind::Plus => UnaryOp::Plus,
            OperatorKind::Minus => UnaryOp::Minus,
            other => {
                self.sink.report_error(
                    "builder",
                    format!("operator {other:?} is not unary"),
                    self.range(parent),
                );
                return Err(LowerError::Shape);
            }
        };
        ops.push(ExprNode::new(
            ExprNodeKind::Unary(unary),
            self.range(parent),
        ));
        Ok(())
    }

    fn visit_expr_child(&mut self, id: NodeId, ops: &mut Vec<ExprNode>) -> Result<(), LowerError> {
        match self.tree.node(id).kind() {
            NodeKind::Expression => self.visit_expr(id, ops),
            NodeKind::Literal => {
                let node = self.visit_literal(id)?;
                ops.push(node);
                Ok(())
            }
            NodeKind::Identifier => {
                let name = self.identifier(id)?;
                if name == "this" {
                    ops.push(ExprNode::new(ExprNodeKind::This, self.range(id)));
                } else {
                    ops.push(ExprNode::new(
                        ExprNodeKind::MemberName { name },
                        self.range(id),
                    ));
                }
                Ok(())
            }
            NodeKind::QualifiedIdentifier => self.visit_qualified_in_expr(id, ops),
            NodeKind::Type
            | NodeKind::BasicType
            | NodeKind::ArrayType
            | NodeKind::ArrayCastType => {
                let ty = self.visit_type(id)?;
                ops.push(ExprNode::new(ExprNodeKind::TypeRef(ty), self.range(id)));
                Ok(())
            }
            NodeKind::MethodInvocation => self.visit_method_invocation(id, ops),
            NodeKind::FieldAccess => self.visit_field_access(id, ops),
            NodeKind::ArrayAccess => self.visit_array_access(id, ops),
            NodeKind::CastExpression => self.visit_cast(id, ops),
            NodeKind::ArrayCreationExpression => self.visit_array_creation(id, ops),
            NodeKind::ClassInstanceCreationExpression => self.visit_class_creation(id, ops),
            other => {
                self.sink.report_error(
                    "builder",
                    format!("unexpected expression operand {other:?}"),
                    self.range(id),
                );
                Err(LowerError::Shape)
            }
        }
    }

    /// `a.b.c` becomes `a`, `b`, `.`, `c`, `.`: a left-leaning chain of
    /// member accesses.
    fn visit_qualified_in_expr(
        &mut self,
        id: NodeId,
        ops: &mut Vec<ExprNode>,
    ) -> Result<(), LowerError> {
        let parts = self.qualified_parts(id)?;
        let range = self.range(id);
        emit_name_chain(&parts, range, ops);
        Ok(())
    }

    fn visit_method_invocation(
        &mut self,
        id: NodeId,
        ops: &mut Vec<ExprNode>,
    ) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::MethodInvocation)?;
        self.check_children(id, 2, 3)?;
        let range = self.range(id);

        if self.tree.node(id).num_children() == 2 {
            // name(args): the last part of the name is the method.
            let name_node = self.require_child(id, 0)?;
            let parts = self.qualified_parts(name_node)?;
            let (method, prefix) = parts.split_last().expect("qualified name is never empty");
            emit_name_chain(prefix, range, ops);
            ops.push(ExprNode::new(
                ExprNodeKind::MethodName {
                    name: method.clone(),
                },
                range,
            ));
            if !prefix.is_empty() {
                ops.push(ExprNode::new(ExprNodeKind::MemberAccess, range));
            }

            let nargs = self.visit_argument_list(self.tree.node(id).child(1), ops)?;
            ops.push(ExprNode::new(
                ExprNodeKind::MethodInvocation { nargs: nargs + 1 },
                range,
            ));
        } else {
            // receiver.method(args)
            let receiver = self.require_child(id, 0)?;
            self.visit_expr_child(receiver, ops)?;
            let method_node = self.require_child(id, 1)?;
            let method = self.identifier(method_node)?;
            ops.push(ExprNode::new(
                ExprNodeKind::MethodName { name: method },
                range,
            ));
            ops.push(ExprNode::new(ExprNodeKind::MemberAccess, range));

            let nargs = self.visit_argument_list(self.tree.node(id).child(2), ops)?;
            ops.push(ExprNode::new(
                ExprNodeKind::MethodInvocation { nargs: nargs + 1 },
                range,
            ));
        }
        Ok(())
    }

    fn visit_field_access(&mut self, id: NodeId, ops: &mut Vec<ExprNode>) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::FieldAccess)?;
        self.check_children(id, 2, 2)?;
        let receiver = self.require_child(id, 0)?;
        self.visit_expr_child(receiver, ops)?;
        let field_node = self.require_child(id, 1)?;
        let field = self.identifier(field_node)?;
        let range = self.range(id);
        ops.push(ExprNode::new(ExprNodeKind::MemberName { name: field }, range));
        ops.push(ExprNode::new(ExprNodeKind::MemberAccess, range));
        Ok(())
    }

    fn visit_array_access(&mut self, id: NodeId, ops: &mut Vec<ExprNode>) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::ArrayAccess)?;
        self.check_children(id, 2, 2)?;
        let array = self.require_child(id, 0)?;
        self.visit_expr_child(array, ops)?;
        let index = self.require_child(id, 1)?;
        self.visit_expr(index, ops)?;
        ops.push(ExprNode::new(ExprNodeKind::ArrayAccess, self.range(id)));
        Ok(())
    }

    fn visit_cast(&mut self, id: NodeId, ops: &mut Vec<ExprNode>) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::CastExpression)?;
        self.check_children(id, 2, 2)?;
        let ty_node = self.require_child(id, 0)?;
        let ty = self.visit_type(ty_node)?;
        ops.push(ExprNode::new(ExprNodeKind::TypeRef(ty), self.range(ty_node)));
        let value = self.require_child(id, 1)?;
        self.visit_expr_child(value, ops)?;
        ops.push(ExprNode::new(ExprNodeKind::Cast, self.range(id)));
        Ok(())
    }

    fn visit_array_creation(
        &mut self,
        id: NodeId,
        ops: &mut Vec<ExprNode>,
    ) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::ArrayCreationExpression)?;
        self.check_children(id, 2, 2)?;
        let ty_node = self.require_child(id, 0)?;
        // The operand is the *element* type; the array type wrapping it is
        // allocated here so the (read-only) type resolver can hand it out.
        let ty = self.visit_type(ty_node)?;
        ops.push(ExprNode::new(ExprNodeKind::TypeRef(ty), self.range(ty_node)));
        let size = self.require_child(id, 1)?;
        self.visit_expr(size, ops)?;
        let node = ExprNode::new(ExprNodeKind::ArrayCreation, self.range(id));
        node.resolve_ty(self.ast.alloc_type(Type::Array(ty)));
        ops.push(node);
        Ok(())
    }

    fn visit_class_creation(
        &mut self,
        id: NodeId,
        ops: &mut Vec<ExprNode>,
    ) -> Result<(), LowerError> {
        self.check_kind(id, NodeKind::ClassInstanceCreationExpression)?;
        self.check_children(id, 2, 2)?;
        let name_node = self.require_child(id, 0)?;
        let parts = self.qualified_parts(name_node)?;
        let range = self.range(id);
        let ty = self.ast.alloc_type(Type::Unresolved(UnresolvedType::new(
            parts,
            self.range(name_node),
        )));
        ops.push(ExprNode::new(ExprNodeKind::TypeRef(ty), self.range(name_node)));

        let nargs = self.visit_argument_list(self.tree.node(id).child(1), ops)?;
        ops.push(ExprNode::new(
            ExprNodeKind::ClassCreation { nargs: nargs + 1 },
            range,
        ));
        Ok(())
    }

    /// Appends each argument's RPN in order; returns the argument count.
    fn visit_argument_list(
        &mut self,
        node: Option<NodeId>,
        ops: &mut Vec<ExprNode>,
    ) -> Result<u32, LowerError> {
        let Some(id) = node else { return Ok(0) };
        self.check_kind(id, NodeKind::ArgumentList)?;
        self.check_children(id, 1, 2)?;
        if self.tree.node(id).num_children() == 2 {
            let count = self.visit_argument_list(self.tree.node(id).child(0), ops)?;
            let arg = self.require_child(id, 1)?;
            self.visit_expr(arg, ops)?;
            Ok(count + 1)
        } else {
            let arg = self.require_child(id, 0)?;
            self.visit_expr(arg, ops)?;
            Ok(1)
        }
    }

    // --- leaves ----------------------------------------------------------

    fn visit_literal(&mut self, id: NodeId) -> Result<ExprNode, LowerError> {
        let Payload::Literal {
            kind,
            negative,
            text,
        } = self.tree.node(id).payload()
        else {
            self.sink
                .report_error("builder", "literal node has no payload", self.range(id));
            return Err(LowerError::Shape);
        };
        let range = self.range(id);
        let text = self.tree.text(text).to_owned();
        Ok(match kind {
            LiteralKind::Integer => self.integer_literal(&text, negative, range),
            LiteralKind::Boolean => {
                let node = ExprNode::new(
                    ExprNodeKind::Literal(LiteralValue::Bool(text == "true")),
                    range,
                );
                node.resolve_ty(self.ast.builtin(BuiltInKind::Boolean));
                node
            }
            LiteralKind::Character => {
                let value = text.chars().next().map_or(0, |c| c as u32 as u16);
                let node =
                    ExprNode::new(ExprNodeKind::Literal(LiteralValue::Char(value)), range);
                node.resolve_ty(self.ast.builtin(BuiltInKind::Char));
                node
            }
            LiteralKind::String => {
                let node = ExprNode::new(
                    ExprNodeKind::Literal(LiteralValue::String(Name::from(text.as_str()))),
                    range,
                );
                node.resolve_ty(self.ast.builtin(BuiltInKind::String));
                node
            }
            LiteralKind::Null => {
                let node = ExprNode::new(ExprNodeKind::Literal(LiteralValue::Null), range);
                node.resolve_ty(self.ast.builtin(BuiltInKind::NoneType));
                node
            }
        })
    }

    fn integer_literal(
        &mut self,
        text: &str,
        negative: bool,
        range: espresso_core::SourceRange,
    ) -> ExprNode {
        let value = match espresso_parsetree::parse_integer_literal(text, negative) {
            Some(value) => value,
            None => {
                self.sink.report_error(
                    "builder",
                    format!("integer literal out of range: {}{text}", if negative { "-" } else { "" }),
                    range,
                );
                0
            }
        };
        let node = ExprNode::new(ExprNodeKind::Literal(LiteralValue::Int(value)), range);
        node.resolve_ty(self.ast.builtin(BuiltInKind::Int));
        node
    }

    fn operator(&mut self, id: NodeId) -> Result<OperatorKind, LowerError> {
        self.check_kind(id, NodeKind::Operator)?;
        match self.tree.node(id).payload() {
            Payload::Operator(kind) => Ok(kind),
            other => {
                self.sink.report_error(
                    "builder",
                    format!("operator node carries {other:?}"),
                    self.range(id),
                );
                Err(LowerError::Shape)
            }
        }
    }
}

/// Emits `parts` as `MemberName` nodes chained by `MemberAccess`.
fn emit_name_chain(parts: &[Name], range: espresso_core::SourceRange, ops: &mut Vec<ExprNode>) {
    for (i, part) in parts.iter().enumerate() {
        ops.push(ExprNode::new(
            ExprNodeKind::MemberName { name: part.clone() },
            range,
        ));
        if i > 0 {
            ops.push(ExprNode::new(ExprNodeKind::MemberAccess, range));
        }
    }
}

fn binary_op(op: OperatorKind) -> Option<BinOp> {
    Some(match op {
        OperatorKind::Assign => BinOp::Assignment,
        OperatorKind::GreaterThan => BinOp::GreaterThan,
        OperatorKind::GreaterThanOrEqual => BinOp::GreaterThanOrEqual,
        OperatorKind::LessThan => BinOp::LessThan,
        OperatorKind::LessThanOrEqual => BinOp::LessThanOrEqual,
        OperatorKind::Equal => BinOp::Equal,
        OperatorKind::NotEqual => BinOp::NotEqual,
        OperatorKind::And => BinOp::And,
        OperatorKind::Or => BinOp::Or,
        OperatorKind::BitwiseAnd => BinOp::BitwiseAnd,
        OperatorKind::BitwiseOr => BinOp::BitwiseOr,
        OperatorKind::BitwiseXor => BinOp::BitwiseXor,
        OperatorKind::Add => BinOp::Add,
        OperatorKind::Subtract => BinOp::Subtract,
        OperatorKind::Multiply => BinOp::Multiply,
        OperatorKind::Divide => BinOp::Divide,
        OperatorKind::Modulo => BinOp::Modulo,
        OperatorKind::InstanceOf => BinOp::InstanceOf,
        OperatorKind::Not
        | OperatorKind::BitwiseNot
        | OperatorKind::Plus
        | OperatorKind::Minus => return None,
    })
}
