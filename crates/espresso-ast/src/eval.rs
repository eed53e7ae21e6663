//! The generic RPN expression walk.
//!
//! One algorithm serves every expression pass: name resolution, type
//! checking, and code generation each implement [`ExprEvaluator`] and get
//! the traversal, operand popping, and source-range bookkeeping for free.

use espresso_core::SourceRange;

use crate::expr::{BinOp, Expr, ExprNode, ExprNodeKind, UnaryOp};
use crate::store::Ast;

/// The enclosing expression was abandoned. A diagnostic has already been
/// reported by the hook that failed; callers continue with the next
/// expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EvalAbort;

pub type EvalResult<T> = Result<T, EvalAbort>;

/// Hooks invoked by [`evaluate`]. `range` is the node's own range for
/// values and the merged range of the consumed operands for ops.
pub trait ExprEvaluator {
    type Value: Clone;

    fn map_value(&mut self, ast: &Ast, node: &ExprNode) -> EvalResult<Self::Value>;

    fn eval_binary_op(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        op: BinOp,
        range: SourceRange,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> EvalResult<Self::Value>;

    fn eval_unary_op(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        op: UnaryOp,
        range: SourceRange,
        operand: Self::Value,
    ) -> EvalResult<Self::Value>;

    fn eval_member_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        lhs: Self::Value,
        field: Self::Value,
    ) -> EvalResult<Self::Value>;

    fn eval_method_call(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        method: Self::Value,
        args: &[Self::Value],
    ) -> EvalResult<Self::Value>;

    fn eval_new_object(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: Self::Value,
        args: &[Self::Value],
    ) -> EvalResult<Self::Value>;

    fn eval_new_array(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: Self::Value,
        size: Self::Value,
    ) -> EvalResult<Self::Value>;

    fn eval_array_access(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        array: Self::Value,
        index: Self::Value,
    ) -> EvalResult<Self::Value>;

    fn eval_cast(
        &mut self,
        ast: &Ast,
        node: &ExprNode,
        range: SourceRange,
        ty: Self::Value,
        value: Self::Value,
    ) -> EvalResult<Self::Value>;
}

/// Walks `expr`'s RPN list and reduces it to a single value.
///
/// Every node is locked up front and unlocked as it is consumed, so an
/// evaluator that recursed back into the same expression would trip the
/// lock assertion. A hook failure unlocks the remaining nodes and
/// propagates; the stack ending at any size other than one is an internal
/// invariant violation and panics.
pub fn evaluate<E: ExprEvaluator>(
    eval: &mut E,
    ast: &Ast,
    expr: &Expr,
) -> EvalResult<E::Value> {
    let nodes = expr.nodes();
    for node in nodes {
        node.lock();
    }

    let mut stack: Vec<E::Value> = Vec::new();
    let mut locs: Vec<SourceRange> = Vec::new();

    for (i, node) in nodes.iter().enumerate() {
        node.unlock();
        let result = step(eval, ast, node, &mut stack, &mut locs);
        match result {
            Ok(value) => stack.push(value),
            Err(abort) => {
                for rest in &nodes[i + 1..] {
                    rest.unlock();
                }
                return Err(abort);
            }
        }
    }

    let result = stack.pop().expect("expression produced no value");
    assert!(stack.is_empty(), "stack not empty after evaluation");
    Ok(result)
}

fn step<E: ExprEvaluator>(
    eval: &mut E,
    ast: &Ast,
    node: &ExprNode,
    stack: &mut Vec<E::Value>,
    locs: &mut Vec<SourceRange>,
) -> EvalResult<E::Value> {
    let nargs = node.kind.nargs() as usize;

    if node.kind.is_value() {
        locs.push(node.range);
        return eval.map_value(ast, node);
    }

    // Pop the consumed operand ranges and merge them into the op's range.
    assert!(locs.len() >= nargs, "location stack underflow");
    let mut range = locs.pop().expect("op with no operand locations");
    for _ in 1..nargs {
        range = SourceRange::merge(range, locs.pop().expect("location stack underflow"));
    }
    locs.push(range);

    let pop = |stack: &mut Vec<E::Value>| -> E::Value {
        stack.pop().expect("operand stack underflow")
    };

    match &node.kind {
        ExprNodeKind::Unary(op) => {
            let operand = pop(stack);
            eval.eval_unary_op(ast, node, *op, range, operand)
        }
        ExprNodeKind::Binary(op) => {
            let rhs = pop(stack);
            let lhs = pop(stack);
            eval.eval_binary_op(ast, node, *op, range, lhs, rhs)
        }
        ExprNodeKind::MemberAccess => {
            let field = pop(stack);
            let lhs = pop(stack);
            eval.eval_member_access(ast, node, range, lhs, field)
        }
        ExprNodeKind::MethodInvocation { nargs } => {
            let mut args = pop_args(stack, *nargs as usize - 1);
            args.reverse();
            let method = pop(stack);
            eval.eval_method_call(ast, node, range, method, &args)
        }
        ExprNodeKind::ClassCreation { nargs } => {
            let mut args = pop_args(stack, *nargs as usize - 1);
            args.reverse();
            let ty = pop(stack);
            eval.eval_new_object(ast, node, range, ty, &args)
        }
        ExprNodeKind::ArrayCreation => {
            let size = pop(stack);
            let ty = pop(stack);
            eval.eval_new_array(ast, node, range, ty, size)
        }
        ExprNodeKind::ArrayAccess => {
            let index = pop(stack);
            let array = pop(stack);
            eval.eval_array_access(ast, node, range, array, index)
        }
        ExprNodeKind::Cast => {
            let value = pop(stack);
            let ty = pop(stack);
            eval.eval_cast(ast, node, range, ty, value)
        }
        value_kind => unreachable!("value node {value_kind:?} reached op dispatch"),
    }
}

fn pop_args<V>(stack: &mut Vec<V>, count: usize) -> Vec<V> {
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(stack.pop().expect("operand stack underflow"));
    }
    args
}

#[cfg(test)]
mod tests {
    use espresso_core::SourceRange;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expr::LiteralValue;

    /// Folds integer expressions; enough to exercise the walk itself.
    struct ConstFolder;

    impl ExprEvaluator for ConstFolder {
        type Value = i64;

        fn map_value(&mut self, _ast: &Ast, node: &ExprNode) -> EvalResult<i64> {
            match &node.kind {
                ExprNodeKind::Literal(LiteralValue::Int(v)) => Ok(*v as i64),
                _ => Err(EvalAbort),
            }
        }

        fn eval_binary_op(
            &mut self,
            _ast: &Ast,
            _node: &ExprNode,
            op: BinOp,
            _range: SourceRange,
            lhs: i64,
            rhs: i64,
        ) -> EvalResult<i64> {
            match op {
                BinOp::Add => Ok(lhs + rhs),
                BinOp::Subtract => Ok(lhs - rhs),
                BinOp::Multiply => Ok(lhs * rhs),
                _ => Err(EvalAbort),
            }
        }

        fn eval_unary_op(
            &mut self,
            _ast: &Ast,
            _node: &ExprNode,
            op: UnaryOp,
            _range: SourceRange,
            operand: i64,
        ) -> EvalResult<i64> {
            match op {
                UnaryOp::Minus => Ok(-operand),
                _ => Err(EvalAbort),
            }
        }

        fn eval_member_access(
            &mut self,
            _: &Ast,
            _: &ExprNode,
            _: SourceRange,
            _: i64,
            _: i64,
        ) -> EvalResult<i64> {
            Err(EvalAbort)
        }

        fn eval_method_call(
            &mut self,
            _: &Ast,
            _: &ExprNode,
            _: SourceRange,
            _: i64,
            _: &[i64],
        ) -> EvalResult<i64> {
            Err(EvalAbort)
        }

        fn eval_new_object(
            &mut self,
            _: &Ast,
            _: &ExprNode,
            _: SourceRange,
            _: i64,
            _: &[i64],
        ) -> EvalResult<i64> {
            Err(EvalAbort)
        }

        fn eval_new_array(
            &mut self,
            _: &Ast,
            _: &ExprNode,
            _: SourceRange,
            _: i64,
            _: i64,
        ) -> EvalResult<i64> {
            Err(EvalAbort)
        }

        fn eval_array_access(
            &mut self,
            _: &Ast,
            _: &ExprNode,
            _: SourceRange,
            _: i64,
            _: i64,
        ) -> EvalResult<i64> {
            Err(EvalAbort)
        }

        fn eval_cast(
            &mut self,
            _: &Ast,
            _: &ExprNode,
            _: SourceRange,
            _: i64,
            _: i64,
        ) -> EvalResult<i64> {
            Err(EvalAbort)
        }
    }

    fn int(v: i32) -> ExprNode {
        ExprNode::new(
            ExprNodeKind::Literal(LiteralValue::Int(v)),
            SourceRange::default(),
        )
    }

    fn bin(op: BinOp) -> ExprNode {
        ExprNode::new(ExprNodeKind::Binary(op), SourceRange::default())
    }

    #[test]
    fn rpn_reduces_to_single_value() {
        // (2 + 3) * 4 == 2 3 + 4 *
        let ast = Ast::new();
        let expr = Expr::new(
            vec![int(2), int(3), bin(BinOp::Add), int(4), bin(BinOp::Multiply)],
            SourceRange::default(),
        );
        let result = evaluate(&mut ConstFolder, &ast, &expr);
        assert_eq!(result, Ok(20));
    }

    #[test]
    fn nodes_are_unlocked_after_walk() {
        let ast = Ast::new();
        let expr = Expr::new(vec![int(1), int(2), bin(BinOp::Add)], SourceRange::default());
        evaluate(&mut ConstFolder, &ast, &expr).unwrap();
        assert!(expr.nodes().iter().all(|n| !n.is_locked()));
        // Walking again must succeed: everything was unlocked.
        assert_eq!(evaluate(&mut ConstFolder, &ast, &expr), Ok(3));
    }

    #[test]
    fn abort_unlocks_remaining_nodes() {
        let ast = Ast::new();
        // Division is unsupported by the folder, so the walk aborts at the op.
        let expr = Expr::new(
            vec![int(1), int(2), bin(BinOp::Divide), int(3), bin(BinOp::Add)],
            SourceRange::default(),
        );
        assert_eq!(evaluate(&mut ConstFolder, &ast, &expr), Err(EvalAbort));
        assert!(expr.nodes().iter().all(|n| !n.is_locked()));
    }

    #[test]
    #[should_panic(expected = "stack not empty")]
    fn unbalanced_expression_is_fatal() {
        let ast = Ast::new();
        let expr = Expr::new(vec![int(1), int(2)], SourceRange::default());
        let _ = evaluate(&mut ConstFolder, &ast, &expr);
    }
}
