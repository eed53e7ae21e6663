//! Statement lowering.

use espresso_ast::{StmtId, StmtKind};

use crate::CodeGen;

impl CodeGen<'_> {
    /// Lowers a statement; returns true when the statement terminated the
    /// current block (every path ended in a return), in which case the
    /// caller stops emitting into it.
    pub(crate) fn emit_stmt(&mut self, stmt: StmtId) -> bool {
        match &self.ast.stmt(stmt).kind {
            StmtKind::Block(stmts) => {
                for &s in stmts {
                    if self.emit_stmt(s) {
                        // Unreachable statements are dropped.
                        return true;
                    }
                }
                false
            }
            StmtKind::Decl(var) => {
                let var = *var;
                if let Some(init) = self.ast.var(var).init {
                    let value = self.emit_expr(init);
                    let value = self.coerced_rvalue(self.ast.var(var).ty, value);
                    let slot = self.locals[&var];
                    self.builder.create_store(&mut self.module, value, slot);
                }
                false
            }
            StmtKind::Expr(expr) => {
                self.emit_expr(*expr);
                false
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (cond, then_branch, else_branch) = (*cond, *then_branch, *else_branch);
                let function = self.cur_fn.expect("inside a function");
                let cond = self.emit_expr_rvalue(cond);
                let then_bb = self.module.create_block(function);
                self.module.set_name(then_bb, "if.then");
                let done_bb = self.module.create_block(function);
                self.module.set_name(done_bb, "if.done");

                match else_branch {
                    Some(else_branch) => {
                        let else_bb = self.module.create_block(function);
                        self.module.set_name(else_bb, "if.else");
                        self.builder
                            .create_cond_branch(&mut self.module, cond, then_bb, else_bb);

                        self.builder.set_insert_point(then_bb);
                        if !self.emit_stmt(then_branch) {
                            self.builder.create_branch(&mut self.module, done_bb);
                        }
                        self.builder.set_insert_point(else_bb);
                        if !self.emit_stmt(else_branch) {
                            self.builder.create_branch(&mut self.module, done_bb);
                        }
                    }
                    None => {
                        self.builder
                            .create_cond_branch(&mut self.module, cond, then_bb, done_bb);
                        self.builder.set_insert_point(then_bb);
                        if !self.emit_stmt(then_branch) {
                            self.builder.create_branch(&mut self.module, done_bb);
                        }
                    }
                }
                self.builder.set_insert_point(done_bb);
                false
            }
            StmtKind::While { cond, body } => {
                let (cond, body) = (*cond, *body);
                let function = self.cur_fn.expect("inside a function");
                let header = self.module.create_block(function);
                self.module.set_name(header, "while.cond");
                let body_bb = self.module.create_block(function);
                self.module.set_name(body_bb, "while.body");
                let exit = self.module.create_block(function);
                self.module.set_name(exit, "while.done");

                self.builder.create_branch(&mut self.module, header);
                self.builder.set_insert_point(header);
                let cond = self.emit_expr_rvalue(cond);
                self.builder
                    .create_cond_branch(&mut self.module, cond, body_bb, exit);

                self.builder.set_insert_point(body_bb);
                if !self.emit_stmt(body) {
                    self.builder.create_branch(&mut self.module, header);
                }
                self.builder.set_insert_point(exit);
                false
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let (init, cond, update, body) = (*init, *cond, *update, *body);
                let function = self.cur_fn.expect("inside a function");
                if let Some(init) = init {
                    self.emit_stmt(init);
                }
                let header = self.module.create_block(function);
                self.module.set_name(header, "for.cond");
                let body_bb = self.module.create_block(function);
                self.module.set_name(body_bb, "for.body");
                let exit = self.module.create_block(function);
                self.module.set_name(exit, "for.done");

                self.builder.create_branch(&mut self.module, header);
                self.builder.set_insert_point(header);
                match cond {
                    Some(cond) => {
                        let cond = self.emit_expr_rvalue(cond);
                        self.builder
                            .create_cond_branch(&mut self.module, cond, body_bb, exit);
                    }
                    None => {
                        self.builder.create_branch(&mut self.module, body_bb);
                    }
                }

                self.builder.set_insert_point(body_bb);
                let terminated = self.emit_stmt(body);
                if !terminated {
                    if let Some(update) = update {
                        self.emit_stmt(update);
                    }
                    self.builder.create_branch(&mut self.module, header);
                }
                self.builder.set_insert_point(exit);
                false
            }
            StmtKind::Return(expr) => {
                let value = expr.map(|expr| self.emit_expr_rvalue(expr));
                self.builder.create_ret(&mut self.module, value);
                true
            }
            StmtKind::Empty => false,
        }
    }
}
