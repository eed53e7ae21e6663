//! Transitive inheritance queries.
//!
//! Classes without an explicit superclass extend the predefined `Object`.
//! Malformed inheritance graphs may contain cycles; every walk keeps a
//! visited set so resolution errors elsewhere cannot hang these queries.

use std::collections::HashSet;

use espresso_ast::{Ast, DeclId, DeclKind, TypeId};

use crate::resolver::{Builtin, NameResolver};

impl NameResolver {
    /// Whether `sup` is `sub` or a (transitive) superclass of it.
    pub fn is_super_class(&self, ast: &Ast, sup: DeclId, sub: DeclId) -> bool {
        let object = self.builtin(Builtin::Object);
        let mut seen = HashSet::new();
        let mut cur = Some(sub);
        while let Some(decl) = cur {
            if decl == sup {
                return true;
            }
            if !seen.insert(decl) {
                return false;
            }
            let DeclKind::Class(class) = &ast.decl(decl).kind else {
                return false;
            };
            cur = match explicit_super(ast, class.super_classes) {
                Some(parent) => Some(parent),
                // The implicit Object superclass, except on Object itself.
                None => object.filter(|&object| decl != object),
            };
        }
        false
    }

    /// Whether `iface` is implemented or extended (transitively) by
    /// `decl`. Walks superclasses of classes and super-interfaces of
    /// interfaces.
    pub fn is_super_interface(&self, ast: &Ast, iface: DeclId, decl: DeclId) -> bool {
        let mut seen = HashSet::new();
        let mut work = vec![decl];
        while let Some(cur) = work.pop() {
            if cur == iface {
                return true;
            }
            if !seen.insert(cur) {
                continue;
            }
            match &ast.decl(cur).kind {
                DeclKind::Class(class) => {
                    work.extend(resolved_decls(ast, &class.interfaces));
                    if let Some(parent) = explicit_super(ast, class.super_classes) {
                        work.push(parent);
                    } else if let Some(object) = self.builtin(Builtin::Object) {
                        if cur != object {
                            work.push(object);
                        }
                    }
                }
                DeclKind::Interface(interface) => {
                    work.extend(resolved_decls(ast, &interface.extends));
                }
                _ => {}
            }
        }
        false
    }
}

fn explicit_super(ast: &Ast, super_classes: [Option<TypeId>; 2]) -> Option<DeclId> {
    super_classes
        .into_iter()
        .flatten()
        .find_map(|ty| ast.ty(ty).as_decl())
}

fn resolved_decls<'a>(ast: &'a Ast, types: &'a [TypeId]) -> impl Iterator<Item = DeclId> + 'a {
    types.iter().filter_map(|&ty| ast.ty(ty).as_decl())
}
