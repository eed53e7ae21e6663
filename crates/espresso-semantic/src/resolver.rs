//! The name resolver: symbol table construction, per-unit import scopes,
//! type-name resolution, the predefined-class cache, and the synthesised
//! array prototype.

use std::collections::HashMap;

use espresso_ast::{
    Ast, BuiltInKind, ClassDecl, ContextRef, Decl, DeclId, DeclKind, FieldDecl,
    MethodDecl, Modifier, Modifiers, Type, TypeId, UnitId, UnresolvedType,
};
use espresso_core::{DiagnosticSink, Name, SourceRange};
use once_cell::sync::Lazy;

use crate::symbols::{PackageTree, PkgChild, PkgId};

/// Predefined declarations every pass may look up by key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Object,
    String,
    Integer,
    Boolean,
    Byte,
    Short,
    Character,
    Number,
    Class,
    System,
    Cloneable,
    Serializable,
}

static PREDEFINED: Lazy<Vec<(Builtin, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (Builtin::Object, &["java", "lang", "Object"][..]),
        (Builtin::String, &["java", "lang", "String"]),
        (Builtin::Integer, &["java", "lang", "Integer"]),
        (Builtin::Boolean, &["java", "lang", "Boolean"]),
        (Builtin::Byte, &["java", "lang", "Byte"]),
        (Builtin::Short, &["java", "lang", "Short"]),
        (Builtin::Character, &["java", "lang", "Character"]),
        (Builtin::Number, &["java", "lang", "Number"]),
        (Builtin::Class, &["java", "lang", "Class"]),
        (Builtin::System, &["java", "lang", "System"]),
        (Builtin::Cloneable, &["java", "lang", "Cloneable"]),
        (Builtin::Serializable, &["java", "io", "Serializable"]),
    ]
});

/// One entry of a compilation unit's import scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shadow {
    Package(PkgId),
    Decl(DeclId),
    /// Two import-on-demand declarations pulled in the same simple name;
    /// resolving through this entry is a hard error.
    Ambiguous,
}

pub type ImportScope = HashMap<Name, Shadow>;

#[derive(Debug)]
pub struct NameResolver {
    tree: PackageTree,
    builtins: HashMap<Builtin, DeclId>,
    array_prototype: DeclId,
    array_length: DeclId,
    /// A `Reference` type per known class/interface, so read-only passes
    /// can hand out class types without allocating.
    decl_types: HashMap<DeclId, TypeId>,
    import_scopes: HashMap<UnitId, ImportScope>,
}

impl NameResolver {
    /// Builds the symbol table from every compilation unit, synthesises
    /// the array prototype, and publishes the predefined-class cache.
    pub fn build(ast: &mut Ast, sink: &mut DiagnosticSink) -> NameResolver {
        let mut tree = PackageTree::new();
        let units: Vec<UnitId> = ast.linking_unit().to_vec();

        for &unit in &units {
            let range = ast.unit(unit).range;
            let package = ast.unit(unit).package;
            let mut sub = tree.root();
            let mut ok = true;
            {
                let Type::Unresolved(pkg) = ast.ty(package) else {
                    panic!("package is not an unresolved name");
                };
                // The package name is never resolved to a decl; freeze it.
                pkg.lock();
                for part in &pkg.parts {
                    match tree.subpackage(sub, part) {
                        Ok(next) => sub = next,
                        Err(_) => {
                            // JLS 6.4.1: a subpackage may not share its name
                            // with a declaration in the same scope.
                            sink.report_error(
                                "import",
                                format!(
                                    "subpackage name cannot be the same as a declaration: {part}"
                                ),
                                range,
                            );
                            ok = false;
                            break;
                        }
                    }
                }
            }
            if !ok {
                continue;
            }
            if ast.unit_package_parts(unit).is_empty() {
                sub = tree.unnamed();
            }
            let Some(body) = ast.unit(unit).body else {
                continue;
            };
            let name = ast.decl(body).name().clone();
            if tree.child(sub, &name).is_some() {
                sink.report_error(
                    "import",
                    format!("declaration name is not unique in the subpackage: {name}"),
                    ast.decl(body).range(),
                );
                continue;
            }
            tree.insert_decl(sub, name, body);
        }

        let (array_prototype, array_length) = synthesise_array_prototype(ast);

        let mut decl_types = HashMap::new();
        for &unit in &units {
            if let Some(body) = ast.unit(unit).body {
                decl_types.insert(body, ast.alloc_type(Type::Reference(body)));
            }
        }
        decl_types.insert(
            array_prototype,
            ast.alloc_type(Type::Reference(array_prototype)),
        );

        let mut builtins = HashMap::new();
        for (key, path) in PREDEFINED.iter() {
            let mut cur = PkgChild::Package(tree.root());
            for part in path.iter() {
                let PkgChild::Package(pkg) = cur else {
                    cur = PkgChild::Package(tree.root());
                    break;
                };
                match tree.child(pkg, &Name::from(*part)) {
                    Some(next) => cur = next,
                    None => {
                        cur = PkgChild::Package(tree.root());
                        break;
                    }
                }
            }
            if let PkgChild::Decl(decl) = cur {
                builtins.insert(*key, decl);
            }
        }

        NameResolver {
            tree,
            builtins,
            array_prototype,
            array_length,
            decl_types,
            import_scopes: HashMap::new(),
        }
    }

    // --- accessors -------------------------------------------------------

    #[must_use]
    pub fn package_tree(&self) -> &PackageTree {
        &self.tree
    }

    /// A predefined declaration, when its source is part of the linking
    /// unit.
    pub fn builtin(&self, key: Builtin) -> Option<DeclId> {
        self.builtins.get(&key).copied()
    }

    /// The one synthesised class shared by every array type. Its only
    /// field is `public final int length`.
    #[must_use]
    pub fn array_prototype(&self) -> DeclId {
        self.array_prototype
    }

    #[must_use]
    pub fn array_length_field(&self) -> DeclId {
        self.array_length
    }

    /// The `Reference` type for a known class or interface declaration.
    pub fn class_type(&self, decl: DeclId) -> Option<TypeId> {
        self.decl_types.get(&decl).copied()
    }

    pub fn import_scope(&self, unit: UnitId) -> Option<&ImportScope> {
        self.import_scopes.get(&unit)
    }

    /// String-ness of a type: the literal built-in, or a reference to the
    /// predefined `String` class.
    pub fn is_string_type(&self, ast: &Ast, ty: TypeId) -> bool {
        if ast.ty(ty).is_string() {
            return true;
        }
        match (ast.ty(ty).as_decl(), self.builtin(Builtin::String)) {
            (Some(decl), Some(string)) => decl == string,
            _ => false,
        }
    }

    // --- resolution ------------------------------------------------------

    /// Resolves every declaration-level type name in the linking unit.
    /// Running this twice is equivalent to running it once: resolved
    /// types are not touched again.
    pub fn resolve(&mut self, ast: &Ast, sink: &mut DiagnosticSink) {
        let units: Vec<UnitId> = ast.linking_unit().to_vec();
        for unit in units {
            let scope = self.begin_context(ast, sink, unit);
            self.import_scopes.insert(unit, scope);

            let Some(body) = ast.unit(unit).body else {
                continue;
            };
            match &ast.decl(body).kind {
                DeclKind::Class(class) => self.resolve_class(ast, sink, unit, class),
                DeclKind::Interface(iface) => {
                    for &ty in &iface.extends {
                        self.resolve_type(ast, sink, unit, ty);
                    }
                    for &method in &iface.methods {
                        self.resolve_method(ast, sink, unit, method);
                    }
                }
                other => panic!("compilation unit body is not a type: {other:?}"),
            }
        }
    }

    fn resolve_class(
        &self,
        ast: &Ast,
        sink: &mut DiagnosticSink,
        unit: UnitId,
        class: &ClassDecl,
    ) {
        for &iface in &class.interfaces {
            self.resolve_type(ast, sink, unit, iface);
        }
        for super_class in class.super_classes.into_iter().flatten() {
            self.resolve_type(ast, sink, unit, super_class);
        }
        for &field in &class.fields {
            self.resolve_type(ast, sink, unit, ast.field(field).ty);
        }
        for method in class.methods.iter().chain(&class.constructors) {
            self.resolve_method(ast, sink, unit, *method);
        }
    }

    fn resolve_method(&self, ast: &Ast, sink: &mut DiagnosticSink, unit: UnitId, method: DeclId) {
        let method = ast.method(method);
        for var in method.params.iter().chain(&method.locals) {
            self.resolve_type(ast, sink, unit, ast.var(*var).ty);
        }
        if let Some(return_ty) = method.return_ty {
            self.resolve_type(ast, sink, unit, return_ty);
        }
    }

    /// Resolves one type against `unit`'s import scope. No-op for
    /// builtins, already-resolved names, and locked package names.
    pub fn resolve_type(&self, ast: &Ast, sink: &mut DiagnosticSink, unit: UnitId, ty: TypeId) {
        match ast.ty(ty) {
            Type::Array(elem) => self.resolve_type(ast, sink, unit, *elem),
            Type::Unresolved(u) => {
                if u.is_resolved() || u.is_locked() {
                    return;
                }
                let Some(scope) = self.import_scopes.get(&unit) else {
                    panic!("resolve_type before import scope was built");
                };
                self.resolve_unresolved(sink, scope, u);
            }
            Type::BuiltIn(_) | Type::Reference(_) => {}
        }
    }

    fn resolve_unresolved(
        &self,
        sink: &mut DiagnosticSink,
        scope: &ImportScope,
        u: &UnresolvedType,
    ) {
        let mut parts = u.parts.iter();
        let Some(first) = parts.next() else {
            sink.report_error("resolve", "empty type name", u.range);
            return;
        };

        let mut cur = match scope.get(first) {
            Some(Shadow::Decl(decl)) => PkgChild::Decl(*decl),
            Some(Shadow::Package(pkg)) => PkgChild::Package(*pkg),
            Some(Shadow::Ambiguous) => {
                sink.report_error(
                    "import",
                    format!("ambiguous import for \"{first}\""),
                    u.range,
                );
                return;
            }
            None => {
                sink.report_error(
                    "resolve",
                    format!("failed to resolve type as name does not exist: \"{first}\""),
                    u.range,
                );
                return;
            }
        };

        for part in parts {
            let pkg = match cur {
                PkgChild::Package(pkg) => pkg,
                PkgChild::Decl(_) => {
                    sink.report_error(
                        "resolve",
                        format!(
                            "failed to resolve type as subpackage is a declaration: \"{part}\""
                        ),
                        u.range,
                    );
                    return;
                }
            };
            match self.tree.child(pkg, part) {
                Some(next) => cur = next,
                None => {
                    sink.report_error(
                        "resolve",
                        format!(
                            "failed to resolve type as subpackage does not exist: \"{part}\""
                        ),
                        u.range,
                    );
                    return;
                }
            }
        }

        match cur {
            PkgChild::Decl(decl) => {
                u.resolve(decl);
                debug_assert!(u.is_resolved());
            }
            PkgChild::Package(_) => {
                sink.report_error(
                    "resolve",
                    format!("failed to resolve type, is not a declaration: \"{}\"", u.dotted()),
                    u.range,
                );
            }
        }
    }

    // --- import scope ----------------------------------------------------

    /// Builds `unit`'s import scope in strict shadowing order:
    /// import-on-demand declarations, top-level subpackages, same-package
    /// declarations, single-type imports, then the unit's own declaration.
    fn begin_context(
        &self,
        ast: &Ast,
        sink: &mut DiagnosticSink,
        unit: UnitId,
    ) -> ImportScope {
        let mut scope = ImportScope::new();
        let cu = ast.unit(unit);

        // 1. Import-on-demand declarations. Two IODs pulling in the same
        //    simple name poison that name.
        for import in &cu.imports {
            if !import.is_on_demand {
                continue;
            }
            let Some(target) = self.resolve_import(ast, sink, import.ty, import.range) else {
                continue;
            };
            let pkg = match target {
                PkgChild::Package(pkg) => pkg,
                PkgChild::Decl(_) => {
                    sink.report_error(
                        "import",
                        "failed to resolve import-on-demand as subpackage is a declaration",
                        import.range,
                    );
                    continue;
                }
            };
            // Only declarations are imported, never subpackages (JLS 7.5).
            for (name, child) in self.tree.children(pkg) {
                let PkgChild::Decl(decl) = child else { continue };
                match scope.get(name).copied() {
                    Some(Shadow::Decl(existing)) if existing == decl => {}
                    Some(_) => {
                        scope.insert(name.clone(), Shadow::Ambiguous);
                    }
                    None => {
                        scope.insert(name.clone(), Shadow::Decl(decl));
                    }
                }
            }
        }

        // 2. Top-level subpackages, unless an IOD already took the name.
        for (name, child) in self.tree.children(self.tree.root()) {
            let PkgChild::Package(pkg) = child else { continue };
            if name.as_str().is_empty() || scope.contains_key(name) {
                continue;
            }
            scope.insert(name.clone(), Shadow::Package(pkg));
        }

        // 3. All declarations in the unit's own package.
        let own_pkg = if ast.unit_package_parts(unit).is_empty() {
            Some(self.tree.unnamed())
        } else {
            match self.resolve_import(ast, sink, cu.package, cu.range) {
                Some(PkgChild::Package(pkg)) => Some(pkg),
                _ => None,
            }
        };
        if let Some(own_pkg) = own_pkg {
            for (name, child) in self.tree.children(own_pkg) {
                if let PkgChild::Decl(decl) = child {
                    scope.insert(name.clone(), Shadow::Decl(decl));
                }
            }
        }

        // 4. Single-type imports shadow everything so far. Renaming the
        //    unit's own declaration to a different target is an error.
        let own_decl = cu.body;
        for import in &cu.imports {
            if import.is_on_demand {
                continue;
            }
            let Some(target) = self.resolve_import(ast, sink, import.ty, import.range) else {
                continue;
            };
            let decl = match target {
                PkgChild::Decl(decl) => decl,
                PkgChild::Package(_) => {
                    sink.report_error(
                        "import",
                        "failed to resolve single-type-import as a declaration",
                        import.range,
                    );
                    continue;
                }
            };
            if let Some(own) = own_decl {
                if decl != own && ast.decl(decl).name() == ast.decl(own).name() {
                    sink.report_error(
                        "import",
                        format!(
                            "single-type-import is the same as the class/interface name: {}",
                            ast.decl(decl).name()
                        ),
                        import.range,
                    );
                    continue;
                }
            }
            scope.insert(ast.decl(decl).name().clone(), Shadow::Decl(decl));
        }

        // 5. The unit's own declaration shadows all of the above.
        if let Some(own) = own_decl {
            scope.insert(ast.decl(own).name().clone(), Shadow::Decl(own));
        }

        scope
    }

    /// Walks an import's dotted name through the package tree. The result
    /// may be a package (for IODs) or a declaration (for single imports).
    fn resolve_import(
        &self,
        ast: &Ast,
        sink: &mut DiagnosticSink,
        ty: TypeId,
        range: SourceRange,
    ) -> Option<PkgChild> {
        let Type::Unresolved(u) = ast.ty(ty) else {
            panic!("import is not an unresolved name");
        };
        u.lock();
        if u.parts.is_empty() {
            return Some(PkgChild::Package(self.tree.unnamed()));
        }
        let mut cur = PkgChild::Package(self.tree.root());
        for part in &u.parts {
            let pkg = match cur {
                PkgChild::Package(pkg) => pkg,
                PkgChild::Decl(_) => {
                    sink.report_error(
                        "import",
                        format!(
                            "failed to resolve import as subpackage is a declaration: \"{part}\""
                        ),
                        range,
                    );
                    return None;
                }
            };
            match self.tree.child(pkg, part) {
                Some(next) => cur = next,
                None => {
                    sink.report_error(
                        "import",
                        format!(
                            "failed to resolve import as subpackage does not exist: \"{part}\""
                        ),
                        range,
                    );
                    return None;
                }
            }
        }
        Some(cur)
    }
}

/// The one class backing every array type: `public final int length` and a
/// trivial constructor. `length` is an instance field.
fn synthesise_array_prototype(ast: &mut Ast) -> (DeclId, DeclId) {
    let int_ty = ast.builtin(BuiltInKind::Int);
    let range = SourceRange::default();

    let mut field_mods = Modifiers::new();
    field_mods.set(Modifier::Public, range);
    field_mods.set(Modifier::Final, range);
    let scope = ast.scopes.fresh(None);
    let length = ast.alloc_decl(Decl::new(
        Name::from("length"),
        range,
        DeclKind::Field(FieldDecl {
            modifiers: field_mods,
            ty: int_ty,
            init: None,
            scope,
        }),
    ));

    let mut ctor_mods = Modifiers::new();
    ctor_mods.set(Modifier::Public, range);
    let ctor = ast.alloc_decl(Decl::new(
        Name::from("Array"),
        range,
        DeclKind::Method(MethodDecl {
            modifiers: ctor_mods,
            return_ty: None,
            params: Vec::new(),
            locals: Vec::new(),
            is_constructor: true,
            body: None,
        }),
    ));

    let mut class_mods = Modifiers::new();
    class_mods.set(Modifier::Public, range);
    class_mods.set(Modifier::Final, range);
    let proto = ast.alloc_decl(Decl::new(
        Name::from("Array"),
        range,
        DeclKind::Class(ClassDecl {
            modifiers: class_mods,
            super_classes: [None, None],
            interfaces: Vec::new(),
            fields: vec![length],
            methods: Vec::new(),
            constructors: vec![ctor],
        }),
    ));
    ast.set_parent(proto, ContextRef::LinkingUnit);
    ast.set_parent(length, ContextRef::Decl(proto));
    ast.set_parent(ctor, ContextRef::Decl(proto));

    (proto, length)
}
