//! The package tree.
//!
//! The root package's children are keyed by identifier; a child is either
//! a subpackage or a top-level declaration. The unnamed (default) package
//! lives under the empty name.

use std::collections::HashMap;

use espresso_ast::DeclId;
use espresso_core::{Arena, Idx, Name};

#[derive(Debug)]
pub struct Package {
    pub name: Name,
    pub children: HashMap<Name, PkgChild>,
}

pub type PkgId = Idx<Package>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PkgChild {
    Package(PkgId),
    Decl(DeclId),
}

#[derive(Debug)]
pub struct PackageTree {
    packages: Arena<Package>,
    root: PkgId,
    unnamed: PkgId,
}

impl PackageTree {
    pub fn new() -> Self {
        let mut packages = Arena::new();
        let root = packages.alloc(Package {
            name: Name::from(""),
            children: HashMap::new(),
        });
        let unnamed = packages.alloc(Package {
            name: Name::from(""),
            children: HashMap::new(),
        });
        packages[root]
            .children
            .insert(Name::from(""), PkgChild::Package(unnamed));
        Self {
            packages,
            root,
            unnamed,
        }
    }

    #[inline]
    pub fn root(&self) -> PkgId {
        self.root
    }

    /// The unnamed (default) package.
    #[inline]
    pub fn unnamed(&self) -> PkgId {
        self.unnamed
    }

    #[must_use]
    pub fn package(&self, id: PkgId) -> &Package {
        &self.packages[id]
    }

    pub fn child(&self, pkg: PkgId, name: &Name) -> Option<PkgChild> {
        self.packages[pkg].children.get(name).copied()
    }

    pub fn children(&self, pkg: PkgId) -> impl Iterator<Item = (&Name, PkgChild)> {
        self.packages[pkg].children.iter().map(|(n, c)| (n, *c))
    }

    /// The subpackage `name` of `pkg`, created if absent. Fails when the
    /// slot is already taken by a declaration.
    pub fn subpackage(&mut self, pkg: PkgId, name: &Name) -> Result<PkgId, DeclId> {
        if let Some(child) = self.packages[pkg].children.get(name).copied() {
            return match child {
                PkgChild::Package(sub) => Ok(sub),
                PkgChild::Decl(decl) => Err(decl),
            };
        }
        let sub = self.packages.alloc(Package {
            name: name.clone(),
            children: HashMap::new(),
        });
        self.packages[pkg]
            .children
            .insert(name.clone(), PkgChild::Package(sub));
        Ok(sub)
    }

    pub fn insert_decl(&mut self, pkg: PkgId, name: Name, decl: DeclId) -> Option<PkgChild> {
        self.packages[pkg].children.insert(name, PkgChild::Decl(decl))
    }
}

impl Default for PackageTree {
    fn default() -> Self {
        Self::new()
    }
}
