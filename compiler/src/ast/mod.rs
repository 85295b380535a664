//! In-memory model of compiled units.
//!
//! Every type node of a run lives in one [`TypeArena`]; units, namespaces and
//! other types refer to nodes by [`TypeId`]. Each [`Ast`] keeps its own intern
//! table, so repeated spellings of a composite inside one unit resolve to the
//! same node.

pub mod dump;
pub mod interface;
pub mod namespace;
pub mod types;

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

pub use interface::*;
pub use namespace::*;
pub use types::*;

use crate::package::{split_full_name, Version};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line:   usize,
    pub column: usize,
}

/// Bracketed attributes such as `[oneway, callback]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Attributes {
    pub oneway:   bool,
    pub callback: bool,
    pub full:     bool,
    pub lite:     bool,
}

impl Attributes {
    /// `lite` items only exist in kernel builds and `full` items only in user builds.
    pub fn visible(&self, kernel: bool) -> bool {
        if kernel {
            !self.full
        } else {
            !self.lite
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AstKind {
    Interface,
    Callback,
    Types,
    Sequenceable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AstId(pub u32);

/// One compilation unit.
#[derive(Debug, Clone, Serialize)]
pub struct Ast {
    pub kind:             AstKind,
    /// File stem, e.g. `ISample` or `Types`.
    pub name:             String,
    pub package:          String,
    pub namespace:        NamespaceId,
    pub file_path:        PathBuf,
    pub license:          Option<String>,
    pub version:          Version,
    #[serde(skip)]
    pub types:            IndexMap<TypeKey, TypeId>,
    /// Locally declared enums, structs and unions in declaration order.
    pub type_definitions: Vec<TypeId>,
    pub interface:        Option<TypeId>,
    pub imports:          IndexMap<String, AstId>,
}

impl Ast {
    pub fn new(
        kind: AstKind,
        name: &str,
        package: &str,
        namespace: NamespaceId,
        file_path: PathBuf,
        version: Version,
    ) -> Ast {
        let types = PrimitiveKind::ALL
            .iter()
            .map(|&p| (TypeKey::Primitive(p), TypeId(p as u32)))
            .collect();
        Ast {
            kind,
            name: name.to_owned(),
            package: package.to_owned(),
            namespace,
            file_path,
            license: None,
            version,
            types,
            type_definitions: Vec::new(),
            interface: None,
            imports: IndexMap::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    /// Returns the node for `key`, allocating it with `make` on first use.
    pub fn intern(
        &mut self,
        arena: &mut TypeArena,
        key: TypeKey,
        make: impl FnOnce() -> TypeKind,
    ) -> TypeId {
        if let Some(&id) = self.types.get(&key) {
            return id;
        }
        let id = arena.alloc(make());
        self.types.insert(key, id);
        id
    }

    /// Makes a node from another unit visible here under its own key.
    pub fn register(&mut self, key: TypeKey, id: TypeId) {
        self.types.entry(key).or_insert(id);
    }

    /// Resolves a bare or fully qualified type name. Bare names prefer this
    /// unit's own namespace.
    pub fn lookup(&self, namespaces: &NamespaceTree, name: &str) -> Option<TypeId> {
        if let Some((package, short)) = split_full_name(name) {
            let namespace = namespaces.find(package)?;
            return self
                .types
                .get(&TypeKey::Named {
                    namespace,
                    name: short.to_owned(),
                })
                .copied();
        }
        let local = TypeKey::Named {
            namespace: self.namespace,
            name:      name.to_owned(),
        };
        if let Some(&id) = self.types.get(&local) {
            return Some(id);
        }
        self.types.iter().find_map(|(key, &id)| match key {
            TypeKey::Named { name: n, .. } if n == name => Some(id),
            _ => None,
        })
    }

    pub fn is_interface_unit(&self) -> bool {
        matches!(self.kind, AstKind::Interface | AstKind::Callback)
    }
}

/// Every unit compiled in one run, in compile order.
#[derive(Debug, Clone, Default)]
pub struct AstModule {
    pub types:      TypeArena,
    pub namespaces: NamespaceTree,
    asts:           Vec<Ast>,
    index:          IndexMap<String, AstId>,
}

impl AstModule {
    pub fn new() -> AstModule {
        AstModule::default()
    }

    /// Adds a unit, or returns the id of the unit already known under the same name.
    pub fn add(&mut self, ast: Ast) -> AstId {
        let full_name = ast.full_name();
        if let Some(&id) = self.index.get(&full_name) {
            return id;
        }
        let id = AstId(self.asts.len() as u32);
        self.asts.push(ast);
        self.index.insert(full_name, id);
        id
    }

    pub fn get(&self, id: AstId) -> &Ast {
        &self.asts[id.0 as usize]
    }

    pub fn find(&self, full_name: &str) -> Option<AstId> {
        self.index.get(full_name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ast> {
        self.asts.iter()
    }

    pub fn len(&self) -> usize {
        self.asts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asts.is_empty()
    }

    pub fn interface_of(&self, ast: &Ast) -> Option<&InterfaceType> {
        ast.interface.and_then(|id| self.types.as_interface(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_same_node() {
        let mut module = AstModule::new();
        let ns = module.namespaces.intern("ohos.hdi.sample.v1_0");
        let mut ast = Ast::new(
            AstKind::Types,
            "Types",
            "ohos.hdi.sample.v1_0",
            ns,
            PathBuf::from("Types.idl"),
            Version { major: 1, minor: 0 },
        );
        let int = module.types.primitive(PrimitiveKind::Int);
        let first = ast.intern(&mut module.types, TypeKey::List(int), || TypeKind::List(int));
        let second = ast.intern(&mut module.types, TypeKey::List(int), || TypeKind::List(int));
        assert_eq!(first, second);

        let before = module.types.len();
        ast.intern(&mut module.types, TypeKey::Array(int), || TypeKind::Array(int));
        assert_eq!(module.types.len(), before + 1);
    }

    #[test]
    fn lookup_prefers_local_namespace() {
        let mut module = AstModule::new();
        let local = module.namespaces.intern("a.v1_0");
        let other = module.namespaces.intern("b.v1_0");
        let mut ast = Ast::new(
            AstKind::Types,
            "Types",
            "a.v1_0",
            local,
            PathBuf::from("Types.idl"),
            Version::default(),
        );
        let make = |namespace| {
            TypeKind::Sequenceable(SequenceableType {
                name: "Buf".to_owned(),
                namespace,
            })
        };
        let remote = module.types.alloc(make(other));
        let mine = module.types.alloc(make(local));
        ast.register(TypeKey::Named { namespace: other, name: "Buf".to_owned() }, remote);
        ast.register(TypeKey::Named { namespace: local, name: "Buf".to_owned() }, mine);

        assert_eq!(ast.lookup(&module.namespaces, "Buf"), Some(mine));
        assert_eq!(ast.lookup(&module.namespaces, "b.v1_0.Buf"), Some(remote));
        assert_eq!(ast.lookup(&module.namespaces, "c.v1_0.Buf"), None);
        assert_eq!(ast.lookup(&module.namespaces, "Missing"), None);
    }

    #[test]
    fn attribute_visibility() {
        let lite = Attributes { lite: true, ..Attributes::default() };
        let full = Attributes { full: true, ..Attributes::default() };
        assert!(lite.visible(true) && !lite.visible(false));
        assert!(full.visible(false) && !full.visible(true));
        assert!(Attributes::default().visible(true));
    }
}
