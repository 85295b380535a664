use serde::Serialize;

use crate::ast::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NamespaceId(pub u32);

impl NamespaceId {
    pub const ROOT: NamespaceId = NamespaceId(0);
}

#[derive(Debug, Clone, Serialize)]
pub struct Namespace {
    pub name:          String,
    pub parent:        Option<NamespaceId>,
    pub children:      Vec<NamespaceId>,
    pub interfaces:    Vec<TypeId>,
    pub sequenceables: Vec<TypeId>,
}

/// Dotted package names as a tree; node 0 is the unnamed root.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceTree {
    nodes: Vec<Namespace>,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    pub fn new() -> NamespaceTree {
        NamespaceTree {
            nodes: vec![Namespace {
                name:          String::new(),
                parent:        None,
                children:      Vec::new(),
                interfaces:    Vec::new(),
                sequenceables: Vec::new(),
            }],
        }
    }

    pub fn get(&self, id: NamespaceId) -> &Namespace {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NamespaceId) -> &mut Namespace {
        &mut self.nodes[id.0 as usize]
    }

    /// Returns the node for `a.b.c`, creating missing segments.
    pub fn intern(&mut self, package: &str) -> NamespaceId {
        let mut current = NamespaceId::ROOT;
        for segment in package.split('.').filter(|s| !s.is_empty()) {
            current = match self.child(current, segment) {
                Some(child) => child,
                None => {
                    let id = NamespaceId(self.nodes.len() as u32);
                    self.nodes.push(Namespace {
                        name:          segment.to_owned(),
                        parent:        Some(current),
                        children:      Vec::new(),
                        interfaces:    Vec::new(),
                        sequenceables: Vec::new(),
                    });
                    self.get_mut(current).children.push(id);
                    id
                }
            };
        }
        current
    }

    pub fn find(&self, package: &str) -> Option<NamespaceId> {
        package
            .split('.')
            .filter(|s| !s.is_empty())
            .try_fold(NamespaceId::ROOT, |current, segment| self.child(current, segment))
    }

    fn child(&self, parent: NamespaceId, name: &str) -> Option<NamespaceId> {
        self.get(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).name == name)
    }

    /// Segment names from the root down to `id`.
    pub fn segments(&self, id: NamespaceId) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let namespace = self.get(node);
            if namespace.parent.is_some() {
                segments.push(namespace.name.as_str());
            }
            current = namespace.parent;
        }
        segments.reverse();
        segments
    }

    pub fn full_name(&self, id: NamespaceId) -> String {
        self.segments(id).join(".")
    }

    pub fn add_interface(&mut self, id: NamespaceId, ty: TypeId) {
        let interfaces = &mut self.get_mut(id).interfaces;
        if !interfaces.contains(&ty) {
            interfaces.push(ty);
        }
    }

    pub fn add_sequenceable(&mut self, id: NamespaceId, ty: TypeId) {
        let sequenceables = &mut self.get_mut(id).sequenceables;
        if !sequenceables.contains(&ty) {
            sequenceables.push(ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_prefixes_share_nodes() {
        let mut tree = NamespaceTree::new();
        let a = tree.intern("ohos.hdi.foo.v1_0");
        let b = tree.intern("ohos.hdi.bar.v1_0");
        let again = tree.intern("ohos.hdi.foo.v1_0");

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(tree.full_name(a), "ohos.hdi.foo.v1_0");
        assert_eq!(tree.segments(b), ["ohos", "hdi", "bar", "v1_0"]);
        assert_eq!(tree.find("ohos.hdi.bar.v1_0"), Some(b));
        assert_eq!(tree.find("ohos.hdi.baz"), None);

        let hdi = tree.find("ohos.hdi").unwrap();
        assert_eq!(tree.get(hdi).children.len(), 2);
        assert_eq!(tree.get(tree.get(a).parent.unwrap()).name, "foo");
    }
}
