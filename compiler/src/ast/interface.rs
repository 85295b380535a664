use serde::Serialize;

use crate::ast::{
    namespace::NamespaceId,
    types::{TypeArena, TypeId},
    Attributes,
    Position,
};

/// Reserved name of the synthesized version query.
pub const VERSION_METHOD: &str = "GetVersion";
pub const VERSION_MAJOR_PARAM: &str = "majorVer";
pub const VERSION_MINOR_PARAM: &str = "minorVer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name:      String,
    pub direction: Direction,
    pub ty:        TypeId,
    pub pos:       Position,
}

impl Parameter {
    pub fn is_out(&self) -> bool {
        self.direction == Direction::Out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Method {
    pub name:        String,
    pub attrs:       Attributes,
    /// Wire order. Never reordered after parsing.
    pub params:      Vec<Parameter>,
    pub pos:         Position,
    pub synthesized: bool,
}

impl Method {
    pub fn in_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| !p.is_out())
    }

    pub fn out_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_out())
    }

    /// `out` strings, arrays and lists, in declaration order.
    pub fn capacity_params<'a>(&'a self, types: &'a TypeArena) -> impl Iterator<Item = &'a Parameter> {
        self.out_params().filter(move |p| types.needs_capacity(p.ty))
    }

    /// Whether the request carries the out-of-band length flag.
    pub fn needs_capacity_flag(&self, types: &TypeArena) -> bool {
        self.capacity_params(types).next().is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceType {
    pub name:         String,
    pub namespace:    NamespaceId,
    pub unit:         String,
    pub attrs:        Attributes,
    pub methods:      Vec<Method>,
    /// Set once the interface is imported, making it legal as a parameter type.
    pub serializable: bool,
    pub pos:          Position,
}

impl InterfaceType {
    pub fn is_callback(&self) -> bool {
        self.attrs.callback
    }

    pub fn is_oneway(&self, method: &Method) -> bool {
        self.attrs.oneway || method.attrs.oneway
    }

    /// Methods with their command ids. Ids follow declaration order, so the
    /// version method always gets the highest one.
    pub fn commands(&self) -> impl Iterator<Item = (u32, &Method)> {
        self.methods.iter().enumerate().map(|(id, m)| (id as u32, m))
    }

    pub fn user_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|m| !m.synthesized)
    }

    pub fn version_method(&self) -> Option<&Method> {
        self.methods.last().filter(|m| m.synthesized)
    }

    /// Appends `GetVersion([out] unsigned int majorVer, [out] unsigned int minorVer)`.
    pub fn add_version_method(&mut self, uint: TypeId, pos: Position) {
        let param = |name: &str| Parameter {
            name: name.to_owned(),
            direction: Direction::Out,
            ty: uint,
            pos,
        };
        self.methods.push(Method {
            name:        VERSION_METHOD.to_owned(),
            attrs:       Attributes::default(),
            params:      vec![param(VERSION_MAJOR_PARAM), param(VERSION_MINOR_PARAM)],
            pos,
            synthesized: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::PrimitiveKind;

    #[test]
    fn version_method_is_last() {
        let mut types = TypeArena::new();
        let int = types.primitive(PrimitiveKind::Int);
        let string = types.primitive(PrimitiveKind::String);
        let list = types.alloc(crate::ast::types::TypeKind::List(int));

        let mut interface = InterfaceType {
            name:         "ISample".to_owned(),
            namespace:    NamespaceId::ROOT,
            unit:         "ISample".to_owned(),
            attrs:        Attributes::default(),
            methods:      vec![Method {
                name:        "Query".to_owned(),
                attrs:       Attributes::default(),
                params:      vec![
                    Parameter {
                        name:      "id".to_owned(),
                        direction: Direction::In,
                        ty:        int,
                        pos:       Position::default(),
                    },
                    Parameter {
                        name:      "name".to_owned(),
                        direction: Direction::Out,
                        ty:        string,
                        pos:       Position::default(),
                    },
                    Parameter {
                        name:      "values".to_owned(),
                        direction: Direction::Out,
                        ty:        list,
                        pos:       Position::default(),
                    },
                ],
                pos:         Position::default(),
                synthesized: false,
            }],
            serializable: false,
            pos:          Position::default(),
        };
        interface.add_version_method(types.primitive(PrimitiveKind::UInt), Position::default());

        let commands: Vec<_> = interface.commands().map(|(id, m)| (id, m.name.as_str())).collect();
        assert_eq!(commands, [(0, "Query"), (1, VERSION_METHOD)]);
        assert_eq!(interface.user_methods().count(), 1);

        let query = &interface.methods[0];
        assert!(query.needs_capacity_flag(&types));
        let names: Vec<_> = query.capacity_params(&types).map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["name", "values"]);

        let version = interface.version_method().unwrap();
        assert_eq!(version.out_params().count(), 2);
        assert!(!version.needs_capacity_flag(&types));
    }
}
