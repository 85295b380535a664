use std::collections::HashMap;

use crate::{
    ast::{Ast, Position, TypeArena, TypeId, TypeKind},
    error::{Diagnostic, DiagnosticKind, Diagnostics},
    utils::quote,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Whole-unit checks that need every declaration in place. Records problems in
/// `diagnostics` and returns false if there were any.
pub fn verify_ast(types: &TypeArena, ast: &Ast, diagnostics: &mut Diagnostics) -> bool {
    let before = diagnostics.len();
    let mut report = |pos: Position, message: String| {
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::Semantic,
            file: ast.file_path.clone(),
            line: pos.line,
            column: pos.column,
            message,
        })
    };

    // Structs and unions must not contain themselves by value. Containers break
    // the cycle because their storage is out of line.
    fn check_recursion(
        types: &TypeArena,
        id: TypeId,
        state: &mut HashMap<TypeId, Visit>,
    ) -> Result<(), TypeId> {
        let members = match types.get(id) {
            TypeKind::Struct(s) | TypeKind::Union(s) => &s.members,
            _ => return Ok(()),
        };
        match state.get(&id) {
            Some(Visit::Active) => return Err(id),
            Some(Visit::Done) => return Ok(()),
            None => {}
        }
        state.insert(id, Visit::Active);
        for member in members {
            check_recursion(types, member.ty, state)?;
        }
        state.insert(id, Visit::Done);
        Ok(())
    }

    let mut state = HashMap::new();
    let mut recursive = false;
    for &id in &ast.type_definitions {
        if let Err(culprit) = check_recursion(types, id, &mut state) {
            recursive = true;
            let kind = types.get(culprit);
            let pos = match kind {
                TypeKind::Struct(s) | TypeKind::Union(s) => s.pos,
                _ => Position::default(),
            };
            report(
                pos,
                format!("recursive nesting of {} is not allowed", quote(kind.name().unwrap_or_default())),
            );
            // Everything on the cycle is reported through its first member.
            for visit in state.values_mut() {
                if *visit == Visit::Active {
                    *visit = Visit::Done;
                }
            }
        }
    }

    // Sizes are only meaningful once no type contains itself.
    if !recursive {
        for &id in &ast.type_definitions {
            if let TypeKind::Union(u) = types.get(id) {
                for member in &u.members {
                    if types.fixed_size(member.ty).is_none() {
                        report(
                            member.pos,
                            format!(
                                "union member {} of {} must be plain data, {} is not",
                                quote(&member.name),
                                quote(&u.name),
                                quote(&types.display_name(member.ty))
                            ),
                        );
                    }
                }
            }
        }
    }

    diagnostics.len() == before
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        ast::{AstKind, Attributes, Member, NamespaceId, PrimitiveKind, StructType},
        package::Version,
    };

    fn unit() -> Ast {
        Ast::new(
            AstKind::Types,
            "Types",
            "a.v1_0",
            NamespaceId::ROOT,
            PathBuf::from("a/v1_0/Types.idl"),
            Version { major: 1, minor: 0 },
        )
    }

    fn body(name: &str, members: Vec<(&str, TypeId)>) -> StructType {
        StructType {
            name:      name.to_owned(),
            namespace: NamespaceId::ROOT,
            unit:      "Types".to_owned(),
            members:   members
                .into_iter()
                .map(|(n, ty)| Member {
                    name: n.to_owned(),
                    ty,
                    pos: Position::default(),
                })
                .collect(),
            attrs:     Attributes::default(),
            pos:       Position { line: 3, column: 8 },
        }
    }

    #[test]
    fn self_containing_struct_is_rejected() {
        let mut types = TypeArena::new();
        let int = types.primitive(PrimitiveKind::Int);
        let node = types.alloc(TypeKind::Struct(body("Node", vec![("v", int)])));
        if let TypeKind::Struct(s) = types.get_mut(node) {
            s.members.push(Member {
                name: "next".to_owned(),
                ty:   node,
                pos:  Position::default(),
            });
        }
        let mut ast = unit();
        ast.type_definitions.push(node);

        let mut diagnostics = Diagnostics::new();
        assert!(!verify_ast(&types, &ast, &mut diagnostics));
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.line, 3);
        assert!(first.message.contains("\"Node\""));
    }

    #[test]
    fn list_breaks_recursion() {
        let mut types = TypeArena::new();
        let node = types.alloc(TypeKind::Struct(body("Node", vec![])));
        let list = types.alloc(TypeKind::List(node));
        if let TypeKind::Struct(s) = types.get_mut(node) {
            s.members.push(Member {
                name: "children".to_owned(),
                ty:   list,
                pos:  Position::default(),
            });
        }
        let mut ast = unit();
        ast.type_definitions.push(node);
        assert!(verify_ast(&types, &ast, &mut Diagnostics::new()));
    }

    #[test]
    fn union_members_must_be_plain() {
        let mut types = TypeArena::new();
        let int = types.primitive(PrimitiveKind::Int);
        let string = types.primitive(PrimitiveKind::String);
        let ok = types.alloc(TypeKind::Union(body("Ok", vec![("a", int)])));
        let bad = types.alloc(TypeKind::Union(body("Bad", vec![("a", int), ("s", string)])));
        let mut ast = unit();
        ast.type_definitions.extend([ok, bad]);

        let mut diagnostics = Diagnostics::new();
        assert!(!verify_ast(&types, &ast, &mut diagnostics));
        assert_eq!(diagnostics.len(), 1);
    }
}
