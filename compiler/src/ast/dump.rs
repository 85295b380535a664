use std::path::Path;

use serde::Serialize;

use crate::{
    ast::{Ast, AstKind, AstModule, Attributes, Direction, TypeId, TypeKind},
    error::{HdiError, Result},
    package::Version,
};

fn attrs_text(attrs: &Attributes) -> String {
    let names: Vec<&str> = [
        (attrs.oneway, "oneway"),
        (attrs.callback, "callback"),
        (attrs.full, "full"),
        (attrs.lite, "lite"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|&(_, name)| name)
    .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!("[{}] ", names.join(", "))
    }
}

fn kind_text(kind: AstKind) -> &'static str {
    match kind {
        AstKind::Interface => "interface",
        AstKind::Callback => "callback",
        AstKind::Types => "types",
        AstKind::Sequenceable => "sequenceable",
    }
}

/// Human-readable dump of one unit, close to the IDL it came from.
pub fn dump_text(module: &AstModule, ast: &Ast) -> String {
    let types = &module.types;
    let mut out: Vec<String> = Vec::new();

    out.push(format!("// {} ({})", ast.full_name(), kind_text(ast.kind)));
    out.push(format!("// file: {}", ast.file_path.display()));
    if let Some(license) = &ast.license {
        out.push(license.clone());
    }
    out.push(format!("package {}; // version {}", ast.package, ast.version));

    if !ast.imports.is_empty() {
        out.push(String::new());
        for (name, &id) in &ast.imports {
            let keyword = match module.get(id).kind {
                AstKind::Sequenceable => "sequenceable",
                _ => "import",
            };
            out.push(format!("{} {};", keyword, name));
        }
    }

    for &id in &ast.type_definitions {
        out.push(String::new());
        match types.get(id) {
            TypeKind::Enum(e) => {
                out.push(format!("{}enum {} : {} {{", attrs_text(&e.attrs), e.name, e.base.idl_name()));
                for member in &e.members {
                    out.push(format!("    {} = {},", member.name, member.value));
                }
                out.push("};".to_owned());
            }
            TypeKind::Struct(s) | TypeKind::Union(s) => {
                let keyword = if matches!(types.get(id), TypeKind::Union(_)) { "union" } else { "struct" };
                out.push(format!("{}{} {} {{", attrs_text(&s.attrs), keyword, s.name));
                for member in &s.members {
                    out.push(format!("    {} {};", types.display_name(member.ty), member.name));
                }
                out.push("};".to_owned());
            }
            _ => {}
        }
    }

    if let Some(interface) = module.interface_of(ast) {
        out.push(String::new());
        out.push(format!("{}interface {} {{", attrs_text(&interface.attrs), interface.name));
        for (id, method) in interface.commands() {
            let params: Vec<String> = method
                .params
                .iter()
                .map(|p| {
                    let direction = match p.direction {
                        Direction::In => "in",
                        Direction::Out => "out",
                    };
                    format!("[{}] {} {}", direction, types.display_name(p.ty), p.name)
                })
                .collect();
            out.push(format!(
                "    /* {} */ {}{}({});",
                id,
                attrs_text(&method.attrs),
                method.name,
                params.join(", ")
            ));
        }
        out.push("}".to_owned());
    }

    out.push(String::new());
    out.join("\n")
}

#[derive(Serialize)]
struct AstView<'a> {
    name:      String,
    kind:      AstKind,
    file:      &'a Path,
    package:   &'a str,
    version:   Version,
    license:   Option<&'a str>,
    imports:   Vec<&'a str>,
    types:     Vec<TypeView>,
    interface: Option<InterfaceView<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TypeView {
    Enum {
        name:    String,
        base:    &'static str,
        members: Vec<(String, i128)>,
    },
    Struct {
        name:    String,
        members: Vec<MemberView>,
    },
    Union {
        name:    String,
        members: Vec<MemberView>,
    },
}

#[derive(Serialize)]
struct MemberView {
    name: String,
    #[serde(rename = "type")]
    ty:   String,
}

#[derive(Serialize)]
struct InterfaceView<'a> {
    name:     &'a str,
    attrs:    Attributes,
    methods:  Vec<MethodView<'a>>,
}

#[derive(Serialize)]
struct MethodView<'a> {
    id:     u32,
    name:   &'a str,
    attrs:  Attributes,
    params: Vec<ParamView<'a>>,
}

#[derive(Serialize)]
struct ParamView<'a> {
    name:      &'a str,
    direction: Direction,
    #[serde(rename = "type")]
    ty:        String,
}

fn members(module: &AstModule, members: &[crate::ast::Member]) -> Vec<MemberView> {
    members
        .iter()
        .map(|m| MemberView {
            name: m.name.clone(),
            ty:   module.types.display_name(m.ty),
        })
        .collect()
}

fn type_view(module: &AstModule, id: TypeId) -> Option<TypeView> {
    match module.types.get(id) {
        TypeKind::Enum(e) => Some(TypeView::Enum {
            name:    e.name.clone(),
            base:    e.base.idl_name(),
            members: e.members.iter().map(|m| (m.name.clone(), m.value)).collect(),
        }),
        TypeKind::Struct(s) => Some(TypeView::Struct {
            name:    s.name.clone(),
            members: members(module, &s.members),
        }),
        TypeKind::Union(u) => Some(TypeView::Union {
            name:    u.name.clone(),
            members: members(module, &u.members),
        }),
        _ => None,
    }
}

fn ast_view<'a>(module: &'a AstModule, ast: &'a Ast) -> AstView<'a> {
    let interface = module.interface_of(ast).map(|interface| InterfaceView {
        name:    &interface.name,
        attrs:   interface.attrs,
        methods: interface
            .commands()
            .map(|(id, method)| MethodView {
                id,
                name: &method.name,
                attrs: method.attrs,
                params: method
                    .params
                    .iter()
                    .map(|p| ParamView {
                        name:      &p.name,
                        direction: p.direction,
                        ty:        module.types.display_name(p.ty),
                    })
                    .collect(),
            })
            .collect(),
    });
    AstView {
        name: ast.full_name(),
        kind: ast.kind,
        file: &ast.file_path,
        package: &ast.package,
        version: ast.version,
        license: ast.license.as_deref(),
        imports: ast.imports.keys().map(String::as_str).collect(),
        types: ast.type_definitions.iter().filter_map(|&id| type_view(module, id)).collect(),
        interface,
    }
}

/// JSON array with one object per compiled unit, in compile order.
pub fn dump_json(module: &AstModule) -> Result<String> {
    let views: Vec<AstView> = module
        .iter()
        .filter(|ast| ast.kind != AstKind::Sequenceable)
        .map(|ast| ast_view(module, ast))
        .collect();
    serde_json::to_string_pretty(&views).map_err(|e| HdiError::Generate(e.to_string()))
}
