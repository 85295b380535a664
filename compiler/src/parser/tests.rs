use std::path::{Path, PathBuf};

use crate::{
    ast::{dump, AstKind, AstModule, TypeKind, VERSION_METHOD},
    error::{DiagnosticKind, Diagnostics},
    options::{Language, Options, PackageRoot},
    parser::Parser,
};

const TYPES: &str = "
/* Copyright (c) Sample Authors */
package ohos.hdi.sample.v1_0;

enum Color : unsigned char { RED, GREEN = 4, BLUE, ALIAS = RED };

struct Point {
    int x;
    int y;
};

union Number {
    int i;
    double d;
};

struct Shape {
    String name;
    List<Point> points;
    List<int> ids;
    Map<String, List<int>> tags;
    Color color;
};
";

const SAMPLE: &str = "
package ohos.hdi.sample.v1_0;

import ohos.hdi.sample.v1_0.Types;

interface ISample {
    Ping([in] String message, [out] String reply);
    Area([in] Shape shape, [out] double area);
    [oneway] Notify([in] int code);
}
";

fn parse(module: &mut AstModule, options: &Options, path: &str, source: &str) -> (bool, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let ok = Parser::new(options, module, &mut diagnostics).parse_source(Path::new(path), source);
    (ok, diagnostics)
}

fn parse_ok(module: &mut AstModule, path: &str, source: &str) {
    let (ok, diagnostics) = parse(module, &Options::default(), path, source);
    assert!(ok, "{}", diagnostics);
}

fn sample_module() -> AstModule {
    let mut module = AstModule::new();
    parse_ok(&mut module, "ohos/hdi/sample/v1_0/Types.idl", TYPES);
    parse_ok(&mut module, "ohos/hdi/sample/v1_0/ISample.idl", SAMPLE);
    module
}

#[test]
fn types_unit() {
    let module = sample_module();
    let id = module.find("ohos.hdi.sample.v1_0.Types").unwrap();
    let ast = module.get(id);
    assert_eq!(ast.kind, AstKind::Types);
    assert_eq!(ast.version.to_string(), "1.0");
    assert_eq!(ast.license.as_deref(), Some("/* Copyright (c) Sample Authors */"));
    assert_eq!(ast.type_definitions.len(), 4);

    match module.types.get(ast.type_definitions[0]) {
        TypeKind::Enum(color) => {
            let values: Vec<_> = color.members.iter().map(|m| (m.name.as_str(), m.value)).collect();
            assert_eq!(values, [("RED", 0), ("GREEN", 4), ("BLUE", 5), ("ALIAS", 0)]);
        }
        other => panic!("expected an enum, found {:?}", other),
    }
}

#[test]
fn composites_are_interned_per_unit() {
    let module = sample_module();
    let ast = module.get(module.find("ohos.hdi.sample.v1_0.Types").unwrap());
    let shape = match module.types.get(ast.type_definitions[3]) {
        TypeKind::Struct(s) => s,
        other => panic!("expected a struct, found {:?}", other),
    };
    let ids = shape.members[2].ty;
    let tag_values = match module.types.get(shape.members[3].ty) {
        TypeKind::Map { value, .. } => *value,
        other => panic!("expected a map, found {:?}", other),
    };
    assert_eq!(ids, tag_values);
    assert_eq!(module.types.display_name(shape.members[3].ty), "Map<String, List<int>>");
}

#[test]
fn interface_unit_gets_version_method_last() {
    let module = sample_module();
    let ast = module.get(module.find("ohos.hdi.sample.v1_0.ISample").unwrap());
    assert_eq!(ast.kind, AstKind::Interface);
    assert!(ast.imports.contains_key("ohos.hdi.sample.v1_0.Types"));

    let interface = module.interface_of(ast).unwrap();
    let commands: Vec<_> = interface.commands().map(|(id, m)| (id, m.name.as_str())).collect();
    assert_eq!(
        commands,
        [(0, "Ping"), (1, "Area"), (2, "Notify"), (3, VERSION_METHOD)]
    );
    assert!(interface.is_oneway(&interface.methods[2]));
}

#[test]
fn recovery_reports_independent_errors() {
    let source = "
package ohos.hdi.sample.v1_0;

struct Broken {
    int a
    int b;
    Missing c;
};

enum Empty { };

struct Fine { int x; };
";
    let mut module = AstModule::new();
    let (ok, diagnostics) = parse(&mut module, &Options::default(), "Types.idl", source);
    assert!(!ok);
    assert!(diagnostics.len() >= 3, "{}", diagnostics);
    assert!(diagnostics.has_kind(DiagnosticKind::Syntax));
    assert!(diagnostics.has_kind(DiagnosticKind::Semantic));
    assert!(module.is_empty());
}

#[test]
fn failed_unit_leaves_arena_untouched() {
    let mut module = AstModule::new();
    let before = module.types.len();
    let (ok, _) = parse(
        &mut module,
        &Options::default(),
        "Types.idl",
        "package a.v1_0; struct A { List<int> xs; Unknown u; };",
    );
    assert!(!ok);
    assert_eq!(module.types.len(), before);
}

#[test]
fn unknown_character_is_lexical() {
    let mut module = AstModule::new();
    let (ok, diagnostics) = parse(
        &mut module,
        &Options::default(),
        "Types.idl",
        "package a.v1_0; struct A { int x; } @",
    );
    assert!(!ok);
    assert!(diagnostics.has_kind(DiagnosticKind::Lexical));
}

#[test]
fn direction_rules() {
    let mut module = AstModule::new();
    parse_ok(
        &mut module,
        "a/v1_0/ICallback.idl",
        "package a.v1_0; [callback] interface ICallback { OnEvent([in] int code); }",
    );
    parse_ok(
        &mut module,
        "a/v1_0/IChild.idl",
        "package a.v1_0; interface IChild { Get([out] int value); }",
    );

    let source = "
package a.v1_0;
import a.v1_0.ICallback;
import a.v1_0.IChild;
interface IService {
    Register([in] ICallback cb);
    Bad([in] IChild child);
    AlsoBad([out] ICallback cb);
    [oneway] Fire([in] int a, [out] int b);
}
";
    let (ok, diagnostics) = parse(&mut module, &Options::default(), "a/v1_0/IService.idl", source);
    assert!(!ok);
    assert_eq!(diagnostics.len(), 3, "{}", diagnostics);
    let lines: Vec<_> = diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, [7, 8, 9]);
}

#[test]
fn imported_interface_becomes_serializable() {
    let mut module = AstModule::new();
    parse_ok(
        &mut module,
        "a/v1_0/ICallback.idl",
        "package a.v1_0; [callback] interface ICallback { OnEvent([in] int code); }",
    );
    parse_ok(
        &mut module,
        "a/v1_0/IService.idl",
        "package a.v1_0; import a.v1_0.ICallback; interface IService { Register([in] ICallback cb); }",
    );
    let callback = module.get(module.find("a.v1_0.ICallback").unwrap());
    assert_eq!(callback.kind, AstKind::Callback);
    assert!(module.interface_of(callback).unwrap().serializable);
}

#[test]
fn package_must_match_directory() {
    let options = Options {
        roots: vec![PackageRoot {
            package: "ohos.hdi".to_owned(),
            path:    PathBuf::from("idl"),
        }],
        ..Options::default()
    };
    let mut module = AstModule::new();
    let (ok, diagnostics) = parse(
        &mut module,
        &options,
        "idl/other/v1_0/Types.idl",
        "package ohos.hdi.sample.v1_0; struct A { int x; };",
    );
    assert!(!ok);
    assert!(diagnostics.has_kind(DiagnosticKind::Semantic));

    let (ok, diagnostics) = parse(
        &mut module,
        &options,
        "idl/sample/v1_0/Types.idl",
        "package ohos.hdi.sample.v1_0; struct A { int x; };",
    );
    assert!(ok, "{}", diagnostics);
}

#[test]
fn structural_rules() {
    let mut module = AstModule::new();
    let (ok, diagnostics) = parse(
        &mut module,
        &Options::default(),
        "a/v1_0/IFoo.idl",
        "package a.v1_0; struct S { int x; }; interface IFoo { Get([out] int v); }",
    );
    assert!(!ok);
    assert!(diagnostics.has_kind(DiagnosticKind::Structural));

    let (ok, diagnostics) = parse(
        &mut module,
        &Options::default(),
        "a/v1_0/IBar.idl",
        "package a.v1_0; interface IBar { }",
    );
    assert!(!ok);
    assert!(diagnostics.has_kind(DiagnosticKind::Structural));

    let (ok, _) = parse(&mut module, &Options::default(), "a/v1_0/Empty.idl", "package a.v1_0;");
    assert!(!ok);
}

#[test]
fn enum_values_must_fit_base() {
    let mut module = AstModule::new();
    let (ok, diagnostics) = parse(
        &mut module,
        &Options::default(),
        "Types.idl",
        "package a.v1_0; enum E : unsigned char { A = 255, B }; enum F : byte { N = -129 };",
    );
    assert!(!ok);
    assert_eq!(diagnostics.len(), 2, "{}", diagnostics);
}

#[test]
fn oversized_enum_literal_is_reported() {
    let mut module = AstModule::new();
    let (ok, diagnostics) = parse(
        &mut module,
        &Options::default(),
        "Types.idl",
        "package a.v1_0; enum Big : long { A = 0x7fffffffffffffffffffffffffffffff, B };",
    );
    assert!(!ok);
    assert_eq!(diagnostics.len(), 1, "{}", diagnostics);
    assert!(diagnostics.has_kind(DiagnosticKind::Semantic));
}

#[test]
fn unsigned_long_enum_keeps_its_full_range() {
    let mut module = AstModule::new();
    parse_ok(
        &mut module,
        "a/v1_0/Types.idl",
        "package a.v1_0; enum Big : unsigned long { LOW, HIGH = 0xFFFFFFFFFFFFFFFF };",
    );
    let ast = module.get(module.find("a.v1_0.Types").unwrap());
    match module.types.get(ast.type_definitions[0]) {
        TypeKind::Enum(big) => {
            let values: Vec<_> = big.members.iter().map(|m| m.value).collect();
            assert_eq!(values, [0, u64::MAX as i128]);
        }
        other => panic!("expected an enum, found {:?}", other),
    }
}

#[test]
fn language_restrictions() {
    let c = Options {
        language: Some(Language::C),
        ..Options::default()
    };
    let mut module = AstModule::new();
    let (ok, _) = parse(
        &mut module,
        &c,
        "Types.idl",
        "package a.v1_0; struct S { Map<int, int> m; };",
    );
    assert!(!ok);

    let java = Options {
        language: Some(Language::Java),
        ..Options::default()
    };
    let (ok, _) = parse(
        &mut module,
        &java,
        "Types.idl",
        "package a.v1_0; union U { int a; float b; };",
    );
    assert!(!ok);

    let (ok, diagnostics) = parse(
        &mut module,
        &java,
        "Types.idl",
        "package a.v1_0; struct S { unsigned int a; List<String> b; };",
    );
    assert!(ok, "{}", diagnostics);
}

#[test]
fn dumps() {
    let module = sample_module();
    let ast = module.get(module.find("ohos.hdi.sample.v1_0.ISample").unwrap());
    let text = dump::dump_text(&module, ast);
    assert!(text.contains("/* 0 */ Ping([in] String message, [out] String reply);"));
    assert!(text.contains("/* 3 */ GetVersion([out] unsigned int majorVer, [out] unsigned int minorVer);"));

    let json = dump::dump_json(&module).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(2));
    assert_eq!(value[0]["types"][1]["kind"], "struct");
    assert_eq!(value[1]["interface"]["methods"][3]["name"], VERSION_METHOD);
}
