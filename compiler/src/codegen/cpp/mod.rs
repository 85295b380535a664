//! C++ back end for the user-space IPC runtime (`MessageParcel`, `sptr`).

mod custom_types;
mod driver;
mod interface;
mod proxy;
mod service;
mod stub;
pub(crate) mod types;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    ast::{Ast, AstKind, Method, NamespaceId},
    codegen::{writer::CodeWriter, Artifact, Context, Emitter, GeneratedFile},
    error::Result,
    utils::{to_lower_camel, to_pascal_case, to_snake_case, to_upper_snake},
};

lazy_static! {
    static ref VERSION_SEGMENT: Regex = Regex::new(r"^[vV]\d+_\d+$").unwrap();
}

pub(crate) struct CppEmitter;

impl Emitter for CppEmitter {
    fn emit(&self, ctx: &Context, artifact: Artifact) -> Result<Vec<GeneratedFile>> {
        match artifact {
            Artifact::CustomTypes => custom_types::emit(ctx),
            Artifact::Interface => interface::emit(ctx),
            Artifact::Proxy => proxy::emit(ctx),
            Artifact::Stub => stub::emit(ctx),
            Artifact::Driver => driver::emit(ctx),
            Artifact::ServiceImpl => service::emit(ctx),
        }
    }
}

/// C++ spelling of one package segment: `ohos` -> `OHOS`, `hdi` -> `HDI`,
/// `v1_0` -> `V1_0`, anything else PascalCase.
fn namespace_segment(segment: &str) -> String {
    match segment {
        "ohos" => "OHOS".to_owned(),
        "hdi" => "HDI".to_owned(),
        s if VERSION_SEGMENT.is_match(s) => s.to_uppercase(),
        s => to_pascal_case(s),
    }
}

fn namespaces_of(ctx: &Context, namespace: NamespaceId) -> Vec<String> {
    ctx.module
        .namespaces
        .segments(namespace)
        .into_iter()
        .map(namespace_segment)
        .collect()
}

/// `OHOS::HDI::Sample::V1_0`.
fn qualified_namespace(ctx: &Context, namespace: NamespaceId) -> String {
    namespaces_of(ctx, namespace).join("::")
}

fn open_namespaces(w: &mut CodeWriter, ctx: &Context) {
    for segment in namespaces_of(ctx, ctx.ast.namespace) {
        w.line(format!("namespace {} {{", segment));
    }
    w.blank();
}

fn close_namespaces(w: &mut CodeWriter, ctx: &Context) {
    w.blank();
    for segment in namespaces_of(ctx, ctx.ast.namespace).iter().rev() {
        w.line(format!("}} // {}", segment));
    }
}

/// `ISample` -> `isample.h`, `Types` -> `types.h`.
fn header_file(ast: &Ast) -> String {
    format!("{}.h", ast.name.to_lowercase())
}

fn base_file(ctx: &Context, suffix: &str, ext: &str) -> String {
    format!("{}_{}.{}", to_snake_case(ctx.base()), suffix, ext)
}

fn guard_macro(package: &str, file: &str) -> String {
    format!(
        "{}_{}",
        package.replace('.', "_").to_uppercase(),
        file.replace('.', "_").to_uppercase()
    )
}

fn include_of(ctx: &Context, ast: &Ast) -> String {
    if ast.package == ctx.ast.package {
        format!("#include \"{}\"", header_file(ast))
    } else {
        format!("#include \"{}/{}\"", ast.package.replace('.', "/"), header_file(ast))
    }
}

/// Includes of imported units, sequenceables included. Sequenceable headers
/// are written by hand and named after the class in snake case.
fn import_includes(w: &mut CodeWriter, ctx: &Context) {
    for &id in ctx.ast.imports.values() {
        let import = ctx.module.get(id);
        if import.kind == AstKind::Sequenceable {
            w.line(format!("#include \"{}.h\"", to_snake_case(&import.name)));
        } else {
            w.line(include_of(ctx, import));
        }
    }
}

fn begin_header(w: &mut CodeWriter, ctx: &Context, file: &str) {
    let guard = guard_macro(&ctx.ast.package, file);
    ctx.license(w);
    w.line(format!("#ifndef {}", guard));
    w.line(format!("#define {}", guard));
    w.blank();
}

fn end_header(w: &mut CodeWriter, ctx: &Context, file: &str) {
    close_namespaces(w, ctx);
    w.blank();
    w.line(format!("#endif // {}", guard_macro(&ctx.ast.package, file)));
}

fn log_tag(w: &mut CodeWriter, tag: &str) {
    w.blank();
    w.line(format!("#define HDF_LOG_TAG    {}", tag));
    w.blank();
}

fn cmd_enum(ctx: &Context) -> String {
    format!("{}Cmd", ctx.base())
}

fn cmd_name(ctx: &Context, method: &Method) -> String {
    format!("CMD_{}_{}", to_upper_snake(ctx.base()), to_upper_snake(&method.name))
}

fn local_prefix(ctx: &Context) -> String {
    to_lower_camel(ctx.base())
}

fn service_name(ctx: &Context) -> String {
    ctx.options
        .module_name
        .clone()
        .unwrap_or_else(|| format!("{}_service", to_snake_case(ctx.base())))
}

fn is_callback(ctx: &Context) -> bool {
    ctx.ast.kind == AstKind::Callback
}

/// `const std::string& message, std::string& reply`.
fn method_params(ctx: &Context, method: &Method) -> Result<String> {
    let params = method
        .params
        .iter()
        .map(|param| types::param_decl(ctx, param))
        .collect::<Result<Vec<_>>>()?;
    Ok(params.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_segments() {
        assert_eq!(namespace_segment("ohos"), "OHOS");
        assert_eq!(namespace_segment("hdi"), "HDI");
        assert_eq!(namespace_segment("v1_0"), "V1_0");
        assert_eq!(namespace_segment("sample"), "Sample");
        assert_eq!(namespace_segment("audio_render"), "AudioRender");
    }
}
