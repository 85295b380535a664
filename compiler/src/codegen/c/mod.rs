//! C back end for the HDF user-space (IPC) and kernel (ioservice) runtimes.

mod custom_types;
mod driver;
mod interface;
mod proxy;
mod service;
mod stub;
pub(crate) mod types;

use crate::{
    ast::{Ast, AstKind, Method},
    codegen::{writer::CodeWriter, Artifact, Context, Emitter, GeneratedFile},
    error::Result,
    utils::{to_lower_camel, to_snake_case, to_upper_snake},
};

pub(crate) struct CEmitter;

impl Emitter for CEmitter {
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

/// `ISample` -> `i_sample.h`, `Types` -> `types.h`.
fn header_file(ast: &Ast) -> String {
    format!("{}.h", to_snake_case(&ast.name))
}

/// `<base>_<suffix>.<ext>`, e.g. `sample_proxy.c`.
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

/// Include line for an imported unit's header. Headers of the same package
/// sit next to each other; others are reached through their package path.
fn include_of(ctx: &Context, ast: &Ast) -> String {
    if ast.package == ctx.ast.package {
        format!("#include \"{}\"", header_file(ast))
    } else {
        format!(
            "#include \"{}/{}\"",
            ast.package.replace('.', "/"),
            header_file(ast)
        )
    }
}

/// `ISample` -> `ISAMPLE`, the prefix of the interface's macros.
fn interface_macro(ctx: &Context) -> String {
    ctx.ast.name.to_uppercase()
}

fn cmd_enum(ctx: &Context) -> String {
    format!("{}Cmd", ctx.base())
}

/// `CMD_SAMPLE_GET_VERSION`.
fn cmd_name(ctx: &Context, method: &Method) -> String {
    format!("CMD_{}_{}", to_upper_snake(ctx.base()), to_upper_snake(&method.name))
}

/// Prefix of generated local variables, e.g. `sample` in `sampleData`.
fn local_prefix(ctx: &Context) -> String {
    to_lower_camel(ctx.base())
}

/// Name the driver registers under and clients bind to by default.
fn service_name(ctx: &Context) -> String {
    ctx.options
        .module_name
        .clone()
        .unwrap_or_else(|| format!("{}_service", to_snake_case(ctx.base())))
}

/// `struct ISample *self, const char* message, ...`.
fn method_params(ctx: &Context, method: &Method) -> Result<String> {
    let mut params = vec![format!("struct {} *self", ctx.ast.name)];
    for param in &method.params {
        params.extend(types::param_decls(ctx.types(), param)?);
    }
    Ok(params.join(", "))
}

fn begin_header(w: &mut CodeWriter, ctx: &Context, file: &str) {
    let guard = guard_macro(&ctx.ast.package, file);
    ctx.license(w);
    w.line(format!("#ifndef {}", guard));
    w.line(format!("#define {}", guard));
    w.blank();
}

fn begin_extern_c(w: &mut CodeWriter) {
    w.line("#ifdef __cplusplus");
    w.line("extern \"C\" {");
    w.line("#endif /* __cplusplus */");
    w.blank();
}

fn end_extern_c(w: &mut CodeWriter) {
    w.blank();
    w.line("#ifdef __cplusplus");
    w.line("}");
    w.line("#endif /* __cplusplus */");
}

fn end_header(w: &mut CodeWriter, ctx: &Context, file: &str) {
    end_extern_c(w);
    w.blank();
    w.line(format!("#endif /* {} */", guard_macro(&ctx.ast.package, file)));
}

fn log_tag(w: &mut CodeWriter, tag: &str) {
    w.blank();
    w.line(format!("#define HDF_LOG_TAG    {}", tag));
    w.blank();
}

fn is_callback(ctx: &Context) -> bool {
    ctx.ast.kind == AstKind::Callback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_follow_package_and_file() {
        assert_eq!(
            guard_macro("ohos.hdi.sample.v1_0", "i_sample.h"),
            "OHOS_HDI_SAMPLE_V1_0_I_SAMPLE_H"
        );
    }
}
