//! Java back end. Only the client side exists: custom types, the interface
//! and its proxy.

mod custom_types;
mod interface;
mod proxy;
pub(crate) mod types;

use std::collections::BTreeSet;

use crate::{
    ast::Method,
    codegen::{writer::CodeWriter, Artifact, Context, Emitter, GeneratedFile},
    error::{HdiError, Result},
    utils::{to_lower_camel, to_upper_snake},
};

pub(crate) struct JavaEmitter;

impl Emitter for JavaEmitter {
    fn supports(&self, artifact: Artifact) -> bool {
        matches!(artifact, Artifact::CustomTypes | Artifact::Interface | Artifact::Proxy)
    }

    fn emit(&self, ctx: &Context, artifact: Artifact) -> Result<Vec<GeneratedFile>> {
        match artifact {
            Artifact::CustomTypes => custom_types::emit(ctx),
            Artifact::Interface => interface::emit(ctx),
            Artifact::Proxy => proxy::emit(ctx),
            other => Err(HdiError::Generate(format!("{:?} is not generated for Java", other))),
        }
    }
}

/// License, `package` line and sorted imports.
fn begin_file(w: &mut CodeWriter, ctx: &Context, imports: &BTreeSet<String>) {
    ctx.license(w);
    w.line(format!("package {};", ctx.ast.package));
    w.blank();
    for import in imports {
        w.line(format!("import {};", import));
    }
    w.blank();
}

/// Imports for every type a method signature mentions.
fn method_imports(ctx: &Context, imports: &mut BTreeSet<String>) -> Result<()> {
    for (_, method) in ctx.methods()? {
        for param in &method.params {
            types::collect_imports(ctx, param.ty, imports);
        }
    }
    Ok(())
}

fn cmd_name(ctx: &Context, method: &Method) -> String {
    format!("CMD_{}_{}", to_upper_snake(ctx.base()), to_upper_snake(&method.name))
}

fn method_name(method: &Method) -> String {
    to_lower_camel(&method.name)
}

fn method_params(ctx: &Context, method: &Method) -> Result<String> {
    let params = method
        .params
        .iter()
        .map(|param| types::param_decl(ctx, param))
        .collect::<Result<Vec<_>>>()?;
    Ok(params.join(", "))
}

fn signature(ctx: &Context, method: &Method) -> Result<String> {
    Ok(format!(
        "int {}({}) throws RemoteException",
        method_name(method),
        method_params(ctx, method)?
    ))
}
