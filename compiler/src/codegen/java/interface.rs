use std::collections::BTreeSet;

use crate::{
    codegen::{
        java::{begin_file, cmd_name, method_imports, signature},
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
};

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let name = &ctx.ast.name;
    let mut imports = BTreeSet::new();
    imports.insert("ohos.rpc.IRemoteBroker".to_owned());
    imports.insert("ohos.rpc.RemoteException".to_owned());
    method_imports(ctx, &mut imports)?;

    let mut w = CodeWriter::spaces();
    begin_file(&mut w, ctx, &imports);

    w.open(format!("public interface {} extends IRemoteBroker {{", name));
    w.line(format!("String DESCRIPTOR = \"{}\";", ctx.ast.full_name()));
    w.blank();
    w.line(format!("int MAJOR_VERSION = {};", ctx.ast.version.major));
    w.line(format!("int MINOR_VERSION = {};", ctx.ast.version.minor));
    w.blank();
    let methods = ctx.methods()?;
    for (id, method) in &methods {
        w.line(format!("int {} = {};", cmd_name(ctx, method), id));
    }
    for (_, method) in &methods {
        w.blank();
        w.line(format!("{};", signature(ctx, method)?));
    }
    w.close("}");

    Ok(vec![GeneratedFile {
        name:     format!("{}.java", name),
        contents: w.finish(),
    }])
}
