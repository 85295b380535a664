use std::collections::BTreeSet;

use crate::{
    ast::{Method, TypeId, VERSION_METHOD},
    codegen::{
        java::{
            begin_file,
            cmd_name,
            method_imports,
            signature,
            types::{self, OutKind},
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_lower_camel,
};

const INVALID_PARAM: &str = "return HDF_ERR_INVALID_PARAM;";

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let name = &ctx.ast.name;
    let proxy = format!("{}Proxy", ctx.base());
    let interface = ctx.interface()?;

    let mut imports = BTreeSet::new();
    for import in ["IRemoteObject", "MessageOption", "MessageParcel", "RemoteException"] {
        imports.insert(format!("ohos.rpc.{}", import));
    }
    method_imports(ctx, &mut imports)?;

    let mut w = CodeWriter::spaces();
    begin_file(&mut w, ctx, &imports);

    w.open(format!("public class {} implements {} {{", proxy, name));
    w.line("private static final int HDF_SUCCESS = 0;");
    w.line("private static final int HDF_FAILURE = -1;");
    w.line("private static final int HDF_ERR_INVALID_PARAM = -3;");
    w.line("private static final int HDI_BUFF_MAX_SIZE = 1024 * 200;");
    w.blank();
    w.line("private final IRemoteObject remote;");
    w.blank();
    w.line(format!("public {}(IRemoteObject remote) {{", proxy));
    w.indent();
    w.line("this.remote = remote;");
    w.close("}");
    w.blank();

    w.line("/**");
    w.line(" * Wraps {@code remote} after checking that the service speaks a");
    w.line(" * compatible version. Returns null otherwise.");
    w.line(" */");
    w.open(format!("public static {} castFrom(IRemoteObject remote) {{", name));
    w.open("if (remote == null) {");
    w.line("return null;");
    w.close("}");
    w.line(format!("{p} proxy = new {p}(remote);", p = proxy));
    w.line("int[] serMajorVer = new int[1];");
    w.line("int[] serMinorVer = new int[1];");
    w.open("try {");
    w.open(format!("if (proxy.{}(serMajorVer, serMinorVer) != HDF_SUCCESS) {{", to_lower_camel(VERSION_METHOD)));
    w.line("return null;");
    w.close("}");
    w.close("} catch (RemoteException e) {");
    w.indent();
    w.line("return null;");
    w.close("}");
    w.open("if (serMajorVer[0] != MAJOR_VERSION || serMinorVer[0] < MINOR_VERSION) {");
    w.line("return null;");
    w.close("}");
    w.line("return proxy;");
    w.close("}");
    w.blank();

    w.line("@Override");
    w.open("public IRemoteObject asObject() {");
    w.line("return remote;");
    w.close("}");

    for (_, method) in ctx.methods()? {
        w.blank();
        proxy_method(&mut w, ctx, method, interface.is_oneway(method))?;
    }
    w.close("}");

    Ok(vec![GeneratedFile {
        name:     format!("{}.java", proxy),
        contents: w.finish(),
    }])
}

fn proxy_method(w: &mut CodeWriter, ctx: &Context, method: &Method, oneway: bool) -> Result<()> {
    let types = ctx.types();
    let local = to_lower_camel(ctx.base());
    let data = format!("{}Data", local);
    let reply = format!("{}Reply", local);
    let option = format!("{}Option", local);

    w.line("@Override");
    w.open(format!("public {} {{", signature(ctx, method)?));
    w.line(format!("MessageParcel {} = MessageParcel.obtain();", data));
    w.line(format!("MessageParcel {} = MessageParcel.obtain();", reply));
    let flags = if oneway { "TF_ASYNC" } else { "TF_SYNC" };
    w.line(format!("MessageOption {} = new MessageOption(MessageOption.{});", option, flags));
    w.blank();
    w.line(format!("{}.writeInterfaceToken(DESCRIPTOR);", data));
    if method.needs_capacity_flag(types) {
        w.line(format!("{}.writeBoolean(false);", data));
    }
    for param in method.in_params() {
        types::write(w, ctx, param.ty, &data, &param.name, 0)?;
    }
    w.blank();

    w.open("try {");
    w.open(format!(
        "if (!remote.sendRequest({}, {}, {}, {})) {{",
        cmd_name(ctx, method),
        data,
        reply,
        option
    ));
    w.line("return HDF_FAILURE;");
    w.close("}");
    for param in method.out_params() {
        read_out(w, ctx, param.ty, &reply, &param.name)?;
    }
    w.line("return HDF_SUCCESS;");
    w.close("} finally {");
    w.indent();
    w.line(format!("{}.reclaim();", data));
    w.line(format!("{}.reclaim();", reply));
    w.close("}");
    w.close("}");
    Ok(())
}

/// Hands one reply value back through the caller's `out` argument.
fn read_out(w: &mut CodeWriter, ctx: &Context, ty: TypeId, reply: &str, name: &str) -> Result<()> {
    match types::out_kind(ctx, ty) {
        OutKind::Holder => {
            types::read(w, ctx, ty, reply, &format!("{}[0]", name), INVALID_PARAM, 0)?;
        }
        OutKind::InPlace => {
            w.open(format!("if (!{}.readSequenceable({})) {{", reply, name));
            w.line(INVALID_PARAM);
            w.close("}");
        }
        OutKind::Buffer => {
            let received = format!("{}Out", name);
            w.line(format!("{} {};", types::java_type(ctx, ty, false)?, received));
            types::read(w, ctx, ty, reply, &received, INVALID_PARAM, 0)?;
            w.open(format!("if ({}.length > {}.length) {{", received, name));
            w.line(INVALID_PARAM);
            w.close("}");
            w.line(format!("System.arraycopy({r}, 0, {n}, 0, {r}.length);", r = received, n = name));
        }
        OutKind::Collection => {
            let received = format!("{}Out", name);
            let refill = if ctx.types().element(ty).is_some() { "addAll" } else { "putAll" };
            w.line(format!("{} {};", types::java_type(ctx, ty, false)?, received));
            types::read(w, ctx, ty, reply, &received, INVALID_PARAM, 0)?;
            w.line(format!("{}.clear();", name));
            w.line(format!("{}.{}({});", name, refill, received));
        }
    }
    Ok(())
}
