use crate::{
    ast::{Method, Parameter, PrimitiveKind, TypeKind},
    codegen::{
        c::{
            base_file,
            cmd_name,
            header_file,
            interface_macro,
            is_callback,
            local_prefix,
            log_tag,
            method_params,
            service_name,
            types::{self, guard, OnError},
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

/// Client side: a function table whose entries marshal their arguments,
/// dispatch the command and unmarshal the reply.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let base = ctx.base();
    let mut w = CodeWriter::spaces();
    ctx.license(&mut w);
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <hdf_sbuf.h>");
    w.line("#include <osal_mem.h>");
    w.line("#include <securec.h>");
    if ctx.kernel() {
        w.line("#include <hdf_io_service_if.h>");
    } else {
        w.line("#include <hdf_remote_service.h>");
        w.line("#include <servmgr_hdi.h>");
    }
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    log_tag(&mut w, &format!("{}_proxy", to_snake_case(base)));

    w.open(format!("struct {}Proxy {{", base));
    w.line(format!("struct {} impl;", ctx.ast.name));
    if ctx.kernel() {
        w.line("struct HdfIoService *serv;");
    } else {
        w.line("struct HdfRemoteService *remote;");
    }
    w.close("};");
    w.blank();

    call_function(&mut w, ctx);
    w.blank();
    for (_, method) in ctx.methods()? {
        proxy_method(&mut w, ctx, method)?;
        w.blank();
    }
    if !ctx.kernel() {
        as_object(&mut w, ctx);
        w.blank();
    }
    construct(&mut w, ctx)?;
    w.blank();
    entry_points(&mut w, ctx);

    Ok(vec![GeneratedFile {
        name:     base_file(ctx, "proxy", "c"),
        contents: w.finish(),
    }])
}

fn call_function(w: &mut CodeWriter, ctx: &Context) {
    let base = ctx.base();
    w.line(format!(
        "static int32_t {}ProxyCall(struct {} *self, int32_t id, struct HdfSBuf *data,",
        base, ctx.ast.name
    ));
    w.line("    struct HdfSBuf *reply, bool isOneWay)");
    w.open("{");
    if ctx.kernel() {
        w.line("(void)isOneWay;");
        w.line(format!(
            "struct HdfIoService *serv = CONTAINER_OF(self, struct {}Proxy, impl)->serv;",
            base
        ));
        w.open("if (serv == NULL || serv->dispatcher == NULL || serv->dispatcher->Dispatch == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: invalid HdfIoService object\", __func__);");
        w.line("return HDF_ERR_INVALID_OBJECT;");
        w.close("}");
        w.line("return serv->dispatcher->Dispatch(&serv->object, id, data, reply);");
    } else {
        w.line("struct HdfRemoteService *remote = self->AsObject(self);");
        w.line("if (remote == NULL || remote->dispatcher == NULL || remote->dispatcher->Dispatch == NULL ||");
        w.open("    remote->dispatcher->DispatchAsync == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: invalid HdfRemoteService object\", __func__);");
        w.line("return HDF_ERR_INVALID_OBJECT;");
        w.close("}");
        w.open("if (isOneWay) {");
        w.line("return remote->dispatcher->DispatchAsync(remote, id, data, reply);");
        w.close("}");
        w.line("return remote->dispatcher->Dispatch(remote, id, data, reply);");
    }
    w.close("}");
}

fn sbuf_obtain(ctx: &Context) -> &'static str {
    if ctx.kernel() {
        "HdfSbufObtainDefaultSize()"
    } else {
        "HdfSbufTypedObtain(SBUF_IPC)"
    }
}

/// C expression denoting the value of an `in` parameter.
fn in_value(ctx: &Context, param: &Parameter) -> String {
    match ctx.types().get(param.ty) {
        TypeKind::Struct(_) | TypeKind::Union(_) => format!("*{}", param.name),
        _ => param.name.clone(),
    }
}

fn proxy_method(w: &mut CodeWriter, ctx: &Context, method: &Method) -> Result<()> {
    let types = ctx.types();
    let interface = ctx.interface()?;
    let base = ctx.base();
    let local = local_prefix(ctx);
    let data = format!("{}Data", local);
    let reply = format!("{}Reply", local);
    let ret = format!("{}Ret", local);
    let on_error = OnError::Goto {
        ret:   Some(&ret),
        label: "FINISHED",
    };

    w.line(format!(
        "static int32_t {}Proxy{}({})",
        base,
        method.name,
        method_params(ctx, method)?
    ));
    w.open("{");
    w.line(format!("int32_t {} = HDF_FAILURE;", ret));
    w.blank();
    w.line(format!("struct HdfSBuf *{} = {};", data, sbuf_obtain(ctx)));
    w.line(format!("struct HdfSBuf *{} = {};", reply, sbuf_obtain(ctx)));
    w.blank();
    w.open(format!("if ({} == NULL || {} == NULL) {{", data, reply));
    on_error.fail_with(w, "HdfSubf malloc", "HDF_ERR_MALLOC_FAIL");
    w.close("}");
    w.blank();
    w.open("if (self == NULL) {");
    on_error.fail_with(w, "check self", "HDF_ERR_INVALID_OBJECT");
    w.close("}");
    w.blank();

    if !ctx.kernel() {
        guard(
            w,
            &format!("!HdfRemoteServiceWriteInterfaceToken(self->AsObject(self), {})", data),
            "write interface token",
            &on_error,
        );
        w.blank();
    }

    if method.needs_capacity_flag(types) {
        guard(w, &format!("!HdfSbufWriteInt8({}, 1)", data), "write flag of memory setting", &on_error);
        for param in method.capacity_params(types) {
            let capacity = match types.get(param.ty) {
                TypeKind::Primitive(PrimitiveKind::String) => format!("{}Len", param.name),
                _ => format!("*{}Len", param.name),
            };
            guard(
                w,
                &format!("!HdfSbufWriteUint32({}, {})", data, capacity),
                &format!("write {} capacity", param.name),
                &on_error,
            );
        }
        w.blank();
    }

    for param in method.in_params() {
        let len = format!("{}Len", param.name);
        types::write(w, types, param.ty, &data, &in_value(ctx, param), Some(&len), &on_error, 0)?;
        w.blank();
    }

    w.line(format!(
        "{} = {}ProxyCall(self, {}, {}, {}, {});",
        ret,
        base,
        cmd_name(ctx, method),
        data,
        reply,
        interface.is_oneway(method)
    ));
    w.open(format!("if ({} != HDF_SUCCESS) {{", ret));
    w.line(format!("HDF_LOGE(\"%{{public}}s: call failed! error code is %{{public}}d\", __func__, {});", ret));
    w.line("goto FINISHED;");
    w.close("}");
    w.blank();

    for param in method.out_params() {
        read_out(w, ctx, param, &reply, &on_error)?;
        w.blank();
    }

    w.dedent();
    w.line("FINISHED:");
    w.indent();
    for buffer in [&data, &reply].iter() {
        w.open(format!("if ({} != NULL) {{", buffer));
        w.line(format!("HdfSbufRecycle({});", buffer));
        w.close("}");
    }
    w.line(format!("return {};", ret));
    w.close("}");
    Ok(())
}

/// Reads one `out` value from the reply into the caller's storage. Strings
/// and sequences land in caller buffers and are checked against the
/// capacity the caller announced.
fn read_out(w: &mut CodeWriter, ctx: &Context, param: &Parameter, reply: &str, on_error: &OnError) -> Result<()> {
    let types = ctx.types();
    let name = &param.name;
    match types.get(param.ty) {
        TypeKind::Primitive(PrimitiveKind::String) => {
            let copy = format!("{}Copy", name);
            w.line(format!("const char *{} = HdfSbufReadString({});", copy, reply));
            guard(w, &format!("{} == NULL", copy), &format!("read {}", name), on_error);
            guard(
                w,
                &format!("strcpy_s({}, {}Len, {}) != EOK", name, name, copy),
                &format!("copy {}", name),
                on_error,
            );
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            let capacity = format!("{}Cap", name);
            let len = format!("*{}Len", name);
            w.line(format!("uint32_t {} = {};", capacity, len));
            guard(
                w,
                &format!("!HdfSbufReadUint32({}, {}Len)", reply, name),
                &format!("read {} size", name),
                on_error,
            );
            guard(w, &format!("{} > {}", len, capacity), &format!("check {} size", name), on_error);
            types::read_elements(w, types, *element, reply, name, &len, on_error, 0)?;
        }
        _ => {
            types::read(w, types, param.ty, reply, &format!("*{}", name), None, on_error, 0)?;
        }
    }
    Ok(())
}

fn as_object(w: &mut CodeWriter, ctx: &Context) {
    let base = ctx.base();
    w.line(format!(
        "static struct HdfRemoteService *{}ProxyAsObject(struct {} *self)",
        base, ctx.ast.name
    ));
    w.open("{");
    w.open("if (self == NULL) {");
    w.line("return NULL;");
    w.close("}");
    w.line(format!("struct {b}Proxy *proxy = CONTAINER_OF(self, struct {b}Proxy, impl);", b = base));
    w.line("return proxy->remote;");
    w.close("}");
}

fn construct(w: &mut CodeWriter, ctx: &Context) -> Result<()> {
    let base = ctx.base();
    w.line(format!("static void {}ProxyConstruct(struct {} *impl)", base, ctx.ast.name));
    w.open("{");
    for (_, method) in ctx.methods()? {
        w.line(format!("impl->{m} = {}Proxy{m};", base, m = method.name));
    }
    if !ctx.kernel() {
        w.line(format!("impl->AsObject = {}ProxyAsObject;", base));
    }
    w.close("}");
    Ok(())
}

/// Rejects services whose major version differs or whose minor version is
/// older than the client's. `client` must already be constructed.
fn version_check(w: &mut CodeWriter, ctx: &Context) {
    let name = &ctx.ast.name;
    let prefix = interface_macro(ctx);
    let ret = format!("{}Ret", local_prefix(ctx));
    w.line("uint32_t serMajorVer = 0;");
    w.line("uint32_t serMinorVer = 0;");
    w.line(format!(
        "int32_t {} = client->GetVersion(client, &serMajorVer, &serMinorVer);",
        ret
    ));
    w.open(format!("if ({} != HDF_SUCCESS) {{", ret));
    w.line("HDF_LOGE(\"%{public}s: get version failed!\", __func__);");
    w.line(format!("{}Release(client);", name));
    w.line("return NULL;");
    w.close("}");
    w.blank();
    w.open(format!(
        "if (serMajorVer != {p}_MAJOR_VERSION || serMinorVer < {p}_MINOR_VERSION) {{",
        p = prefix
    ));
    w.line("HDF_LOGE(\"%{public}s:check version failed! version of service:%u.%u, version of client:%u.%u\", __func__,");
    w.line(format!(
        "    serMajorVer, serMinorVer, {p}_MAJOR_VERSION, {p}_MINOR_VERSION);",
        p = prefix
    ));
    w.line(format!("{}Release(client);", name));
    w.line("return NULL;");
    w.close("}");
    w.blank();
    w.line("return client;");
}

fn entry_points(w: &mut CodeWriter, ctx: &Context) {
    let name = &ctx.ast.name;
    let base = ctx.base();

    if !is_callback(ctx) {
        w.line(format!("struct {n} *{n}Get(void)", n = name));
        w.open("{");
        w.line(format!("return {}GetInstance(\"{}\");", name, service_name(ctx)));
        w.close("}");
        w.blank();
    }

    if ctx.kernel() {
        w.line(format!("struct {n} *{n}GetInstance(const char *serviceName)", n = name));
        w.open("{");
        w.line("struct HdfIoService *serv = HdfIoServiceBind(serviceName);");
        w.open("if (serv == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: failed to get io service!\", __func__);");
        w.line("return NULL;");
        w.close("}");
        w.blank();
        w.line(format!(
            "struct {b}Proxy *proxy = (struct {b}Proxy *)OsalMemCalloc(sizeof(struct {b}Proxy));",
            b = base
        ));
        w.open("if (proxy == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: malloc proxy failed!\", __func__);");
        w.line("HdfIoServiceRecycle(serv);");
        w.line("return NULL;");
        w.close("}");
        w.blank();
        w.line("proxy->serv = serv;");
        w.line(format!("{}ProxyConstruct(&proxy->impl);", base));
        w.line(format!("struct {} *client = &proxy->impl;", name));
        w.blank();
        version_check(w, ctx);
        w.close("}");
        w.blank();

        w.line(format!("void {n}Release(struct {n} *instance)", n = name));
        w.open("{");
        w.open("if (instance == NULL) {");
        w.line("return;");
        w.close("}");
        w.line(format!("struct {b}Proxy *proxy = CONTAINER_OF(instance, struct {b}Proxy, impl);", b = base));
        w.line("HdfIoServiceRecycle(proxy->serv);");
        w.line("OsalMemFree(proxy);");
        w.close("}");
        return;
    }

    if !is_callback(ctx) {
        w.line(format!("struct {n} *{n}GetInstance(const char *serviceName)", n = name));
        w.open("{");
        w.line("struct HDIServiceManager *serviceMgr = HDIServiceManagerGet();");
        w.open("if (serviceMgr == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: HDIServiceManager not found!\", __func__);");
        w.line("return NULL;");
        w.close("}");
        w.blank();
        w.line("struct HdfRemoteService *remote = serviceMgr->GetService(serviceMgr, serviceName);");
        w.line("HDIServiceManagerRelease(serviceMgr);");
        w.open("if (remote == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: failed to get remote!\", __func__);");
        w.line("return NULL;");
        w.close("}");
        w.blank();
        w.open(format!(
            "if (!HdfRemoteServiceSetInterfaceDesc(remote, {}_INTERFACE_DESC)) {{",
            interface_macro(ctx)
        ));
        w.line("HDF_LOGE(\"%{public}s: set interface token failed!\", __func__);");
        w.line("HdfRemoteServiceRecycle(remote);");
        w.line("return NULL;");
        w.close("}");
        w.blank();
        w.line(format!("return {}GetFromRemote(remote);", name));
        w.close("}");
        w.blank();
    }

    w.line(format!("struct {n} *{n}GetFromRemote(struct HdfRemoteService *remote)", n = name));
    w.open("{");
    w.open("if (remote == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: remote is null\", __func__);");
    w.line("return NULL;");
    w.close("}");
    w.blank();
    w.line(format!(
        "struct {b}Proxy *proxy = (struct {b}Proxy *)OsalMemCalloc(sizeof(struct {b}Proxy));",
        b = base
    ));
    w.open("if (proxy == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: malloc proxy failed!\", __func__);");
    w.line("HdfRemoteServiceRecycle(remote);");
    w.line("return NULL;");
    w.close("}");
    w.blank();
    w.line("proxy->remote = remote;");
    w.line(format!("{}ProxyConstruct(&proxy->impl);", base));
    w.line(format!("struct {} *client = &proxy->impl;", name));
    w.blank();
    version_check(w, ctx);
    w.close("}");
    w.blank();

    w.line(format!("void {n}Release(struct {n} *instance)", n = name));
    w.open("{");
    w.open("if (instance == NULL) {");
    w.line("return;");
    w.close("}");
    w.line(format!("struct {b}Proxy *proxy = CONTAINER_OF(instance, struct {b}Proxy, impl);", b = base));
    w.line("HdfRemoteServiceRecycle(proxy->remote);");
    w.line("OsalMemFree(proxy);");
    w.close("}");
}
