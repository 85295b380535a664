use crate::{
    ast::{Method, Parameter, PrimitiveKind, TypeKind},
    codegen::{
        c::{
            base_file,
            begin_extern_c,
            begin_header,
            cmd_name,
            end_header,
            header_file,
            interface_macro,
            local_prefix,
            log_tag,
            types::{self, c_type, guard, OnError},
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

/// Server side: reads each request, calls the service implementation and
/// writes the reply.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    Ok(vec![header(ctx), source(ctx)?])
}

fn header(ctx: &Context) -> GeneratedFile {
    let name = &ctx.ast.name;
    let base = ctx.base();
    let file = base_file(ctx, "stub", "h");
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    if !ctx.kernel() {
        w.line("#include <hdf_remote_service.h>");
    }
    w.blank();
    begin_extern_c(&mut w);
    w.line("struct HdfSBuf;");
    w.blank();

    w.open(format!("struct {}Stub {{", base));
    w.line(format!("struct {} interface;", name));
    if !ctx.kernel() {
        w.line("struct HdfRemoteService *remote;");
        w.line("struct HdfRemoteDispatcher dispatcher;");
    }
    w.close("};");
    w.blank();

    if !ctx.kernel() {
        w.line(format!("bool {b}StubConstruct(struct {b}Stub *stub);", b = base));
        w.blank();
        w.line(format!("void {b}StubRelease(struct {b}Stub *stub);", b = base));
        w.blank();
    }
    w.line(format!(
        "int32_t {}OnRemoteRequest(struct {} *serviceImpl, int code, struct HdfSBuf *data, struct HdfSBuf *reply);",
        base, name
    ));
    w.blank();
    w.line(format!("struct {} *{}ServiceGet(void);", name, base));
    w.blank();
    w.line(format!("void {}ServiceRelease(struct {} *instance);", base, name));

    end_header(&mut w, ctx, &file);
    GeneratedFile {
        name:     file,
        contents: w.finish(),
    }
}

fn source(ctx: &Context) -> Result<GeneratedFile> {
    let base = ctx.base();
    let methods = ctx.methods()?;
    let mut w = CodeWriter::spaces();

    ctx.license(&mut w);
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <hdf_sbuf.h>");
    w.line("#include <osal_mem.h>");
    w.line("#include <securec.h>");
    if methods
        .iter()
        .flat_map(|(_, m)| m.params.iter())
        .any(|p| uses_fd(ctx, p))
    {
        w.line("#include <unistd.h>");
    }
    w.line(format!("#include \"{}\"", base_file(ctx, "stub", "h")));
    log_tag(&mut w, &format!("{}_stub", to_snake_case(base)));

    for (_, method) in &methods {
        stub_method(&mut w, ctx, method)?;
        w.blank();
    }

    w.line(format!(
        "int32_t {}OnRemoteRequest(struct {} *serviceImpl, int code, struct HdfSBuf *data, struct HdfSBuf *reply)",
        base, ctx.ast.name
    ));
    w.open("{");
    if !ctx.kernel() {
        w.line(format!("struct {b}Stub *stub = (struct {b}Stub *)serviceImpl;", b = base));
        w.open("if (stub == NULL || stub->remote == NULL) {");
        w.line("HDF_LOGE(\"%{public}s: invalid stub object\", __func__);");
        w.line("return HDF_ERR_INVALID_OBJECT;");
        w.close("}");
        w.open("if (!HdfRemoteServiceCheckInterfaceToken(stub->remote, data)) {");
        w.line("HDF_LOGE(\"%{public}s: interface token check failed\", __func__);");
        w.line("return HDF_ERR_INVALID_PARAM;");
        w.close("}");
        w.blank();
    }
    w.open("switch (code) {");
    for (_, method) in &methods {
        w.line(format!("case {}:", cmd_name(ctx, method)));
        w.indent();
        w.line(format!("return SerStub{}(serviceImpl, data, reply);", method.name));
        w.dedent();
    }
    w.open("default: {");
    w.line("HDF_LOGE(\"%{public}s: not support cmd %{public}d\", __func__, code);");
    w.line("return HDF_ERR_INVALID_PARAM;");
    w.close("}");
    w.close("}");
    w.close("}");

    if !ctx.kernel() {
        w.blank();
        stub_object(&mut w, ctx);
    }

    Ok(GeneratedFile {
        name:     base_file(ctx, "stub", "c"),
        contents: w.finish(),
    })
}

fn uses_fd(ctx: &Context, param: &Parameter) -> bool {
    let types = ctx.types();
    let ty = types.element(param.ty).unwrap_or(param.ty);
    types.as_primitive(ty) == Some(PrimitiveKind::FileDescriptor)
}

/// Local variable declarations holding one parameter inside a stub function.
fn locals(ctx: &Context, param: &Parameter) -> Result<Vec<String>> {
    let types = ctx.types();
    let name = &param.name;
    let ty = c_type(types, param.ty)?;
    Ok(match types.get(param.ty) {
        TypeKind::Array(_) | TypeKind::List(_) => {
            vec![format!("{} {} = NULL;", ty, name), format!("uint32_t {}Len = 0;", name)]
        }
        TypeKind::Primitive(PrimitiveKind::String) => {
            let mut decls = vec![format!("char* {} = NULL;", name)];
            if param.is_out() {
                decls.push(format!("uint32_t {}Len = 0;", name));
            }
            decls
        }
        TypeKind::Primitive(PrimitiveKind::Boolean) => vec![format!("bool {} = false;", name)],
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => vec![format!("int {} = -1;", name)],
        TypeKind::Primitive(_) | TypeKind::Enum(_) => vec![format!("{} {} = 0;", ty, name)],
        TypeKind::Struct(_) | TypeKind::Union(_) => vec![format!("{} {} = {{0}};", ty, name)],
        TypeKind::Interface(_) => vec![format!("{} {} = NULL;", ty, name)],
        TypeKind::Map { .. } | TypeKind::Sequenceable(_) | TypeKind::SharedMemQueue(_) => {
            // Rejected by the parser for C.
            vec![]
        }
    })
}

/// Argument expressions passed to the implementation for one parameter.
fn call_args(ctx: &Context, param: &Parameter) -> Vec<String> {
    let name = &param.name;
    let sequence = ctx.types().element(param.ty).is_some();
    let string = ctx.types().as_primitive(param.ty) == Some(PrimitiveKind::String);
    let composite = matches!(ctx.types().get(param.ty), TypeKind::Struct(_) | TypeKind::Union(_));
    match (param.is_out(), sequence, string) {
        (false, true, _) => vec![name.clone(), format!("{}Len", name)],
        (false, false, _) if composite => vec![format!("&{}", name)],
        (false, false, _) => vec![name.clone()],
        (true, true, _) => vec![name.clone(), format!("&{}Len", name)],
        (true, false, true) => vec![name.clone(), format!("{}Len", name)],
        (true, false, false) => vec![format!("&{}", name)],
    }
}

fn stub_method(w: &mut CodeWriter, ctx: &Context, method: &Method) -> Result<()> {
    let types = ctx.types();
    let local = local_prefix(ctx);
    let data = format!("{}Data", local);
    let reply = format!("{}Reply", local);
    let ret = format!("{}Ret", local);
    let mem_set = format!("{}MemSet", local);
    let on_error = OnError::Goto {
        ret:   Some(&ret),
        label: "FINISHED",
    };

    w.line(format!(
        "static int32_t SerStub{}(struct {} *serviceImpl, struct HdfSBuf *{}, struct HdfSBuf *{})",
        method.name, ctx.ast.name, data, reply
    ));
    w.open("{");
    w.line(format!("int32_t {} = HDF_FAILURE;", ret));
    let needs_flag = method.needs_capacity_flag(types);
    if needs_flag {
        w.line(format!("bool {} = false;", mem_set));
    }
    for param in &method.params {
        for decl in locals(ctx, param)? {
            w.line(decl);
        }
    }
    w.blank();

    if needs_flag {
        guard(
            w,
            &format!("!HdfSbufReadInt8({}, (int8_t *)&{})", data, mem_set),
            "read flag of memory setting",
            &on_error,
        );
        w.blank();
        w.open(format!("if ({}) {{", mem_set));
        for param in method.capacity_params(types) {
            guard(
                w,
                &format!("!HdfSbufReadUint32({}, &{}Len)", data, param.name),
                &format!("read {} capacity", param.name),
                &on_error,
            );
        }
        w.close("} else {");
        w.indent();
        for param in method.capacity_params(types) {
            w.line(format!(
                "{}Len = HDI_BUFF_MAX_SIZE / sizeof({});",
                param.name,
                element_type(ctx, param)?
            ));
        }
        w.close("}");
        w.blank();
    }

    for param in method.in_params() {
        let len = format!("{}Len", param.name);
        types::read(w, types, param.ty, &data, &param.name, Some(&len), &on_error, 0)?;
        w.blank();
    }

    for param in method.capacity_params(types) {
        allocate_out(w, ctx, param, &on_error)?;
        w.blank();
    }

    w.open(format!(
        "if (serviceImpl == NULL || serviceImpl->{} == NULL) {{",
        method.name
    ));
    on_error.fail_with(w, "check serviceImpl", "HDF_ERR_INVALID_OBJECT");
    w.close("}");
    w.blank();

    let mut args = vec!["serviceImpl".to_owned()];
    for param in &method.params {
        args.extend(call_args(ctx, param));
    }
    w.line(format!("{} = serviceImpl->{}({});", ret, method.name, args.join(", ")));
    w.open(format!("if ({} != HDF_SUCCESS) {{", ret));
    w.line(format!("HDF_LOGE(\"%{{public}}s: call {} failed, error code is %{{public}}d\", __func__, {});", method.name, ret));
    w.line("goto FINISHED;");
    w.close("}");
    w.blank();

    for param in method.out_params() {
        let len = format!("{}Len", param.name);
        types::write(w, types, param.ty, &reply, &param.name, Some(&len), &on_error, 0)?;
        w.blank();
    }

    w.dedent();
    w.line("FINISHED:");
    w.indent();
    for param in &method.params {
        if types::needs_free(types, param.ty) {
            let len = format!("{}Len", param.name);
            types::free(w, types, param.ty, &param.name, Some(&len), 0)?;
        }
    }
    w.line(format!("return {};", ret));
    w.close("}");
    Ok(())
}

/// C type of the unit a capacity counts: bytes for strings, elements for
/// arrays and lists.
fn element_type(ctx: &Context, param: &Parameter) -> Result<String> {
    match ctx.types().element(param.ty) {
        Some(element) => c_type(ctx.types(), element),
        None => Ok("char".to_owned()),
    }
}

/// Allocates the server-side buffer of an `out` string or sequence.
fn allocate_out(w: &mut CodeWriter, ctx: &Context, param: &Parameter, on_error: &OnError) -> Result<()> {
    let name = &param.name;
    let element = element_type(ctx, param)?;
    let is_string = ctx.types().element(param.ty).is_none();
    if is_string {
        guard(
            w,
            &format!("{n}Len == 0 || {n}Len > HDI_BUFF_MAX_SIZE", n = name),
            &format!("check {} capacity", name),
            on_error,
        );
    } else {
        guard(
            w,
            &format!("{}Len > HDI_BUFF_MAX_SIZE / sizeof({})", name, element),
            &format!("check {} capacity", name),
            on_error,
        );
    }
    let allocate = format!(
        "{n} = ({e}*)OsalMemCalloc(sizeof({e}) * ({n}Len));",
        n = name,
        e = element
    );
    if is_string {
        w.line(allocate);
        w.open(format!("if ({} == NULL) {{", name));
        on_error.fail_with(w, &format!("malloc {}", name), "HDF_ERR_MALLOC_FAIL");
        w.close("}");
    } else {
        w.open(format!("if ({}Len > 0) {{", name));
        w.line(allocate);
        w.open(format!("if ({} == NULL) {{", name));
        on_error.fail_with(w, &format!("malloc {}", name), "HDF_ERR_MALLOC_FAIL");
        w.close("}");
        w.close("}");
    }
    Ok(())
}

/// User-mode glue binding a stub to its remote service object.
fn stub_object(w: &mut CodeWriter, ctx: &Context) {
    let name = &ctx.ast.name;
    let base = ctx.base();

    w.line(format!(
        "static struct HdfRemoteService *{}StubAsObject(struct {} *self)",
        base, name
    ));
    w.open("{");
    w.open("if (self == NULL) {");
    w.line("return NULL;");
    w.close("}");
    w.line(format!("struct {b}Stub *stub = (struct {b}Stub *)self;", b = base));
    w.line("return stub->remote;");
    w.close("}");
    w.blank();

    w.line(format!(
        "static int32_t {}StubDispatch(struct HdfRemoteService *remote, int code, struct HdfSBuf *data,",
        base
    ));
    w.line("    struct HdfSBuf *reply)");
    w.open("{");
    w.line(format!("struct {b}Stub *stub = (struct {b}Stub *)remote->target;", b = base));
    w.open("if (stub == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: invalid stub object\", __func__);");
    w.line("return HDF_ERR_INVALID_OBJECT;");
    w.close("}");
    w.line(format!("return {}OnRemoteRequest(&stub->interface, code, data, reply);", base));
    w.close("}");
    w.blank();

    w.line(format!("bool {b}StubConstruct(struct {b}Stub *stub)", b = base));
    w.open("{");
    w.open("if (stub == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: stub is null!\", __func__);");
    w.line("return false;");
    w.close("}");
    w.blank();
    w.line(format!("stub->dispatcher.Dispatch = {}StubDispatch;", base));
    w.line("stub->remote = HdfRemoteServiceObtain((struct HdfObject *)stub, &stub->dispatcher);");
    w.open("if (stub->remote == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: failed to obtain remote service!\", __func__);");
    w.line("return false;");
    w.close("}");
    w.blank();
    w.open(format!(
        "if (!HdfRemoteServiceSetInterfaceDesc(stub->remote, {}_INTERFACE_DESC)) {{",
        interface_macro(ctx)
    ));
    w.line("HDF_LOGE(\"%{public}s: failed to set interface descriptor!\", __func__);");
    w.line("HdfRemoteServiceRecycle(stub->remote);");
    w.line("stub->remote = NULL;");
    w.line("return false;");
    w.close("}");
    w.blank();
    w.line(format!("stub->interface.AsObject = {}StubAsObject;", base));
    w.line("return true;");
    w.close("}");
    w.blank();

    w.line(format!("void {b}StubRelease(struct {b}Stub *stub)", b = base));
    w.open("{");
    w.open("if (stub == NULL || stub->remote == NULL) {");
    w.line("return;");
    w.close("}");
    w.line("HdfRemoteServiceRecycle(stub->remote);");
    w.line("stub->remote = NULL;");
    w.close("}");
}
