use crate::{
    ast::Method,
    codegen::{
        cpp::{
            base_file,
            begin_header,
            close_namespaces,
            cmd_name,
            end_header,
            header_file,
            is_callback,
            local_prefix,
            log_tag,
            method_params,
            open_namespaces,
            service_name,
            types,
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

const INVALID_PARAM: &str = "return HDF_ERR_INVALID_PARAM;";

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    Ok(vec![header(ctx)?, source(ctx)?])
}

fn header(ctx: &Context) -> Result<GeneratedFile> {
    let name = &ctx.ast.name;
    let proxy = format!("{}Proxy", ctx.base());
    let file = base_file(ctx, "proxy", "h");
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    w.line("#include <iproxy_broker.h>");
    w.blank();
    open_namespaces(&mut w, ctx);

    w.line(format!("class {} : public IProxyBroker<{}> {{", proxy, name));
    w.line("public:");
    w.indent();
    w.line(format!(
        "explicit {}(const sptr<IRemoteObject>& remote) : IProxyBroker<{}>(remote) {{}}",
        proxy, name
    ));
    w.blank();
    w.line(format!("virtual ~{}() = default;", proxy));
    w.blank();
    for (_, method) in ctx.methods()? {
        w.line(format!("int32_t {}({}) override;", method.name, method_params(ctx, method)?));
        w.blank();
    }
    w.line("bool IsProxy() override");
    w.open("{");
    w.line("return true;");
    w.close("}");
    w.blank();
    w.dedent();
    w.line("private:");
    w.indent();
    w.line(format!("static inline BrokerDelegator<{p}> delegator_;", p = proxy));
    w.dedent();
    w.line("};");

    end_header(&mut w, ctx, &file);
    Ok(GeneratedFile {
        name:     file,
        contents: w.finish(),
    })
}

fn source(ctx: &Context) -> Result<GeneratedFile> {
    let mut w = CodeWriter::spaces();
    ctx.license(&mut w);
    w.line(format!("#include \"{}\"", base_file(ctx, "proxy", "h")));
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <iservmgr_hdi.h>");
    w.line("#include <message_option.h>");
    w.line("#include <message_parcel.h>");
    w.line("#include <object_collector.h>");
    w.line("#include <securec.h>");
    w.line("#include <string_ex.h>");
    log_tag(&mut w, &format!("{}_proxy", to_snake_case(ctx.base())));
    open_namespaces(&mut w, ctx);

    entry_points(&mut w, ctx);
    for (_, method) in ctx.methods()? {
        proxy_method(&mut w, ctx, method)?;
        w.blank();
    }

    close_namespaces(&mut w, ctx);
    Ok(GeneratedFile {
        name:     base_file(ctx, "proxy", "cpp"),
        contents: w.finish(),
    })
}

fn entry_points(w: &mut CodeWriter, ctx: &Context) {
    let name = &ctx.ast.name;
    let proxy = format!("{}Proxy", ctx.base());

    if !is_callback(ctx) {
        w.line(format!("sptr<{n}> {n}::Get()", n = name));
        w.open("{");
        w.line(format!("return {}::Get(\"{}\");", name, service_name(ctx)));
        w.close("}");
        w.blank();

        w.line(format!("sptr<{n}> {n}::Get(const std::string& serviceName)", n = name));
        w.open("{");
        w.line("auto servMgr = OHOS::HDI::ServiceManager::V1_0::IServiceManager::Get();");
        w.open("if (servMgr == nullptr) {");
        w.line("HDF_LOGE(\"%{public}s: get IServiceManager failed!\", __func__);");
        w.line("return nullptr;");
        w.close("}");
        w.blank();
        w.line("sptr<IRemoteObject> remote = servMgr->GetService(serviceName.c_str());");
        w.open("if (remote == nullptr) {");
        w.line("HDF_LOGE(\"%{public}s: get remote object failed!\", __func__);");
        w.line("return nullptr;");
        w.close("}");
        w.line(format!("return {}::CastFrom(remote);", name));
        w.close("}");
        w.blank();
    }

    w.line(format!("sptr<{n}> {n}::CastFrom(const sptr<IRemoteObject>& remote)", n = name));
    w.open("{");
    w.open("if (remote == nullptr) {");
    w.line("return nullptr;");
    w.close("}");
    w.line(format!("sptr<{p}> proxy = new {p}(remote);", p = proxy));
    w.blank();
    w.line("uint32_t serMajorVer = 0;");
    w.line("uint32_t serMinorVer = 0;");
    w.line("int32_t ret = proxy->GetVersion(serMajorVer, serMinorVer);");
    w.open("if (ret != HDF_SUCCESS) {");
    w.line("HDF_LOGE(\"%{public}s: get version failed!\", __func__);");
    w.line("return nullptr;");
    w.close("}");
    w.blank();
    w.open("if (serMajorVer != MAJOR_VERSION || serMinorVer < MINOR_VERSION) {");
    w.line("HDF_LOGE(\"%{public}s:check version failed! version of service:%u.%u, version of client:%u.%u\", __func__,");
    w.line("    serMajorVer, serMinorVer, MAJOR_VERSION, MINOR_VERSION);");
    w.line("return nullptr;");
    w.close("}");
    w.blank();
    w.line("return proxy;");
    w.close("}");
    w.blank();
}

fn proxy_method(w: &mut CodeWriter, ctx: &Context, method: &Method) -> Result<()> {
    let types = ctx.types();
    let interface = ctx.interface()?;
    let local = local_prefix(ctx);
    let data = format!("{}Data", local);
    let reply = format!("{}Reply", local);
    let option = format!("{}Option", local);
    let ret = format!("{}Ret", local);

    w.line(format!(
        "int32_t {}Proxy::{}({})",
        ctx.base(),
        method.name,
        method_params(ctx, method)?
    ));
    w.open("{");
    w.line(format!("MessageParcel {};", data));
    w.line(format!("MessageParcel {};", reply));
    let flags = if interface.is_oneway(method) { "TF_ASYNC" } else { "TF_SYNC" };
    w.line(format!("MessageOption {}(MessageOption::{});", option, flags));
    w.blank();
    types::guard(
        w,
        &format!("!{}.WriteInterfaceToken({}::GetDescriptor())", data, ctx.ast.name),
        "write interface descriptor",
        INVALID_PARAM,
    );
    w.blank();

    if method.needs_capacity_flag(types) {
        // Reply buffers grow on demand, so no capacities are announced.
        types::guard(w, &format!("!{}.WriteBool(false)", data), "write flag of memory setting", INVALID_PARAM);
        w.blank();
    }

    for param in method.in_params() {
        types::write(w, ctx, param.ty, &data, &param.name, INVALID_PARAM, 0)?;
        w.blank();
    }

    w.line("sptr<IRemoteObject> remote = Remote();");
    w.open("if (remote == nullptr) {");
    w.line("HDF_LOGE(\"%{public}s: invalid remote object!\", __func__);");
    w.line("return HDF_ERR_INVALID_OBJECT;");
    w.close("}");
    w.blank();
    w.line(format!(
        "int32_t {} = remote->SendRequest({}, {}, {}, {});",
        ret,
        cmd_name(ctx, method),
        data,
        reply,
        option
    ));
    w.open(format!("if ({} != HDF_SUCCESS) {{", ret));
    w.line(format!(
        "HDF_LOGE(\"%{{public}}s failed, error code is %{{public}}d\", __func__, {});",
        ret
    ));
    w.line(format!("return {};", ret));
    w.close("}");
    w.blank();

    for param in method.out_params() {
        types::read(w, ctx, param.ty, &reply, &param.name, INVALID_PARAM, 0)?;
        w.blank();
    }
    w.line(format!("return {};", ret));
    w.close("}");
    Ok(())
}
