use crate::{
    codegen::{
        cpp::{base_file, local_prefix, log_tag, qualified_namespace, service_name},
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

/// The HDF host glue: binds the service object behind a stub and forwards
/// `HdfSBuf` requests to it as `MessageParcel`s.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let base = ctx.base();
    let host = format!("Hdf{}Host", base);
    let local = local_prefix(ctx);
    let namespace = qualified_namespace(ctx, ctx.ast.namespace);
    let mut w = CodeWriter::spaces();

    ctx.license(&mut w);
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_device_desc.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <hdf_sbuf_ipc.h>");
    w.line(format!("#include \"{}\"", base_file(ctx, "service", "h")));
    w.line(format!("#include \"{}\"", base_file(ctx, "stub", "h")));
    log_tag(&mut w, &format!("{}_driver", to_snake_case(base)));

    w.line(format!("using namespace {};", namespace));
    w.blank();

    w.open(format!("struct {} {{", host));
    w.line("struct IDeviceIoService ioService;");
    w.line("OHOS::sptr<OHOS::IRemoteObject> stub;");
    w.close("};");
    w.blank();

    w.line(format!(
        "static int32_t {}DriverDispatch(struct HdfDeviceIoClient *client, int cmdId, struct HdfSBuf *data,",
        base
    ));
    w.line("    struct HdfSBuf *reply)");
    w.open("{");
    w.line(format!(
        "auto *{l}Host = CONTAINER_OF(client->device->service, struct {}, ioService);",
        host,
        l = local
    ));
    w.blank();
    w.line("OHOS::MessageParcel *dataParcel = nullptr;");
    w.line("OHOS::MessageParcel *replyParcel = nullptr;");
    w.line("OHOS::MessageOption option;");
    w.blank();
    w.open("if (SbufToParcel(data, &dataParcel) != HDF_SUCCESS) {");
    w.line("HDF_LOGE(\"%{public}s: invalid data sbuf object to dispatch\", __func__);");
    w.line("return HDF_ERR_INVALID_PARAM;");
    w.close("}");
    w.open("if (SbufToParcel(reply, &replyParcel) != HDF_SUCCESS) {");
    w.line("HDF_LOGE(\"%{public}s: invalid reply sbuf object to dispatch\", __func__);");
    w.line("return HDF_ERR_INVALID_PARAM;");
    w.close("}");
    w.blank();
    w.line(format!(
        "return {}Host->stub->SendRequest(cmdId, *dataParcel, *replyParcel, option);",
        local
    ));
    w.close("}");
    w.blank();

    w.line(format!("static int {}DriverInit(struct HdfDeviceObject *deviceObject)", base));
    w.open("{");
    w.line("HDF_LOGI(\"%{public}s: driver init start\", __func__);");
    w.line("return HDF_SUCCESS;");
    w.close("}");
    w.blank();

    w.line(format!("static int {}DriverBind(struct HdfDeviceObject *deviceObject)", base));
    w.open("{");
    w.line("HDF_LOGI(\"%{public}s: driver bind start\", __func__);");
    w.line(format!("auto *{l}Host = new (std::nothrow) {};", host, l = local));
    w.open(format!("if ({}Host == nullptr) {{", local));
    w.line(format!("HDF_LOGE(\"%{{public}}s: failed to create {} object\", __func__);", host));
    w.line("return HDF_FAILURE;");
    w.close("}");
    w.blank();
    w.line(format!("{}Host->ioService.Dispatch = {}DriverDispatch;", local, base));
    w.line(format!("{}Host->ioService.Open = NULL;", local));
    w.line(format!("{}Host->ioService.Release = NULL;", local));
    w.blank();
    w.line(format!("auto serviceImpl = new (std::nothrow) {}Service();", base));
    w.open("if (serviceImpl == nullptr) {");
    w.line("HDF_LOGE(\"%{public}s: failed to create service implement\", __func__);");
    w.line(format!("delete {}Host;", local));
    w.line("return HDF_FAILURE;");
    w.close("}");
    w.blank();
    w.line(format!("{}Host->stub = new (std::nothrow) {}Stub(serviceImpl);", local, base));
    w.open(format!("if ({}Host->stub == nullptr) {{", local));
    w.line("HDF_LOGE(\"%{public}s: failed to create stub object\", __func__);");
    w.line(format!("delete {}Host;", local));
    w.line("return HDF_FAILURE;");
    w.close("}");
    w.blank();
    w.line(format!("deviceObject->service = &{}Host->ioService;", local));
    w.line("return HDF_SUCCESS;");
    w.close("}");
    w.blank();

    w.line(format!("static void {}DriverRelease(struct HdfDeviceObject *deviceObject)", base));
    w.open("{");
    w.line("HDF_LOGI(\"%{public}s: driver release start\", __func__);");
    w.open("if (deviceObject->service == nullptr) {");
    w.line("return;");
    w.close("}");
    w.blank();
    w.line(format!(
        "auto *{l}Host = CONTAINER_OF(deviceObject->service, struct {}, ioService);",
        host,
        l = local
    ));
    w.line(format!("delete {}Host;", local));
    w.close("}");
    w.blank();

    let entry = format!("g_{}DriverEntry", local);
    w.open(format!("struct HdfDriverEntry {} = {{", entry));
    w.line(".moduleVersion = 1,");
    w.line(format!(".moduleName = \"{}\",", service_name(ctx)));
    w.line(format!(".Bind = {}DriverBind,", base));
    w.line(format!(".Init = {}DriverInit,", base));
    w.line(format!(".Release = {}DriverRelease,", base));
    w.close("};");
    w.blank();
    w.line("#ifdef __cplusplus");
    w.line("extern \"C\" {");
    w.line("#endif");
    w.line(format!("HDF_INIT({});", entry));
    w.line("#ifdef __cplusplus");
    w.line("}");
    w.line("#endif");

    Ok(vec![GeneratedFile {
        name:     base_file(ctx, "driver", "cpp"),
        contents: w.finish(),
    }])
}
