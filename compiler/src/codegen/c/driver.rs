use crate::{
    codegen::{
        c::{base_file, interface_macro, local_prefix, log_tag, service_name},
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

/// HDF driver entry hosting the service and routing device I/O to the stub.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let name = &ctx.ast.name;
    let base = ctx.base();
    let host = format!("Hdf{}Host", base);
    let module_name = service_name(ctx);
    let mut w = CodeWriter::spaces();

    ctx.license(&mut w);
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_device_desc.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <osal_mem.h>");
    w.line(format!("#include \"{}\"", base_file(ctx, "stub", "h")));
    log_tag(&mut w, &format!("{}_driver", to_snake_case(base)));

    w.open(format!("struct {} {{", host));
    w.line("struct IDeviceIoService ioService;");
    w.line(format!("struct {} *service;", name));
    w.close("};");
    w.blank();

    w.line(format!(
        "static int32_t {}DriverDispatch(struct HdfDeviceIoClient *client, int cmdId, struct HdfSBuf *data,",
        base
    ));
    w.line("    struct HdfSBuf *reply)");
    w.open("{");
    w.line(format!(
        "struct {h} *host = CONTAINER_OF(client->device->service, struct {h}, ioService);",
        h = host
    ));
    w.open("if (host->service == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: invalid service obj\", __func__);");
    w.line("return HDF_ERR_INVALID_OBJECT;");
    w.close("}");
    w.blank();
    w.line(format!("return {}OnRemoteRequest(host->service, cmdId, data, reply);", base));
    w.close("}");
    w.blank();

    w.line(format!("static int Hdf{}DriverInit(struct HdfDeviceObject *deviceObject)", base));
    w.open("{");
    w.line("HDF_LOGI(\"%{public}s: driver init start\", __func__);");
    w.line("return HDF_SUCCESS;");
    w.close("}");
    w.blank();

    w.line(format!("static int Hdf{}DriverBind(struct HdfDeviceObject *deviceObject)", base));
    w.open("{");
    w.line("HDF_LOGI(\"%{public}s: driver bind start\", __func__);");
    if !ctx.kernel() {
        w.line(format!(
            "int32_t ret = HdfDeviceObjectSetInterfaceDesc(deviceObject, {}_INTERFACE_DESC);",
            interface_macro(ctx)
        ));
        w.open("if (ret != HDF_SUCCESS) {");
        w.line("HDF_LOGE(\"%{public}s: failed to set interface descriptor of device object\", __func__);");
        w.line("return ret;");
        w.close("}");
        w.blank();
    }
    w.line(format!(
        "struct {h} *host = (struct {h} *)OsalMemCalloc(sizeof(struct {h}));",
        h = host
    ));
    w.open("if (host == NULL) {");
    w.line(format!("HDF_LOGE(\"%{{public}}s: create {} object failed!\", __func__);", host));
    w.line("return HDF_ERR_MALLOC_FAIL;");
    w.close("}");
    w.blank();
    w.line(format!("host->ioService.Dispatch = {}DriverDispatch;", base));
    w.line("host->ioService.Open = NULL;");
    w.line("host->ioService.Release = NULL;");
    w.line(format!("host->service = {}ServiceGet();", base));
    w.open("if (host->service == NULL) {");
    w.line("OsalMemFree(host);");
    w.line("HDF_LOGE(\"%{public}s: failed to get service object\", __func__);");
    w.line("return HDF_FAILURE;");
    w.close("}");
    w.blank();
    w.line("deviceObject->service = &host->ioService;");
    w.line("return HDF_SUCCESS;");
    w.close("}");
    w.blank();

    w.line(format!("static void Hdf{}DriverRelease(struct HdfDeviceObject *deviceObject)", base));
    w.open("{");
    w.line("HDF_LOGI(\"%{public}s: driver release start\", __func__);");
    w.open("if (deviceObject->service == NULL) {");
    w.line("return;");
    w.close("}");
    w.blank();
    w.line(format!(
        "struct {h} *host = CONTAINER_OF(deviceObject->service, struct {h}, ioService);",
        h = host
    ));
    w.open("if (host != NULL) {");
    w.line(format!("{}ServiceRelease(host->service);", base));
    w.line("OsalMemFree(host);");
    w.close("}");
    w.close("}");
    w.blank();

    let entry = format!("g_{}DriverEntry", local_prefix(ctx));
    w.open(format!("struct HdfDriverEntry {} = {{", entry));
    w.line(".moduleVersion = 1,");
    w.line(format!(".moduleName = \"{}\",", module_name));
    w.line(format!(".Bind = Hdf{}DriverBind,", base));
    w.line(format!(".Init = Hdf{}DriverInit,", base));
    w.line(format!(".Release = Hdf{}DriverRelease,", base));
    w.close("};");
    w.blank();
    w.line("#ifdef __cplusplus");
    w.line("extern \"C\" {");
    w.line("#endif /* __cplusplus */");
    w.line(format!("HDF_INIT({});", entry));
    w.line("#ifdef __cplusplus");
    w.line("}");
    w.line("#endif /* __cplusplus */");

    Ok(vec![GeneratedFile {
        name:     base_file(ctx, "driver", "c"),
        contents: w.finish(),
    }])
}
