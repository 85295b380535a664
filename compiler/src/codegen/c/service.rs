use crate::{
    ast::VERSION_MAJOR_PARAM,
    codegen::{
        c::{base_file, interface_macro, log_tag, method_params},
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

/// Skeleton implementation the service author fills in. Only the version
/// query is implemented.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let name = &ctx.ast.name;
    let base = ctx.base();
    let prefix = interface_macro(ctx);
    let methods = ctx.methods()?;
    let mut w = CodeWriter::spaces();

    ctx.license(&mut w);
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <osal_mem.h>");
    w.line("#include <securec.h>");
    w.line(format!("#include \"{}\"", base_file(ctx, "stub", "h")));
    log_tag(&mut w, &format!("{}_service", to_snake_case(base)));

    w.open(format!("struct {}Service {{", base));
    w.line(format!("struct {}Stub stub;", base));
    w.blank();
    w.line("// please add private data here");
    w.close("};");
    w.blank();

    for (_, method) in &methods {
        w.line(format!("static int32_t {}{}({})", base, method.name, method_params(ctx, method)?));
        w.open("{");
        if method.synthesized {
            for param in method.out_params() {
                let which = if param.name == VERSION_MAJOR_PARAM { "MAJOR" } else { "MINOR" };
                w.line(format!("*{} = {}_{}_VERSION;", param.name, prefix, which));
            }
        }
        w.line("return HDF_SUCCESS;");
        w.close("}");
        w.blank();
    }

    w.line(format!("struct {} *{}ServiceGet(void)", name, base));
    w.open("{");
    w.line(format!(
        "struct {b}Service *service = (struct {b}Service *)OsalMemCalloc(sizeof(struct {b}Service));",
        b = base
    ));
    w.open("if (service == NULL) {");
    w.line(format!("HDF_LOGE(\"%{{public}}s: malloc {}Service obj failed!\", __func__);", base));
    w.line("return NULL;");
    w.close("}");
    w.blank();
    if !ctx.kernel() {
        w.open(format!("if (!{}StubConstruct(&service->stub)) {{", base));
        w.line(format!("HDF_LOGE(\"%{{public}}s: construct {}Stub obj failed!\", __func__);", base));
        w.line("OsalMemFree(service);");
        w.line("return NULL;");
        w.close("}");
        w.blank();
    }
    for (_, method) in &methods {
        w.line(format!("service->stub.interface.{m} = {}{m};", base, m = method.name));
    }
    w.line("return &service->stub.interface;");
    w.close("}");
    w.blank();

    w.line(format!("void {}ServiceRelease(struct {} *instance)", base, name));
    w.open("{");
    w.open("if (instance == NULL) {");
    w.line("return;");
    w.close("}");
    w.line(format!("struct {b}Service *service = (struct {b}Service *)instance;", b = base));
    if !ctx.kernel() {
        w.line(format!("{}StubRelease(&service->stub);", base));
    }
    w.line("OsalMemFree(service);");
    w.close("}");

    Ok(vec![GeneratedFile {
        name:     base_file(ctx, "service", "c"),
        contents: w.finish(),
    }])
}
