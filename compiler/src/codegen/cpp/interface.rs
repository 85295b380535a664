use crate::{
    ast::VERSION_MAJOR_PARAM,
    codegen::{
        cpp::{
            begin_header,
            cmd_enum,
            cmd_name,
            end_header,
            header_file,
            import_includes,
            is_callback,
            method_params,
            open_namespaces,
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
};

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let name = &ctx.ast.name;
    let version = ctx.ast.version;
    let file = header_file(ctx.ast);
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line("#include <stdint.h>");
    w.line("#include <map>");
    w.line("#include <string>");
    w.line("#include <vector>");
    w.line("#include <hdf_base.h>");
    w.line("#include <hdi_base.h>");
    import_includes(&mut w, ctx);
    w.blank();
    w.line("#ifndef HDI_BUFF_MAX_SIZE");
    w.line("#define HDI_BUFF_MAX_SIZE (1024 * 200)");
    w.line("#endif");
    w.blank();
    open_namespaces(&mut w, ctx);
    w.line("using namespace OHOS;");
    w.line("using namespace OHOS::HDI;");
    w.blank();

    w.open(format!("enum {} {{", cmd_enum(ctx)));
    for (id, method) in ctx.methods()? {
        w.line(format!("{} = {},", cmd_name(ctx, method), id));
    }
    w.close("};");
    w.blank();

    w.line(format!("class {} : public HdiBase {{", name));
    w.line("public:");
    w.indent();
    w.line(format!("DECLARE_HDI_DESCRIPTOR(u\"{}\");", ctx.ast.full_name()));
    w.blank();
    w.line(format!("static constexpr uint32_t MAJOR_VERSION = {};", version.major));
    w.line(format!("static constexpr uint32_t MINOR_VERSION = {};", version.minor));
    w.blank();
    w.line(format!("virtual ~{}() = default;", name));
    w.blank();
    if !is_callback(ctx) {
        w.line(format!("static sptr<{}> Get();", name));
        w.blank();
        w.line(format!("static sptr<{}> Get(const std::string &serviceName);", name));
        w.blank();
    }
    w.line(format!("static sptr<{}> CastFrom(const sptr<IRemoteObject> &remote);", name));
    w.blank();

    for (_, method) in ctx.methods()? {
        let signature = format!("virtual int32_t {}({})", method.name, method_params(ctx, method)?);
        if method.synthesized {
            w.line(signature);
            w.open("{");
            for param in method.out_params() {
                let which = if param.name == VERSION_MAJOR_PARAM { "MAJOR" } else { "MINOR" };
                w.line(format!("{} = {}_VERSION;", param.name, which));
            }
            w.line("return HDF_SUCCESS;");
            w.close("}");
        } else {
            w.line(format!("{} = 0;", signature));
        }
        w.blank();
    }
    w.line("virtual bool IsProxy()");
    w.open("{");
    w.line("return false;");
    w.close("}");
    w.dedent();
    w.line("};");

    end_header(&mut w, ctx, &file);
    Ok(vec![GeneratedFile {
        name:     file,
        contents: w.finish(),
    }])
}
