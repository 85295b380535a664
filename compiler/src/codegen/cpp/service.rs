use crate::{
    codegen::{
        cpp::{base_file, begin_header, close_namespaces, end_header, header_file, log_tag, method_params, open_namespaces},
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    Ok(vec![header(ctx)?, source(ctx)?])
}

fn header(ctx: &Context) -> Result<GeneratedFile> {
    let service = format!("{}Service", ctx.base());
    let file = base_file(ctx, "service", "h");
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    w.blank();
    open_namespaces(&mut w, ctx);

    w.line(format!("class {} : public {} {{", service, ctx.ast.name));
    w.line("public:");
    w.indent();
    w.line(format!("{}() = default;", service));
    w.line(format!("virtual ~{}() = default;", service));
    w.blank();
    for (_, method) in ctx.methods()? {
        if method.synthesized {
            continue;
        }
        w.line(format!("int32_t {}({}) override;", method.name, method_params(ctx, method)?));
        w.blank();
    }
    w.dedent();
    w.line("};");

    end_header(&mut w, ctx, &file);
    Ok(GeneratedFile {
        name:     file,
        contents: w.finish(),
    })
}

fn source(ctx: &Context) -> Result<GeneratedFile> {
    let name = &ctx.ast.name;
    let service = format!("{}Service", ctx.base());
    let mut w = CodeWriter::spaces();

    ctx.license(&mut w);
    w.line(format!("#include \"{}\"", base_file(ctx, "service", "h")));
    w.line("#include <hdf_base.h>");
    log_tag(&mut w, &format!("{}_service", to_snake_case(ctx.base())));
    open_namespaces(&mut w, ctx);

    w.line(format!("extern \"C\" {} *{}ImplGetInstance(void)", name, ctx.base()));
    w.open("{");
    w.line(format!("return new (std::nothrow) {}();", service));
    w.close("}");

    for (_, method) in ctx.methods()? {
        if method.synthesized {
            continue;
        }
        w.blank();
        w.line(format!("int32_t {}::{}({})", service, method.name, method_params(ctx, method)?));
        w.open("{");
        w.line("return HDF_SUCCESS;");
        w.close("}");
    }

    close_namespaces(&mut w, ctx);
    Ok(GeneratedFile {
        name:     base_file(ctx, "service", "cpp"),
        contents: w.finish(),
    })
}
