use crate::{
    codegen::{
        c::{
            begin_extern_c,
            begin_header,
            cmd_enum,
            cmd_name,
            end_header,
            header_file,
            include_of,
            interface_macro,
            is_callback,
            method_params,
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
};

/// The interface header: descriptor and version macros, the command ids and
/// the function table shared by proxy and stub.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let name = &ctx.ast.name;
    let prefix = interface_macro(ctx);
    let file = header_file(ctx.ast);
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line("#include <stdbool.h>");
    w.line("#include <stdint.h>");
    for import in ctx.imports() {
        w.line(include_of(ctx, import));
    }
    w.blank();
    begin_extern_c(&mut w);

    if !ctx.kernel() {
        w.line("struct HdfRemoteService;");
        w.blank();
    }
    w.line(format!("#define {}_INTERFACE_DESC \"{}\"", prefix, ctx.ast.full_name()));
    w.blank();
    w.line(format!("#define {}_MAJOR_VERSION {}", prefix, ctx.ast.version.major));
    w.line(format!("#define {}_MINOR_VERSION {}", prefix, ctx.ast.version.minor));
    w.blank();

    w.open(format!("enum {} {{", cmd_enum(ctx)));
    for (id, method) in ctx.methods()? {
        w.line(format!("{} = {},", cmd_name(ctx, method), id));
    }
    w.close("};");
    w.blank();

    w.open(format!("struct {} {{", name));
    for (_, method) in ctx.methods()? {
        w.line(format!("int32_t (*{})({});", method.name, method_params(ctx, method)?));
        w.blank();
    }
    if !ctx.kernel() {
        w.line(format!("struct HdfRemoteService* (*AsObject)(struct {} *self);", name));
    }
    w.close("};");
    w.blank();

    if !is_callback(ctx) {
        w.line(format!("struct {n} *{n}Get(void);", n = name));
        w.blank();
    }
    if ctx.kernel() || !is_callback(ctx) {
        w.line(format!("struct {n} *{n}GetInstance(const char *serviceName);", n = name));
        w.blank();
    }
    if !ctx.kernel() {
        w.line(format!(
            "struct {n} *{n}GetFromRemote(struct HdfRemoteService *remote);",
            n = name
        ));
        w.blank();
    }
    w.line(format!("void {n}Release(struct {n} *instance);", n = name));

    end_header(&mut w, ctx, &file);
    Ok(vec![GeneratedFile {
        name:     file,
        contents: w.finish(),
    }])
}
