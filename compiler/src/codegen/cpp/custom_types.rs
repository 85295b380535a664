use crate::{
    ast::{StructType, TypeKind},
    codegen::{
        cpp::{begin_header, close_namespaces, end_header, header_file, import_includes, log_tag, open_namespaces, types},
        writer::CodeWriter,
        enum_literal,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

const RETURN_FALSE: &str = "return false;";

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    Ok(vec![header(ctx)?, source(ctx)?])
}

fn structs<'a>(ctx: &Context<'a>) -> Vec<&'a StructType> {
    let types = ctx.types();
    ctx.custom_types()
        .into_iter()
        .filter_map(|id| match types.get(id) {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn header(ctx: &Context) -> Result<GeneratedFile> {
    let types = ctx.types();
    let file = header_file(ctx.ast);
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line("#include <cstdbool>");
    w.line("#include <cstdint>");
    w.line("#include <map>");
    w.line("#include <string>");
    w.line("#include <vector>");
    w.line("#include <message_parcel.h>");
    import_includes(&mut w, ctx);
    w.blank();
    open_namespaces(&mut w, ctx);
    w.line("using namespace OHOS;");
    w.blank();

    for id in ctx.custom_types() {
        match types.get(id) {
            TypeKind::Enum(e) => {
                w.open(format!("enum {} : {} {{", e.name, types::primitive_type(e.base)));
                for member in &e.members {
                    w.line(format!("{} = {},", member.name, enum_literal(member.value)));
                }
                w.close("};");
            }
            TypeKind::Struct(s) => {
                w.open(format!("struct {} {{", s.name));
                for member in &s.members {
                    w.line(format!("{} {};", types::cpp_type(ctx, member.ty)?, member.name));
                }
                w.close("} __attribute__ ((aligned(8)));");
            }
            TypeKind::Union(u) => {
                w.open(format!("union {} {{", u.name));
                for member in &u.members {
                    w.line(format!("{} {};", types::cpp_type(ctx, member.ty)?, member.name));
                }
                w.close("} __attribute__ ((aligned(8)));");
            }
            _ => continue,
        }
        w.blank();
    }

    for s in structs(ctx) {
        w.line(format!(
            "bool {n}BlockMarshalling(OHOS::MessageParcel &data, const {n}& dataBlock);",
            n = s.name
        ));
        w.blank();
        w.line(format!(
            "bool {n}BlockUnmarshalling(OHOS::MessageParcel &data, {n}& dataBlock);",
            n = s.name
        ));
        w.blank();
    }

    end_header(&mut w, ctx, &file);
    Ok(GeneratedFile {
        name:     file,
        contents: w.finish(),
    })
}

fn source(ctx: &Context) -> Result<GeneratedFile> {
    let mut w = CodeWriter::spaces();
    ctx.license(&mut w);
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <securec.h>");
    log_tag(&mut w, &to_snake_case(&ctx.ast.name));
    open_namespaces(&mut w, ctx);

    for s in structs(ctx) {
        w.line(format!(
            "bool {n}BlockMarshalling(OHOS::MessageParcel& data, const {n}& dataBlock)",
            n = s.name
        ));
        w.open("{");
        for member in &s.members {
            let value = format!("dataBlock.{}", member.name);
            types::write(&mut w, ctx, member.ty, "data", &value, RETURN_FALSE, 0)?;
            w.blank();
        }
        w.line("return true;");
        w.close("}");
        w.blank();

        w.line(format!(
            "bool {n}BlockUnmarshalling(OHOS::MessageParcel& data, {n}& dataBlock)",
            n = s.name
        ));
        w.open("{");
        for member in &s.members {
            let target = format!("dataBlock.{}", member.name);
            types::read(&mut w, ctx, member.ty, "data", &target, RETURN_FALSE, 0)?;
            w.blank();
        }
        w.line("return true;");
        w.close("}");
        w.blank();
    }

    close_namespaces(&mut w, ctx);
    Ok(GeneratedFile {
        name:     format!("{}.cpp", ctx.ast.name.to_lowercase()),
        contents: w.finish(),
    })
}
