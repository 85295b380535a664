use crate::{
    ast::{PrimitiveKind, StructType, TypeKind},
    codegen::{
        c::{
            begin_extern_c,
            begin_header,
            end_header,
            header_file,
            include_of,
            log_tag,
            types::{self, OnError},
        },
        writer::CodeWriter,
        enum_literal,
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
    let types = ctx.types();
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
    w.line("struct HdfSBuf;");
    w.blank();

    for id in ctx.custom_types() {
        match types.get(id) {
            TypeKind::Enum(e) => {
                w.open(format!("enum {} {{", e.name));
                for member in &e.members {
                    w.line(format!("{} = {},", member.name, enum_literal(member.value)));
                }
                w.close("};");
            }
            TypeKind::Struct(s) => {
                w.open(format!("struct {} {{", s.name));
                for member in &s.members {
                    for decl in types::member_decls(types, member)? {
                        w.line(decl);
                    }
                }
                w.close("} __attribute__ ((aligned(8)));");
            }
            TypeKind::Union(u) => {
                w.open(format!("union {} {{", u.name));
                for member in &u.members {
                    for decl in types::member_decls(types, member)? {
                        w.line(decl);
                    }
                }
                w.close("} __attribute__ ((aligned(8)));");
            }
            _ => continue,
        }
        w.blank();
    }

    for id in ctx.custom_types() {
        if let TypeKind::Struct(s) = types.get(id) {
            w.line(format!(
                "bool {n}BlockMarshalling(struct HdfSBuf *data, const struct {n} *dataBlock);",
                n = s.name
            ));
            w.blank();
            w.line(format!(
                "bool {n}BlockUnmarshalling(struct HdfSBuf *data, struct {n} *dataBlock);",
                n = s.name
            ));
            w.blank();
            w.line(format!("void {n}Free(struct {n} *dataBlock, bool freeSelf);", n = s.name));
            w.blank();
        }
    }

    end_header(&mut w, ctx, &file);
    Ok(GeneratedFile {
        name:     file,
        contents: w.finish(),
    })
}

fn source(ctx: &Context) -> Result<GeneratedFile> {
    let types = ctx.types();
    let structs: Vec<&StructType> = ctx
        .custom_types()
        .into_iter()
        .filter_map(|id| match types.get(id) {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        })
        .collect();
    let uses_fd = structs.iter().any(|s| {
        s.members.iter().any(|m| {
            let ty = types.element(m.ty).unwrap_or(m.ty);
            types.as_primitive(ty) == Some(PrimitiveKind::FileDescriptor)
        })
    });

    let mut w = CodeWriter::spaces();
    ctx.license(&mut w);
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <hdf_sbuf.h>");
    w.line("#include <osal_mem.h>");
    w.line("#include <securec.h>");
    if uses_fd {
        w.line("#include <unistd.h>");
    }
    log_tag(&mut w, &to_snake_case(&ctx.ast.name));

    for s in structs {
        marshalling(&mut w, ctx, s)?;
        w.blank();
        unmarshalling(&mut w, ctx, s)?;
        w.blank();
        free_function(&mut w, ctx, s)?;
        w.blank();
    }

    Ok(GeneratedFile {
        name:     format!("{}.c", to_snake_case(&ctx.ast.name)),
        contents: w.finish(),
    })
}

fn member_expr(name: &str) -> (String, String) {
    (format!("dataBlock->{}", name), format!("dataBlock->{}Len", name))
}

fn marshalling(w: &mut CodeWriter, ctx: &Context, s: &StructType) -> Result<()> {
    let types = ctx.types();
    w.line(format!(
        "bool {n}BlockMarshalling(struct HdfSBuf *data, const struct {n} *dataBlock)",
        n = s.name
    ));
    w.open("{");
    w.open("if (data == NULL || dataBlock == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: invalid data or dataBlock\", __func__);");
    w.line("return false;");
    w.close("}");
    w.blank();
    for member in &s.members {
        let (value, len) = member_expr(&member.name);
        types::write(w, types, member.ty, "data", &value, Some(&len), &OnError::ReturnFalse, 0)?;
        w.blank();
    }
    w.line("return true;");
    w.close("}");
    Ok(())
}

fn unmarshalling(w: &mut CodeWriter, ctx: &Context, s: &StructType) -> Result<()> {
    let types = ctx.types();
    let owns_memory = s.members.iter().any(|m| types::needs_free(types, m.ty));
    let on_error = if owns_memory {
        OnError::Goto {
            ret:   None,
            label: "ERRORS",
        }
    } else {
        OnError::ReturnFalse
    };

    w.line(format!(
        "bool {n}BlockUnmarshalling(struct HdfSBuf *data, struct {n} *dataBlock)",
        n = s.name
    ));
    w.open("{");
    w.open("if (data == NULL || dataBlock == NULL) {");
    w.line("HDF_LOGE(\"%{public}s: invalid data or dataBlock\", __func__);");
    w.line("return false;");
    w.close("}");
    w.open(format!(
        "if (memset_s(dataBlock, sizeof(struct {n}), 0, sizeof(struct {n})) != EOK) {{",
        n = s.name
    ));
    w.line("return false;");
    w.close("}");
    w.blank();
    for member in &s.members {
        let (target, len) = member_expr(&member.name);
        types::read(w, types, member.ty, "data", &target, Some(&len), &on_error, 0)?;
        w.blank();
    }
    w.line("return true;");
    if owns_memory {
        w.dedent();
        w.line("ERRORS:");
        w.indent();
        w.line(format!("{}Free(dataBlock, false);", s.name));
        w.line("return false;");
    }
    w.close("}");
    Ok(())
}

fn free_function(w: &mut CodeWriter, ctx: &Context, s: &StructType) -> Result<()> {
    let types = ctx.types();
    w.line(format!("void {n}Free(struct {n} *dataBlock, bool freeSelf)", n = s.name));
    w.open("{");
    w.open("if (dataBlock == NULL) {");
    w.line("return;");
    w.close("}");
    w.blank();
    for member in &s.members {
        if types::needs_free(types, member.ty) {
            let (target, len) = member_expr(&member.name);
            types::free(w, types, member.ty, &target, Some(&len), 0)?;
            w.blank();
        }
    }
    w.open("if (freeSelf) {");
    w.line("OsalMemFree(dataBlock);");
    w.close("}");
    w.close("}");
    Ok(())
}
