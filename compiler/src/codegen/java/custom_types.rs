use std::collections::BTreeSet;

use crate::{
    ast::{EnumType, PrimitiveKind, StructType, TypeKind},
    codegen::{
        java::{begin_file, types},
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
};

const RETURN_FALSE: &str = "return false;";

/// One class per types unit; enums and structs are nested in it.
pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    let arena = ctx.types();
    let name = &ctx.ast.name;
    let declared = ctx.custom_types();

    let mut imports = BTreeSet::new();
    for &id in &declared {
        if let TypeKind::Struct(s) = arena.get(id) {
            imports.insert("ohos.utils.Parcel".to_owned());
            imports.insert("ohos.utils.Sequenceable".to_owned());
            for member in &s.members {
                types::collect_imports(ctx, member.ty, &mut imports);
            }
        }
    }

    let mut w = CodeWriter::spaces();
    begin_file(&mut w, ctx, &imports);

    w.open(format!("public final class {} {{", name));
    w.line("private static final int HDI_BUFF_MAX_SIZE = 1024 * 200;");
    w.blank();
    w.line(format!("private {}() {{", name));
    w.line("}");
    for id in declared {
        match arena.get(id) {
            TypeKind::Enum(e) => {
                w.blank();
                enum_class(&mut w, e);
            }
            TypeKind::Struct(s) => {
                w.blank();
                struct_class(&mut w, ctx, s)?;
            }
            _ => {}
        }
    }
    w.close("}");

    Ok(vec![GeneratedFile {
        name:     format!("{}.java", name),
        contents: w.finish(),
    }])
}

/// Unsigned bases are spelled with the signed Java type of the same width,
/// so wide values wrap the way the wire bits do.
fn java_value(base: PrimitiveKind, value: i128) -> i128 {
    match base {
        PrimitiveKind::UInt => value as u32 as i32 as i128,
        PrimitiveKind::ULong => value as u64 as i64 as i128,
        _ => value,
    }
}

fn enum_class(w: &mut CodeWriter, e: &EnumType) {
    let base = types::primitive_type(e.base, false);
    w.open(format!("public enum {} {{", e.name));
    let last = e.members.len().saturating_sub(1);
    for (i, member) in e.members.iter().enumerate() {
        let value = java_value(e.base, member.value);
        let value = if base == "long" {
            format!("{}L", value)
        } else if base == "int" {
            value.to_string()
        } else {
            format!("({}) {}", base, value)
        };
        let end = if i == last { ";" } else { "," };
        w.line(format!("{}({}){}", member.name, value, end));
    }
    if e.members.is_empty() {
        w.line(";");
    }
    w.blank();
    w.line(format!("private final {} value;", base));
    w.blank();
    w.open(format!("{}({} value) {{", e.name, base));
    w.line("this.value = value;");
    w.close("}");
    w.blank();
    w.open(format!("public {} getValue() {{", base));
    w.line("return value;");
    w.close("}");
    w.blank();
    w.open(format!("public static {} fromValue({} value) {{", e.name, base));
    w.open(format!("for ({} item : values()) {{", e.name));
    w.open("if (item.value == value) {");
    w.line("return item;");
    w.close("}");
    w.close("}");
    w.line("return null;");
    w.close("}");
    w.close("}");
}

fn struct_class(w: &mut CodeWriter, ctx: &Context, s: &StructType) -> Result<()> {
    w.open(format!("public static final class {} implements Sequenceable {{", s.name));
    for member in &s.members {
        w.line(types::field_decl(ctx, member.ty, &member.name)?);
    }
    w.blank();

    w.line("@Override");
    w.open("public boolean marshalling(Parcel data) {");
    for member in &s.members {
        types::write(w, ctx, member.ty, "data", &format!("this.{}", member.name), 0)?;
    }
    w.line("return true;");
    w.close("}");
    w.blank();

    w.line("@Override");
    w.open("public boolean unmarshalling(Parcel data) {");
    for member in &s.members {
        types::read(w, ctx, member.ty, "data", &format!("this.{}", member.name), RETURN_FALSE, 0)?;
    }
    w.line("return true;");
    w.close("}");
    w.close("}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_enum_values_wrap_to_the_signed_width() {
        assert_eq!(java_value(PrimitiveKind::ULong, u64::MAX as i128), -1);
        assert_eq!(java_value(PrimitiveKind::UInt, u32::MAX as i128), -1);
        assert_eq!(java_value(PrimitiveKind::UInt, 7), 7);
        assert_eq!(java_value(PrimitiveKind::Long, i64::MIN as i128), i64::MIN as i128);
    }
}
