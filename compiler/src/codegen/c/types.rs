//! C spellings and HdfSBuf marshalling statements for every type kind.
//!
//! Statement builders take C expressions as strings. A value expression
//! always denotes the object itself (`*name` for a pointer parameter); a
//! target is an lvalue of the same type. Arrays and lists travel as a
//! pointer expression plus a separate length expression.

use crate::{
    ast::{Direction, Member, Parameter, PrimitiveKind, TypeArena, TypeId, TypeKind},
    codegen::writer::CodeWriter,
    error::{HdiError, Result},
    utils::quote,
};

fn unsupported(types: &TypeArena, ty: TypeId) -> HdiError {
    HdiError::Generate(format!("{} is not supported in C", quote(&types.display_name(ty))))
}

pub(crate) fn primitive_type(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Boolean => "bool",
        PrimitiveKind::Byte => "int8_t",
        PrimitiveKind::Short => "int16_t",
        PrimitiveKind::Int => "int32_t",
        PrimitiveKind::Long => "int64_t",
        PrimitiveKind::Float => "float",
        PrimitiveKind::Double => "double",
        PrimitiveKind::UChar => "uint8_t",
        PrimitiveKind::UShort => "uint16_t",
        PrimitiveKind::UInt => "uint32_t",
        PrimitiveKind::ULong => "uint64_t",
        PrimitiveKind::String => "char*",
        PrimitiveKind::FileDescriptor => "int",
        PrimitiveKind::Void => "void",
    }
}

/// Suffix of the `HdfSbufWrite*` / `HdfSbufRead*` pair for fixed-width kinds.
fn sbuf_suffix(kind: PrimitiveKind) -> Option<&'static str> {
    Some(match kind {
        PrimitiveKind::Boolean | PrimitiveKind::Byte => "Int8",
        PrimitiveKind::Short => "Int16",
        PrimitiveKind::Int => "Int32",
        PrimitiveKind::Long => "Int64",
        PrimitiveKind::UChar => "Uint8",
        PrimitiveKind::UShort => "Uint16",
        PrimitiveKind::UInt => "Uint32",
        PrimitiveKind::ULong => "Uint64",
        PrimitiveKind::Float => "Float",
        PrimitiveKind::Double => "Double",
        _ => return None,
    })
}

pub(crate) fn c_type(types: &TypeArena, ty: TypeId) -> Result<String> {
    Ok(match types.get(ty) {
        TypeKind::Primitive(kind) => primitive_type(*kind).to_owned(),
        TypeKind::Enum(e) => format!("enum {}", e.name),
        TypeKind::Struct(s) => format!("struct {}", s.name),
        TypeKind::Union(u) => format!("union {}", u.name),
        TypeKind::Array(element) | TypeKind::List(element) => format!("{}*", c_type(types, *element)?),
        TypeKind::Interface(i) => format!("struct {}*", i.name),
        TypeKind::Map { .. } | TypeKind::Sequenceable(_) | TypeKind::SharedMemQueue(_) => {
            return Err(unsupported(types, ty))
        }
    })
}

/// `*x` -> `x`, anything else -> `&x`.
pub(crate) fn addr_of(expr: &str) -> String {
    match expr.strip_prefix('*') {
        Some(inner) => inner.to_owned(),
        None => format!("&{}", expr),
    }
}

/// Identifier derived from an expression, used to name temporaries:
/// `dataBlock->color` -> `dataBlockColor`.
pub(crate) fn ident(expr: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for c in expr.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if upper && !out.is_empty() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            upper = false;
        } else {
            upper = true;
        }
    }
    out
}

/// Expression as it reads in log messages.
fn shown(expr: &str) -> &str {
    expr.trim_start_matches(|c| c == '*' || c == '&')
}

pub(crate) fn loop_var(depth: usize) -> &'static str {
    ["i", "j", "k", "l", "m", "n"][depth.min(5)]
}

/// What a failed marshalling step does.
pub(crate) enum OnError<'a> {
    /// Log, optionally store an error code, and jump to `label`.
    Goto { ret: Option<&'a str>, label: &'a str },
    ReturnFalse,
}

impl<'a> OnError<'a> {
    pub fn fail(&self, w: &mut CodeWriter, what: &str) {
        self.fail_with(w, what, "HDF_ERR_INVALID_PARAM");
    }

    pub fn fail_with(&self, w: &mut CodeWriter, what: &str, code: &str) {
        w.line(format!("HDF_LOGE(\"%{{public}}s: {} failed!\", __func__);", what));
        match self {
            OnError::Goto { ret, label } => {
                if let Some(ret) = ret {
                    w.line(format!("{} = {};", ret, code));
                }
                w.line(format!("goto {};", label));
            }
            OnError::ReturnFalse => w.line("return false;"),
        }
    }
}

/// `if (<failed>) { <on_error> }`
pub(crate) fn guard(w: &mut CodeWriter, failed: &str, what: &str, on_error: &OnError) {
    w.open(format!("if ({}) {{", failed));
    on_error.fail(w, what);
    w.close("}");
}

/// Declarators of one method parameter. Arrays, lists and `out` strings
/// expand to a pointer plus a length.
pub(crate) fn param_decls(types: &TypeArena, param: &Parameter) -> Result<Vec<String>> {
    let name = &param.name;
    let len = format!("{}Len", name);
    let decls = match (param.direction, types.get(param.ty)) {
        (Direction::In, TypeKind::Primitive(PrimitiveKind::String)) => vec![format!("const char* {}", name)],
        (Direction::In, TypeKind::Struct(_)) | (Direction::In, TypeKind::Union(_)) => {
            vec![format!("const {}* {}", c_type(types, param.ty)?, name)]
        }
        (Direction::In, TypeKind::Array(e)) | (Direction::In, TypeKind::List(e)) => vec![
            format!("const {}* {}", c_type(types, *e)?, name),
            format!("uint32_t {}", len),
        ],
        (Direction::In, _) => vec![format!("{} {}", c_type(types, param.ty)?, name)],
        (Direction::Out, TypeKind::Primitive(PrimitiveKind::String)) => {
            vec![format!("char* {}", name), format!("uint32_t {}", len)]
        }
        (Direction::Out, TypeKind::Array(e)) | (Direction::Out, TypeKind::List(e)) => vec![
            format!("{}* {}", c_type(types, *e)?, name),
            format!("uint32_t* {}", len),
        ],
        (Direction::Out, _) => vec![format!("{}* {}", c_type(types, param.ty)?, name)],
    };
    Ok(decls)
}

/// Field declarations of one struct or union member.
pub(crate) fn member_decls(types: &TypeArena, member: &Member) -> Result<Vec<String>> {
    Ok(match types.get(member.ty) {
        TypeKind::Array(e) | TypeKind::List(e) => vec![
            format!("{}* {};", c_type(types, *e)?, member.name),
            format!("uint32_t {}Len;", member.name),
        ],
        _ => vec![format!("{} {};", c_type(types, member.ty)?, member.name)],
    })
}

/// Emits the write of `value` (of type `ty`) into `parcel`.
pub(crate) fn write(
    w: &mut CodeWriter,
    types: &TypeArena,
    ty: TypeId,
    parcel: &str,
    value: &str,
    len: Option<&str>,
    on_error: &OnError,
    depth: usize,
) -> Result<()> {
    let what = format!("write {}", shown(value));
    match types.get(ty) {
        TypeKind::Primitive(PrimitiveKind::Boolean) => {
            guard(w, &format!("!HdfSbufWriteInt8({}, {} ? 1 : 0)", parcel, value), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::String) => {
            guard(w, &format!("!HdfSbufWriteString({}, {})", parcel, value), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => {
            guard(w, &format!("!HdfSbufWriteFileDescriptor({}, {})", parcel, value), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::Void) => {}
        TypeKind::Primitive(kind) => {
            let suffix = sbuf_suffix(*kind).ok_or_else(|| unsupported(types, ty))?;
            guard(w, &format!("!HdfSbufWrite{}({}, {})", suffix, parcel, value), &what, on_error);
        }
        TypeKind::Enum(e) => {
            let suffix = sbuf_suffix(e.base).ok_or_else(|| unsupported(types, ty))?;
            guard(
                w,
                &format!("!HdfSbufWrite{}({}, ({}){})", suffix, parcel, primitive_type(e.base), value),
                &what,
                on_error,
            );
        }
        TypeKind::Struct(s) => {
            guard(
                w,
                &format!("!{}BlockMarshalling({}, {})", s.name, parcel, addr_of(value)),
                &what,
                on_error,
            );
        }
        TypeKind::Union(u) => {
            guard(
                w,
                &format!(
                    "!HdfSbufWriteUnpadBuffer({}, (const uint8_t *){}, sizeof(union {}))",
                    parcel,
                    addr_of(value),
                    u.name
                ),
                &what,
                on_error,
            );
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            let len = len.ok_or_else(|| HdiError::Generate(format!("no length for {}", shown(value))))?;
            guard(
                w,
                &format!("!HdfSbufWriteUint32({}, {})", parcel, len),
                &format!("write {} size", shown(value)),
                on_error,
            );
            let i = loop_var(depth);
            w.open(format!("for (uint32_t {i} = 0; {i} < {}; {i}++) {{", len, i = i));
            write(w, types, *element, parcel, &format!("({})[{}]", value, i), None, on_error, depth + 1)?;
            w.close("}");
        }
        TypeKind::Interface(_) => {
            guard(
                w,
                &format!("!HdfSbufWriteRemoteService({}, {v}->AsObject({v}))", parcel, v = value),
                &what,
                on_error,
            );
        }
        TypeKind::Map { .. } | TypeKind::Sequenceable(_) | TypeKind::SharedMemQueue(_) => {
            return Err(unsupported(types, ty))
        }
    }
    Ok(())
}

/// Emits the read of one value of type `ty` from `parcel` into `target`.
/// Strings are duplicated out of the parcel; arrays are allocated.
pub(crate) fn read(
    w: &mut CodeWriter,
    types: &TypeArena,
    ty: TypeId,
    parcel: &str,
    target: &str,
    len: Option<&str>,
    on_error: &OnError,
    depth: usize,
) -> Result<()> {
    let what = format!("read {}", shown(target));
    match types.get(ty) {
        TypeKind::Primitive(PrimitiveKind::Boolean) => {
            guard(w, &format!("!HdfSbufReadInt8({}, (int8_t *){})", parcel, addr_of(target)), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::String) => {
            let copy = format!("{}Cp", ident(target));
            w.line(format!("const char *{} = HdfSbufReadString({});", copy, parcel));
            guard(w, &format!("{} == NULL", copy), &what, on_error);
            w.line(format!("{} = strdup({});", target, copy));
            guard(w, &format!("{} == NULL", target), &format!("duplicate {}", shown(target)), on_error);
        }
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => {
            w.line(format!("{} = HdfSbufReadFileDescriptor({});", target, parcel));
            guard(w, &format!("{} < 0", target), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::Void) => {}
        TypeKind::Primitive(kind) => {
            let suffix = sbuf_suffix(*kind).ok_or_else(|| unsupported(types, ty))?;
            guard(w, &format!("!HdfSbufRead{}({}, {})", suffix, parcel, addr_of(target)), &what, on_error);
        }
        TypeKind::Enum(e) => {
            let suffix = sbuf_suffix(e.base).ok_or_else(|| unsupported(types, ty))?;
            let tmp = format!("{}Tmp", ident(target));
            w.line(format!("{} {} = 0;", primitive_type(e.base), tmp));
            guard(w, &format!("!HdfSbufRead{}({}, &{})", suffix, parcel, tmp), &what, on_error);
            w.line(format!("{} = (enum {}){};", target, e.name, tmp));
        }
        TypeKind::Struct(s) => {
            guard(
                w,
                &format!("!{}BlockUnmarshalling({}, {})", s.name, parcel, addr_of(target)),
                &what,
                on_error,
            );
        }
        TypeKind::Union(u) => {
            let copy = format!("{}Cp", ident(target));
            w.line(format!(
                "const union {n} *{} = (const union {n} *)HdfSbufReadUnpadBuffer({}, sizeof(union {n}));",
                copy,
                parcel,
                n = u.name
            ));
            guard(w, &format!("{} == NULL", copy), &what, on_error);
            guard(
                w,
                &format!(
                    "memcpy_s({}, sizeof(union {n}), {}, sizeof(union {n})) != EOK",
                    addr_of(target),
                    copy,
                    n = u.name
                ),
                &format!("memcpy {}", shown(target)),
                on_error,
            );
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            let len = len.ok_or_else(|| HdiError::Generate(format!("no length for {}", shown(target))))?;
            let element_type = c_type(types, *element)?;
            guard(
                w,
                &format!("!HdfSbufReadUint32({}, {})", parcel, addr_of(len)),
                &format!("read {} size", shown(target)),
                on_error,
            );
            guard(
                w,
                &format!("{} > HDI_BUFF_MAX_SIZE / sizeof({})", len, element_type),
                &format!("check {} size", shown(target)),
                on_error,
            );
            w.open(format!("if ({} > 0) {{", len));
            w.line(format!(
                "{} = ({}*)OsalMemCalloc(sizeof({}) * ({}));",
                target, element_type, element_type, len
            ));
            w.open(format!("if ({} == NULL) {{", target));
            on_error.fail_with(w, &format!("malloc {}", shown(target)), "HDF_ERR_MALLOC_FAIL");
            w.close("}");
            read_elements(w, types, *element, parcel, target, len, on_error, depth)?;
            w.close("}");
        }
        TypeKind::Interface(i) => {
            let remote = format!("{}Remote", ident(target));
            w.line(format!("struct HdfRemoteService *{} = HdfSbufReadRemoteService({});", remote, parcel));
            guard(w, &format!("{} == NULL", remote), &what, on_error);
            w.line(format!("{} = {}GetFromRemote({});", target, i.name, remote));
            guard(w, &format!("{} == NULL", target), &format!("bind {}", shown(target)), on_error);
        }
        TypeKind::Map { .. } | TypeKind::Sequenceable(_) | TypeKind::SharedMemQueue(_) => {
            return Err(unsupported(types, ty))
        }
    }
    Ok(())
}

/// Reads `len` elements into the already sized buffer `target`.
pub(crate) fn read_elements(
    w: &mut CodeWriter,
    types: &TypeArena,
    element: TypeId,
    parcel: &str,
    target: &str,
    len: &str,
    on_error: &OnError,
    depth: usize,
) -> Result<()> {
    let i = loop_var(depth);
    w.open(format!("for (uint32_t {i} = 0; {i} < {}; {i}++) {{", len, i = i));
    read(w, types, element, parcel, &format!("({})[{}]", target, i), None, on_error, depth + 1)?;
    w.close("}");
    Ok(())
}

/// Whether a value of `ty` owns memory or a descriptor that must be released.
pub(crate) fn needs_free(types: &TypeArena, ty: TypeId) -> bool {
    match types.get(ty) {
        TypeKind::Primitive(PrimitiveKind::String) | TypeKind::Primitive(PrimitiveKind::FileDescriptor) => true,
        TypeKind::Array(_) | TypeKind::List(_) => true,
        TypeKind::Struct(s) => s.members.iter().any(|m| needs_free(types, m.ty)),
        _ => false,
    }
}

/// Emits the release of whatever `target` owns.
pub(crate) fn free(
    w: &mut CodeWriter,
    types: &TypeArena,
    ty: TypeId,
    target: &str,
    len: Option<&str>,
    depth: usize,
) -> Result<()> {
    match types.get(ty) {
        TypeKind::Primitive(PrimitiveKind::String) => {
            w.open(format!("if ({} != NULL) {{", target));
            w.line(format!("OsalMemFree({});", target));
            w.line(format!("{} = NULL;", target));
            w.close("}");
        }
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => {
            w.open(format!("if ({} >= 0) {{", target));
            w.line(format!("close({});", target));
            w.line(format!("{} = -1;", target));
            w.close("}");
        }
        TypeKind::Struct(s) if needs_free(types, ty) => {
            w.line(format!("{}Free({}, false);", s.name, addr_of(target)));
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            w.open(format!("if ({} != NULL) {{", target));
            if needs_free(types, *element) {
                let len = len.ok_or_else(|| HdiError::Generate(format!("no length for {}", shown(target))))?;
                let i = loop_var(depth);
                w.open(format!("for (uint32_t {i} = 0; {i} < {}; {i}++) {{", len, i = i));
                free(w, types, *element, &format!("({})[{}]", target, i), None, depth + 1)?;
                w.close("}");
            }
            w.line(format!("OsalMemFree({});", target));
            w.line(format!("{} = NULL;", target));
            w.close("}");
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attributes, NamespaceId, Position, StructType};

    #[test]
    fn expression_helpers() {
        assert_eq!(addr_of("*name"), "name");
        assert_eq!(addr_of("dataBlock->x"), "&dataBlock->x");
        assert_eq!(ident("dataBlock->color"), "dataBlockColor");
        assert_eq!(ident("(*values)[i]"), "valuesI");
    }

    #[test]
    fn parameter_declarators() {
        let mut types = TypeArena::new();
        let string = types.primitive(PrimitiveKind::String);
        let int = types.primitive(PrimitiveKind::Int);
        let list = types.alloc(TypeKind::List(int));
        let param = |name: &str, direction, ty| Parameter {
            name: name.to_owned(),
            direction,
            ty,
            pos: Position::default(),
        };

        assert_eq!(
            param_decls(&types, &param("tag", Direction::In, string)).unwrap(),
            ["const char* tag"]
        );
        assert_eq!(
            param_decls(&types, &param("tag", Direction::Out, string)).unwrap(),
            ["char* tag", "uint32_t tagLen"]
        );
        assert_eq!(
            param_decls(&types, &param("ids", Direction::Out, list)).unwrap(),
            ["int32_t* ids", "uint32_t* idsLen"]
        );
        assert_eq!(
            param_decls(&types, &param("id", Direction::Out, int)).unwrap(),
            ["int32_t* id"]
        );
    }

    #[test]
    fn array_write_loops_over_elements() {
        let mut types = TypeArena::new();
        let point = types.alloc(TypeKind::Struct(StructType {
            name:      "Point".to_owned(),
            namespace: NamespaceId::ROOT,
            unit:      "Types".to_owned(),
            members:   Vec::new(),
            attrs:     Attributes::default(),
            pos:       Position::default(),
        }));
        let array = types.alloc(TypeKind::Array(point));
        let mut w = CodeWriter::spaces();
        write(&mut w, &types, array, "data", "points", Some("pointsLen"), &OnError::ReturnFalse, 0).unwrap();
        let text = w.finish();
        assert!(text.contains("if (!HdfSbufWriteUint32(data, pointsLen)) {"));
        assert!(text.contains("for (uint32_t i = 0; i < pointsLen; i++) {"));
        assert!(text.contains("if (!PointBlockMarshalling(data, &(points)[i])) {"));
    }

    #[test]
    fn maps_are_rejected() {
        let mut types = TypeArena::new();
        let int = types.primitive(PrimitiveKind::Int);
        let map = types.alloc(TypeKind::Map { key: int, value: int });
        assert!(c_type(&types, map).is_err());
    }
}
