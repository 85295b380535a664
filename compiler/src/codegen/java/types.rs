//! Java spellings and `MessageParcel` statements.
//!
//! Unsigned IDL types travel as the signed Java type of the same width.
//! Reads assign a fresh value to `target`; failed size checks run `on_error`.

use std::collections::BTreeSet;

use crate::{
    ast::{NamespaceId, Parameter, PrimitiveKind, TypeId, TypeKind},
    codegen::{writer::CodeWriter, Context},
    error::{HdiError, Result},
    utils::base_name,
};

fn parcel_suffix(kind: PrimitiveKind) -> Option<&'static str> {
    Some(match kind {
        PrimitiveKind::Boolean => "Boolean",
        PrimitiveKind::Byte | PrimitiveKind::UChar => "Byte",
        PrimitiveKind::Short | PrimitiveKind::UShort => "Short",
        PrimitiveKind::Int | PrimitiveKind::UInt => "Int",
        PrimitiveKind::Long | PrimitiveKind::ULong => "Long",
        PrimitiveKind::Float => "Float",
        PrimitiveKind::Double => "Double",
        PrimitiveKind::String => "String",
        PrimitiveKind::FileDescriptor => "FileDescriptor",
        PrimitiveKind::Void => return None,
    })
}

pub(crate) fn primitive_type(kind: PrimitiveKind, boxed: bool) -> &'static str {
    match (kind, boxed) {
        (PrimitiveKind::Boolean, false) => "boolean",
        (PrimitiveKind::Boolean, true) => "Boolean",
        (PrimitiveKind::Byte | PrimitiveKind::UChar, false) => "byte",
        (PrimitiveKind::Byte | PrimitiveKind::UChar, true) => "Byte",
        (PrimitiveKind::Short | PrimitiveKind::UShort, false) => "short",
        (PrimitiveKind::Short | PrimitiveKind::UShort, true) => "Short",
        (PrimitiveKind::Int | PrimitiveKind::UInt, false) => "int",
        (PrimitiveKind::Int | PrimitiveKind::UInt, true) => "Integer",
        (PrimitiveKind::Long | PrimitiveKind::ULong, false) => "long",
        (PrimitiveKind::Long | PrimitiveKind::ULong, true) => "Long",
        (PrimitiveKind::Float, false) => "float",
        (PrimitiveKind::Float, true) => "Float",
        (PrimitiveKind::Double, false) => "double",
        (PrimitiveKind::Double, true) => "Double",
        (PrimitiveKind::String, _) => "String",
        (PrimitiveKind::FileDescriptor, _) => "FileDescriptor",
        (PrimitiveKind::Void, _) => "void",
    }
}

/// Enums and structs are nested in the class of their unit.
fn nested(ctx: &Context, unit: &str, name: &str) -> String {
    if unit == ctx.ast.name {
        name.to_owned()
    } else {
        format!("{}.{}", unit, name)
    }
}

pub(crate) fn java_type(ctx: &Context, ty: TypeId, boxed: bool) -> Result<String> {
    Ok(match ctx.types().get(ty) {
        TypeKind::Primitive(kind) => primitive_type(*kind, boxed).to_owned(),
        TypeKind::Enum(e) => nested(ctx, &e.unit, &e.name),
        TypeKind::Struct(s) => nested(ctx, &s.unit, &s.name),
        TypeKind::Array(element) => format!("{}[]", java_type(ctx, *element, false)?),
        TypeKind::List(element) => format!("List<{}>", java_type(ctx, *element, true)?),
        TypeKind::Map { key, value } => {
            format!("HashMap<{}, {}>", java_type(ctx, *key, true)?, java_type(ctx, *value, true)?)
        }
        TypeKind::Interface(i) => i.name.clone(),
        TypeKind::Sequenceable(s) => s.name.clone(),
        TypeKind::Union(u) => {
            return Err(HdiError::Generate(format!("union {} has no Java mapping", u.name)));
        }
        TypeKind::SharedMemQueue(_) => {
            return Err(HdiError::Generate("SharedMemQueue has no Java mapping".to_owned()));
        }
    })
}

/// How an `out` parameter hands its value back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutKind {
    /// One-element array the proxy stores into.
    Holder,
    /// Caller-sized array the reply is copied into.
    Buffer,
    /// Caller-owned list or map, cleared and refilled.
    Collection,
    /// Caller-owned struct, unmarshalled in place.
    InPlace,
}

pub(crate) fn out_kind(ctx: &Context, ty: TypeId) -> OutKind {
    match ctx.types().get(ty) {
        TypeKind::Array(_) => OutKind::Buffer,
        TypeKind::List(_) | TypeKind::Map { .. } => OutKind::Collection,
        TypeKind::Struct(_) => OutKind::InPlace,
        _ => OutKind::Holder,
    }
}

pub(crate) fn param_decl(ctx: &Context, param: &Parameter) -> Result<String> {
    let ty = java_type(ctx, param.ty, false)?;
    if param.is_out() && out_kind(ctx, param.ty) == OutKind::Holder {
        Ok(format!("{}[] {}", ty, param.name))
    } else {
        Ok(format!("{} {}", ty, param.name))
    }
}

/// Field initializer so freshly built structs never hold null containers.
pub(crate) fn field_decl(ctx: &Context, ty: TypeId, name: &str) -> Result<String> {
    let spelled = java_type(ctx, ty, false)?;
    Ok(match ctx.types().get(ty) {
        TypeKind::Primitive(PrimitiveKind::String) => format!("public String {} = \"\";", name),
        TypeKind::List(_) => format!("public {} {} = new ArrayList<>();", spelled, name),
        TypeKind::Map { .. } => format!("public {} {} = new HashMap<>();", spelled, name),
        _ => format!("public {} {};", spelled, name),
    })
}

/// `new T[n]` for any element spelling, including `int[]` and generics.
fn new_array(element: &str, size: &str) -> String {
    let (head, dims) = match element.find('[') {
        Some(at) => element.split_at(at),
        None => (element, ""),
    };
    let raw = head.split('<').next().unwrap_or(head);
    format!("new {}[{}]{}", raw, size, dims)
}

fn temp_base(target: &str) -> String {
    target
        .rsplit(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|s| !s.is_empty())
        .unwrap_or("tmp")
        .to_owned()
}

fn guard(w: &mut CodeWriter, failed: &str, on_error: &str) {
    w.open(format!("if ({}) {{", failed));
    w.line(on_error);
    w.close("}");
}

pub(crate) fn write(w: &mut CodeWriter, ctx: &Context, ty: TypeId, parcel: &str, value: &str, depth: usize) -> Result<()> {
    match ctx.types().get(ty) {
        TypeKind::Primitive(kind) => {
            if let Some(suffix) = parcel_suffix(*kind) {
                w.line(format!("{}.write{}({});", parcel, suffix, value));
            }
        }
        TypeKind::Enum(e) => {
            if let Some(suffix) = parcel_suffix(e.base) {
                w.line(format!("{}.write{}({}.getValue());", parcel, suffix, value));
            }
        }
        TypeKind::Struct(_) | TypeKind::Sequenceable(_) => {
            w.line(format!("{}.writeSequenceable({});", parcel, value));
        }
        TypeKind::Array(element) => {
            let item = format!("it{}", depth);
            w.line(format!("{}.writeInt({}.length);", parcel, value));
            w.open(format!("for ({} {} : {}) {{", java_type(ctx, *element, false)?, item, value));
            write(w, ctx, *element, parcel, &item, depth + 1)?;
            w.close("}");
        }
        TypeKind::List(element) => {
            let item = format!("it{}", depth);
            w.line(format!("{}.writeInt({}.size());", parcel, value));
            w.open(format!("for ({} {} : {}) {{", java_type(ctx, *element, true)?, item, value));
            write(w, ctx, *element, parcel, &item, depth + 1)?;
            w.close("}");
        }
        TypeKind::Map { key, value: mapped } => {
            let item = format!("it{}", depth);
            w.line(format!("{}.writeInt({}.size());", parcel, value));
            w.open(format!(
                "for (Map.Entry<{}, {}> {} : {}.entrySet()) {{",
                java_type(ctx, *key, true)?,
                java_type(ctx, *mapped, true)?,
                item,
                value
            ));
            write(w, ctx, *key, parcel, &format!("{}.getKey()", item), depth + 1)?;
            write(w, ctx, *mapped, parcel, &format!("{}.getValue()", item), depth + 1)?;
            w.close("}");
        }
        TypeKind::Interface(_) => {
            w.line(format!("{}.writeRemoteObject({}.asObject());", parcel, value));
        }
        TypeKind::Union(_) | TypeKind::SharedMemQueue(_) => {
            java_type(ctx, ty, false)?;
        }
    }
    Ok(())
}

pub(crate) fn read(
    w: &mut CodeWriter,
    ctx: &Context,
    ty: TypeId,
    parcel: &str,
    target: &str,
    on_error: &str,
    depth: usize,
) -> Result<()> {
    match ctx.types().get(ty) {
        TypeKind::Primitive(kind) => {
            if let Some(suffix) = parcel_suffix(*kind) {
                w.line(format!("{} = {}.read{}();", target, parcel, suffix));
            }
        }
        TypeKind::Enum(e) => {
            if let Some(suffix) = parcel_suffix(e.base) {
                w.line(format!(
                    "{} = {}.fromValue({}.read{}());",
                    target,
                    nested(ctx, &e.unit, &e.name),
                    parcel,
                    suffix
                ));
            }
        }
        TypeKind::Struct(_) | TypeKind::Sequenceable(_) => {
            w.line(format!("{} = new {}();", target, java_type(ctx, ty, false)?));
            guard(w, &format!("!{}.readSequenceable({})", parcel, target), on_error);
        }
        TypeKind::Array(element) => {
            let size = format!("{}Size{}", temp_base(target), depth);
            let i = format!("i{}", depth);
            w.line(format!("int {} = {}.readInt();", size, parcel));
            guard(w, &format!("{s} < 0 || {s} > HDI_BUFF_MAX_SIZE", s = size), on_error);
            w.line(format!("{} = {};", target, new_array(&java_type(ctx, *element, false)?, &size)));
            w.open(format!("for (int {i} = 0; {i} < {}; {i}++) {{", size, i = i));
            read(w, ctx, *element, parcel, &format!("{}[{}]", target, i), on_error, depth + 1)?;
            w.close("}");
        }
        TypeKind::List(element) => {
            let size = format!("{}Size{}", temp_base(target), depth);
            let i = format!("i{}", depth);
            let item = format!("value{}", depth);
            w.line(format!("int {} = {}.readInt();", size, parcel));
            guard(w, &format!("{s} < 0 || {s} > HDI_BUFF_MAX_SIZE", s = size), on_error);
            w.line(format!("{} = new ArrayList<>({});", target, size));
            w.open(format!("for (int {i} = 0; {i} < {}; {i}++) {{", size, i = i));
            w.line(format!("{} {};", java_type(ctx, *element, false)?, item));
            read(w, ctx, *element, parcel, &item, on_error, depth + 1)?;
            w.line(format!("{}.add({});", target, item));
            w.close("}");
        }
        TypeKind::Map { key, value } => {
            let size = format!("{}Size{}", temp_base(target), depth);
            let i = format!("i{}", depth);
            let key_item = format!("key{}", depth);
            let value_item = format!("value{}", depth);
            w.line(format!("int {} = {}.readInt();", size, parcel));
            guard(w, &format!("{s} < 0 || {s} > HDI_BUFF_MAX_SIZE", s = size), on_error);
            w.line(format!("{} = new HashMap<>();", target));
            w.open(format!("for (int {i} = 0; {i} < {}; {i}++) {{", size, i = i));
            w.line(format!("{} {};", java_type(ctx, *key, false)?, key_item));
            read(w, ctx, *key, parcel, &key_item, on_error, depth + 1)?;
            w.line(format!("{} {};", java_type(ctx, *value, false)?, value_item));
            read(w, ctx, *value, parcel, &value_item, on_error, depth + 1)?;
            w.line(format!("{}.put({}, {});", target, key_item, value_item));
            w.close("}");
        }
        TypeKind::Interface(i) => {
            w.line(format!(
                "{} = {}Proxy.castFrom({}.readRemoteObject());",
                target,
                base_name(&i.name),
                parcel
            ));
            guard(w, &format!("{} == null", target), on_error);
        }
        TypeKind::Union(_) | TypeKind::SharedMemQueue(_) => {
            java_type(ctx, ty, false)?;
        }
    }
    Ok(())
}

/// Imports a file needs for the types it mentions.
pub(crate) fn collect_imports(ctx: &Context, ty: TypeId, imports: &mut BTreeSet<String>) {
    let module = ctx.module;
    let package_of = |namespace: NamespaceId| module.namespaces.full_name(namespace);
    let foreign = |namespace: NamespaceId| namespace != ctx.ast.namespace;

    match ctx.types().get(ty) {
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => {
            imports.insert("java.io.FileDescriptor".to_owned());
        }
        TypeKind::Primitive(_) => {}
        TypeKind::Enum(e) if foreign(e.namespace) => {
            imports.insert(format!("{}.{}", package_of(e.namespace), e.unit));
        }
        TypeKind::Struct(s) | TypeKind::Union(s) if foreign(s.namespace) => {
            imports.insert(format!("{}.{}", package_of(s.namespace), s.unit));
        }
        TypeKind::Enum(_) | TypeKind::Struct(_) | TypeKind::Union(_) => {}
        TypeKind::Array(element) | TypeKind::SharedMemQueue(element) => collect_imports(ctx, *element, imports),
        TypeKind::List(element) => {
            imports.insert("java.util.ArrayList".to_owned());
            imports.insert("java.util.List".to_owned());
            collect_imports(ctx, *element, imports);
        }
        TypeKind::Map { key, value } => {
            imports.insert("java.util.HashMap".to_owned());
            imports.insert("java.util.Map".to_owned());
            collect_imports(ctx, *key, imports);
            collect_imports(ctx, *value, imports);
        }
        TypeKind::Interface(i) => {
            if foreign(i.namespace) {
                let package = package_of(i.namespace);
                imports.insert(format!("{}.{}", package, i.name));
                imports.insert(format!("{}.{}Proxy", package, base_name(&i.name)));
            }
        }
        TypeKind::Sequenceable(s) => {
            imports.insert(format!("{}.{}", package_of(s.namespace), s.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_allocation_keeps_inner_dimensions() {
        assert_eq!(new_array("int", "n"), "new int[n]");
        assert_eq!(new_array("int[]", "n"), "new int[n][]");
        assert_eq!(new_array("List<Integer>", "n"), "new List[n]");
    }

    #[test]
    fn unsigned_types_use_signed_spellings() {
        assert_eq!(primitive_type(PrimitiveKind::UInt, false), "int");
        assert_eq!(primitive_type(PrimitiveKind::UInt, true), "Integer");
        assert_eq!(primitive_type(PrimitiveKind::ULong, false), "long");
        assert_eq!(parcel_suffix(PrimitiveKind::UChar), Some("Byte"));
    }
}
