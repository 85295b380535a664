//! C++ spellings and `MessageParcel` marshalling statements.
//!
//! Values and targets are C++ lvalue expressions; failures run the given
//! `on_error` statement (`return HDF_ERR_INVALID_PARAM;`, `return false;`).

use crate::{
    ast::{NamespaceId, Parameter, PrimitiveKind, TypeId, TypeKind},
    codegen::{cpp::qualified_namespace, writer::CodeWriter, Context},
    error::Result,
};

fn parcel_suffix(kind: PrimitiveKind) -> Option<&'static str> {
    Some(match kind {
        PrimitiveKind::Boolean => "Bool",
        PrimitiveKind::Byte => "Int8",
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
        PrimitiveKind::String => "std::string",
        PrimitiveKind::FileDescriptor => "int",
        PrimitiveKind::Void => "void",
    }
}

/// Names declared in another package are fully qualified.
fn named(ctx: &Context, namespace: NamespaceId, name: &str) -> String {
    if namespace == ctx.ast.namespace {
        name.to_owned()
    } else {
        format!("{}::{}", qualified_namespace(ctx, namespace), name)
    }
}

pub(crate) fn cpp_type(ctx: &Context, ty: TypeId) -> Result<String> {
    Ok(match ctx.types().get(ty) {
        TypeKind::Primitive(kind) => primitive_type(*kind).to_owned(),
        TypeKind::Enum(e) => named(ctx, e.namespace, &e.name),
        TypeKind::Struct(s) | TypeKind::Union(s) => named(ctx, s.namespace, &s.name),
        TypeKind::Array(element) | TypeKind::List(element) => format!("std::vector<{}>", cpp_type(ctx, *element)?),
        TypeKind::Map { key, value } => {
            format!("std::map<{}, {}>", cpp_type(ctx, *key)?, cpp_type(ctx, *value)?)
        }
        TypeKind::Interface(i) => format!("sptr<{}>", named(ctx, i.namespace, &i.name)),
        TypeKind::Sequenceable(s) => format!("sptr<{}>", named(ctx, s.namespace, &s.name)),
        TypeKind::SharedMemQueue(element) => {
            format!("std::shared_ptr<SharedMemQueue<{}>>", cpp_type(ctx, *element)?)
        }
    })
}

/// Scalars travel by value; everything else by const reference.
fn passed_by_value(ctx: &Context, ty: TypeId) -> bool {
    match ctx.types().get(ty) {
        TypeKind::Primitive(PrimitiveKind::String) => false,
        TypeKind::Primitive(_) | TypeKind::Enum(_) => true,
        _ => false,
    }
}

pub(crate) fn param_decl(ctx: &Context, param: &Parameter) -> Result<String> {
    let ty = cpp_type(ctx, param.ty)?;
    Ok(if param.is_out() {
        format!("{}& {}", ty, param.name)
    } else if passed_by_value(ctx, param.ty) {
        format!("{} {}", ty, param.name)
    } else {
        format!("const {}& {}", ty, param.name)
    })
}

/// Declaration of a default-initialized local.
pub(crate) fn local_decl(ctx: &Context, ty: TypeId, name: &str) -> Result<String> {
    let spelled = cpp_type(ctx, ty)?;
    Ok(match ctx.types().get(ty) {
        TypeKind::Primitive(PrimitiveKind::Boolean) => format!("bool {} = false;", name),
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => format!("int {} = -1;", name),
        TypeKind::Primitive(PrimitiveKind::String) => format!("{} {};", spelled, name),
        TypeKind::Primitive(_) => format!("{} {} = 0;", spelled, name),
        TypeKind::Union(_) => format!("{} {} = {{}};", spelled, name),
        _ => format!("{} {};", spelled, name),
    })
}

fn fail(w: &mut CodeWriter, what: &str, on_error: &str) {
    w.line(format!("HDF_LOGE(\"%{{public}}s: {} failed!\", __func__);", what));
    w.line(on_error);
}

pub(crate) fn guard(w: &mut CodeWriter, failed: &str, what: &str, on_error: &str) {
    w.open(format!("if ({}) {{", failed));
    fail(w, what, on_error);
    w.close("}");
}

fn shown(expr: &str) -> String {
    expr.replace(".first", " key").replace(".second", " value")
}

/// Emits the marshalling of `value` into `parcel`.
pub(crate) fn write(
    w: &mut CodeWriter,
    ctx: &Context,
    ty: TypeId,
    parcel: &str,
    value: &str,
    on_error: &str,
    depth: usize,
) -> Result<()> {
    let what = format!("write {}", shown(value));
    match ctx.types().get(ty) {
        TypeKind::Primitive(PrimitiveKind::String) => {
            guard(w, &format!("!{}.WriteCString({}.c_str())", parcel, value), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => {
            guard(w, &format!("!{}.WriteFileDescriptor({})", parcel, value), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::Void) => {}
        TypeKind::Primitive(kind) => {
            if let Some(suffix) = parcel_suffix(*kind) {
                guard(w, &format!("!{}.Write{}({})", parcel, suffix, value), &what, on_error);
            }
        }
        TypeKind::Enum(e) => {
            if let Some(suffix) = parcel_suffix(e.base) {
                guard(
                    w,
                    &format!(
                        "!{}.Write{}(static_cast<{}>({}))",
                        parcel,
                        suffix,
                        primitive_type(e.base),
                        value
                    ),
                    &what,
                    on_error,
                );
            }
        }
        TypeKind::Struct(s) => {
            guard(
                w,
                &format!("!{}BlockMarshalling({}, {})", named(ctx, s.namespace, &s.name), parcel, value),
                &what,
                on_error,
            );
        }
        TypeKind::Union(u) => {
            let name = named(ctx, u.namespace, &u.name);
            guard(
                w,
                &format!(
                    "!{}.WriteUnpadBuffer((const void*)&{}, sizeof({}))",
                    parcel, value, name
                ),
                &what,
                on_error,
            );
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            guard(
                w,
                &format!("!{}.WriteUint32({}.size())", parcel, value),
                &format!("write {} size", shown(value)),
                on_error,
            );
            let item = format!("it{}", depth);
            w.open(format!("for (const auto& {} : {}) {{", item, value));
            write(w, ctx, *element, parcel, &item, on_error, depth + 1)?;
            w.close("}");
        }
        TypeKind::Map { key, value: mapped } => {
            guard(
                w,
                &format!("!{}.WriteUint32({}.size())", parcel, value),
                &format!("write {} size", shown(value)),
                on_error,
            );
            let item = format!("it{}", depth);
            w.open(format!("for (const auto& {} : {}) {{", item, value));
            write(w, ctx, *key, parcel, &format!("({}.first)", item), on_error, depth + 1)?;
            write(w, ctx, *mapped, parcel, &format!("({}.second)", item), on_error, depth + 1)?;
            w.close("}");
        }
        TypeKind::Interface(i) => {
            let name = named(ctx, i.namespace, &i.name);
            guard(w, &format!("{} == nullptr", value), &format!("check {}", shown(value)), on_error);
            guard(
                w,
                &format!(
                    "!{}.WriteRemoteObject(OHOS::HDI::ObjectCollector::GetInstance().GetOrNewObject({}, {}::GetDescriptor()))",
                    parcel, value, name
                ),
                &what,
                on_error,
            );
        }
        TypeKind::Sequenceable(_) => {
            guard(w, &format!("!{}.WriteStrongParcelable({})", parcel, value), &what, on_error);
        }
        TypeKind::SharedMemQueue(_) => {
            guard(
                w,
                &format!(
                    "{v} == nullptr || !{v}->IsGood() || {v}->GetMeta() == nullptr || !{v}->GetMeta()->Marshalling({p})",
                    v = value,
                    p = parcel
                ),
                &what,
                on_error,
            );
        }
    }
    Ok(())
}

/// Emits the unmarshalling of one value from `parcel` into the declared
/// lvalue `target`.
pub(crate) fn read(
    w: &mut CodeWriter,
    ctx: &Context,
    ty: TypeId,
    parcel: &str,
    target: &str,
    on_error: &str,
    depth: usize,
) -> Result<()> {
    let what = format!("read {}", shown(target));
    match ctx.types().get(ty) {
        TypeKind::Primitive(PrimitiveKind::String) => {
            let copy = format!("{}Cp{}", temp_base(target), depth);
            w.line(format!("const char* {} = {}.ReadCString();", copy, parcel));
            guard(w, &format!("{} == nullptr", copy), &what, on_error);
            w.line(format!("{} = {};", target, copy));
        }
        TypeKind::Primitive(PrimitiveKind::FileDescriptor) => {
            w.line(format!("{} = {}.ReadFileDescriptor();", target, parcel));
            guard(w, &format!("{} < 0", target), &what, on_error);
        }
        TypeKind::Primitive(PrimitiveKind::Void) => {}
        TypeKind::Primitive(kind) => {
            if let Some(suffix) = parcel_suffix(*kind) {
                guard(w, &format!("!{}.Read{}({})", parcel, suffix, target), &what, on_error);
            }
        }
        TypeKind::Enum(e) => {
            if let Some(suffix) = parcel_suffix(e.base) {
                let tmp = format!("{}Tmp{}", temp_base(target), depth);
                w.line(format!("{} {} = 0;", primitive_type(e.base), tmp));
                guard(w, &format!("!{}.Read{}({})", parcel, suffix, tmp), &what, on_error);
                w.line(format!(
                    "{} = static_cast<{}>({});",
                    target,
                    named(ctx, e.namespace, &e.name),
                    tmp
                ));
            }
        }
        TypeKind::Struct(s) => {
            guard(
                w,
                &format!("!{}BlockUnmarshalling({}, {})", named(ctx, s.namespace, &s.name), parcel, target),
                &what,
                on_error,
            );
        }
        TypeKind::Union(u) => {
            let name = named(ctx, u.namespace, &u.name);
            let copy = format!("{}Cp{}", temp_base(target), depth);
            w.line(format!(
                "const {n} *{} = reinterpret_cast<const {n} *>({}.ReadUnpadBuffer(sizeof({n})));",
                copy,
                parcel,
                n = name
            ));
            guard(w, &format!("{} == nullptr", copy), &what, on_error);
            guard(
                w,
                &format!("memcpy_s(&{}, sizeof({n}), {}, sizeof({n})) != EOK", target, copy, n = name),
                &format!("memcpy {}", shown(target)),
                on_error,
            );
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            let size = format!("{}Size{}", temp_base(target), depth);
            let element_type = cpp_type(ctx, *element)?;
            w.line(format!("uint32_t {} = 0;", size));
            guard(w, &format!("!{}.ReadUint32({})", parcel, size), &format!("read {} size", shown(target)), on_error);
            guard(
                w,
                &format!("{} > HDI_BUFF_MAX_SIZE / sizeof({})", size, element_type),
                &format!("check {} size", shown(target)),
                on_error,
            );
            w.line(format!("{}.clear();", target));
            w.line(format!("{}.reserve({});", target, size));
            let i = format!("i{}", depth);
            w.open(format!("for (uint32_t {i} = 0; {i} < {}; ++{i}) {{", size, i = i));
            let item = format!("value{}", depth);
            w.line(local_decl(ctx, *element, &item)?);
            read(w, ctx, *element, parcel, &item, on_error, depth + 1)?;
            w.line(format!("{}.push_back({});", target, item));
            w.close("}");
        }
        TypeKind::Map { key, value } => {
            let size = format!("{}Size{}", temp_base(target), depth);
            w.line(format!("uint32_t {} = 0;", size));
            guard(w, &format!("!{}.ReadUint32({})", parcel, size), &format!("read {} size", shown(target)), on_error);
            w.line(format!("{}.clear();", target));
            let i = format!("i{}", depth);
            w.open(format!("for (uint32_t {i} = 0; {i} < {}; ++{i}) {{", size, i = i));
            let key_item = format!("key{}", depth);
            let value_item = format!("value{}", depth);
            w.line(local_decl(ctx, *key, &key_item)?);
            read(w, ctx, *key, parcel, &key_item, on_error, depth + 1)?;
            w.line(local_decl(ctx, *value, &value_item)?);
            read(w, ctx, *value, parcel, &value_item, on_error, depth + 1)?;
            w.line(format!("{}[{}] = {};", target, key_item, value_item));
            w.close("}");
        }
        TypeKind::Interface(i) => {
            let remote = format!("{}Remote{}", temp_base(target), depth);
            w.line(format!("sptr<IRemoteObject> {} = {}.ReadRemoteObject();", remote, parcel));
            guard(w, &format!("{} == nullptr", remote), &what, on_error);
            w.line(format!(
                "{} = {}::CastFrom({});",
                target,
                named(ctx, i.namespace, &i.name),
                remote
            ));
            guard(w, &format!("{} == nullptr", target), &format!("cast {}", shown(target)), on_error);
        }
        TypeKind::Sequenceable(s) => {
            w.line(format!(
                "{} = {}.ReadStrongParcelable<{}>();",
                target,
                parcel,
                named(ctx, s.namespace, &s.name)
            ));
            guard(w, &format!("{} == nullptr", target), &what, on_error);
        }
        TypeKind::SharedMemQueue(element) => {
            let element_type = cpp_type(ctx, *element)?;
            let meta = format!("{}Meta{}", temp_base(target), depth);
            w.line(format!(
                "std::shared_ptr<SharedMemQueueMeta<{e}>> {} = SharedMemQueueMeta<{e}>::UnMarshalling({});",
                meta,
                parcel,
                e = element_type
            ));
            guard(w, &format!("{} == nullptr", meta), &what, on_error);
            w.line(format!("{} = std::make_shared<SharedMemQueue<{}>>(*{});", target, element_type, meta));
        }
    }
    Ok(())
}

/// Identifier stem for temporaries derived from `target`: `dataBlock.name`
/// -> `name`, `value0` -> `value0`.
fn temp_base(target: &str) -> String {
    let last = target
        .rsplit(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|s| !s.is_empty())
        .unwrap_or("tmp");
    last.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporaries_use_last_identifier() {
        assert_eq!(temp_base("dataBlock.name"), "name");
        assert_eq!(temp_base("value0"), "value0");
        assert_eq!(temp_base("(it0.second)"), "second");
    }
}
