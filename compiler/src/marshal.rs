//! Runtime interpreter of the marshalling contract.
//!
//! The emitters turn each type into read and write statements for the target
//! language. The functions here apply the same per-kind rules to a dynamic
//! [`Value`] over a [`Parcel`], so the wire layout a method produces can be
//! checked without building any generated code.

use hdi_parcel::{Parcel, ParcelError, ParcelMut, QueueMeta, Value};

use crate::{
    ast::{Method, PrimitiveKind, StructType, TypeArena, TypeId, TypeKind},
    error::{HdiError, Result},
    utils::quote,
};

fn mismatch(types: &TypeArena, ty: TypeId, value: &Value) -> HdiError {
    HdiError::Marshal(format!(
        "cannot marshal a {} value as {}",
        value.kind_name(),
        quote(&types.display_name(ty))
    ))
}

fn out_of_range(value: i128, base: PrimitiveKind) -> HdiError {
    HdiError::Marshal(format!("enum value {} does not fit in {}", value, base.idl_name()))
}

fn write_primitive(kind: PrimitiveKind, value: &Value, out: &mut ParcelMut) -> Option<Result<()>> {
    match (kind, value) {
        (PrimitiveKind::Boolean, Value::Bool(v)) => out.write_scalar(*v),
        (PrimitiveKind::Byte, Value::I8(v)) => out.write_scalar(*v),
        (PrimitiveKind::Short, Value::I16(v)) => out.write_scalar(*v),
        (PrimitiveKind::Int, Value::I32(v)) => out.write_scalar(*v),
        (PrimitiveKind::Long, Value::I64(v)) => out.write_scalar(*v),
        (PrimitiveKind::Float, Value::F32(v)) => out.write_scalar(*v),
        (PrimitiveKind::Double, Value::F64(v)) => out.write_scalar(*v),
        (PrimitiveKind::UChar, Value::U8(v)) => out.write_scalar(*v),
        (PrimitiveKind::UShort, Value::U16(v)) => out.write_scalar(*v),
        (PrimitiveKind::UInt, Value::U32(v)) => out.write_scalar(*v),
        (PrimitiveKind::ULong, Value::U64(v)) => out.write_scalar(*v),
        (PrimitiveKind::String, Value::String(v)) => return Some(out.write_string(v).map_err(Into::into)),
        (PrimitiveKind::FileDescriptor, Value::Fd(v)) => out.write_fd(*v),
        (PrimitiveKind::Void, Value::Void) => {}
        _ => return None,
    }
    Some(Ok(()))
}

fn read_primitive(kind: PrimitiveKind, parcel: &mut Parcel) -> std::result::Result<Value, ParcelError> {
    Ok(match kind {
        PrimitiveKind::Boolean => Value::Bool(parcel.read_scalar()?),
        PrimitiveKind::Byte => Value::I8(parcel.read_scalar()?),
        PrimitiveKind::Short => Value::I16(parcel.read_scalar()?),
        PrimitiveKind::Int => Value::I32(parcel.read_scalar()?),
        PrimitiveKind::Long => Value::I64(parcel.read_scalar()?),
        PrimitiveKind::Float => Value::F32(parcel.read_scalar()?),
        PrimitiveKind::Double => Value::F64(parcel.read_scalar()?),
        PrimitiveKind::UChar => Value::U8(parcel.read_scalar()?),
        PrimitiveKind::UShort => Value::U16(parcel.read_scalar()?),
        PrimitiveKind::UInt => Value::U32(parcel.read_scalar()?),
        PrimitiveKind::ULong => Value::U64(parcel.read_scalar()?),
        PrimitiveKind::String => Value::String(parcel.read_string()?),
        PrimitiveKind::FileDescriptor => Value::Fd(parcel.read_fd()?),
        PrimitiveKind::Void => Value::Void,
    })
}

/// Enums travel as their underlying integer at the base width.
fn write_enum(base: PrimitiveKind, value: i128, out: &mut ParcelMut) -> Result<()> {
    let range = || out_of_range(value, base);
    match base {
        PrimitiveKind::Byte => out.write_scalar(i8::try_from(value).map_err(|_| range())?),
        PrimitiveKind::Short => out.write_scalar(i16::try_from(value).map_err(|_| range())?),
        PrimitiveKind::Int => out.write_scalar(i32::try_from(value).map_err(|_| range())?),
        PrimitiveKind::Long => out.write_scalar(i64::try_from(value).map_err(|_| range())?),
        PrimitiveKind::UChar => out.write_scalar(u8::try_from(value).map_err(|_| range())?),
        PrimitiveKind::UShort => out.write_scalar(u16::try_from(value).map_err(|_| range())?),
        PrimitiveKind::UInt => out.write_scalar(u32::try_from(value).map_err(|_| range())?),
        PrimitiveKind::ULong => out.write_scalar(u64::try_from(value).map_err(|_| range())?),
        _ => return Err(HdiError::Marshal(format!("{} is not an enum base", base.idl_name()))),
    }
    Ok(())
}

fn read_enum(base: PrimitiveKind, parcel: &mut Parcel) -> Result<i128> {
    Ok(match base {
        PrimitiveKind::Byte => parcel.read_scalar::<i8>()? as i128,
        PrimitiveKind::Short => parcel.read_scalar::<i16>()? as i128,
        PrimitiveKind::Int => parcel.read_scalar::<i32>()? as i128,
        PrimitiveKind::Long => parcel.read_scalar::<i64>()? as i128,
        PrimitiveKind::UChar => parcel.read_scalar::<u8>()? as i128,
        PrimitiveKind::UShort => parcel.read_scalar::<u16>()? as i128,
        PrimitiveKind::UInt => parcel.read_scalar::<u32>()? as i128,
        PrimitiveKind::ULong => parcel.read_scalar::<u64>()? as i128,
        _ => return Err(HdiError::Marshal(format!("{} is not an enum base", base.idl_name()))),
    })
}

fn plain_size(types: &TypeArena, ty: TypeId) -> Result<usize> {
    types
        .fixed_size(ty)
        .ok_or_else(|| HdiError::Marshal(format!("{} has no fixed size", quote(&types.display_name(ty)))))
}

/// Appends `value` to `out` using the wire rule of `ty`.
pub fn write_value(types: &TypeArena, ty: TypeId, value: &Value, out: &mut ParcelMut) -> Result<()> {
    match (types.get(ty), value) {
        (TypeKind::Primitive(kind), _) => match write_primitive(*kind, value, out) {
            Some(result) => result,
            None => Err(mismatch(types, ty, value)),
        },
        (TypeKind::Enum(e), Value::Enum(v)) => write_enum(e.base, *v, out),
        (TypeKind::Struct(s), Value::Struct(fields)) => write_struct(types, s, fields, out),
        (TypeKind::Union(_), Value::Union(bytes)) => {
            let size = plain_size(types, ty)?;
            if bytes.len() != size {
                return Err(HdiError::Marshal(format!(
                    "union {} needs {} byte(s), found {}",
                    quote(&types.display_name(ty)),
                    size,
                    bytes.len()
                )));
            }
            out.write_raw(bytes);
            Ok(())
        }
        (TypeKind::Array(element), Value::Seq(items)) | (TypeKind::List(element), Value::Seq(items)) => {
            out.write_len(items.len())?;
            for item in items {
                write_value(types, *element, item, out)?;
            }
            Ok(())
        }
        (TypeKind::Map { key, value: value_ty }, Value::Map(entries)) => {
            out.write_len(entries.len())?;
            for (k, v) in entries {
                write_value(types, *key, k, out)?;
                write_value(types, *value_ty, v, out)?;
            }
            Ok(())
        }
        (TypeKind::Interface(_), Value::Remote(handle)) => {
            out.write_remote_object(*handle);
            Ok(())
        }
        (TypeKind::Sequenceable(_), Value::Sequenceable(payload)) => {
            out.write_length_prefixed_bytes(payload)?;
            Ok(())
        }
        (TypeKind::SharedMemQueue(element), Value::Queue(meta)) => {
            let size = plain_size(types, *element)?;
            if meta.element_size as usize != size {
                return Err(HdiError::Marshal(format!(
                    "queue elements of {} are {} byte(s), not {}",
                    quote(&types.display_name(ty)),
                    size,
                    meta.element_size
                )));
            }
            out.write_fd(meta.fd);
            out.write_scalar(meta.element_size);
            out.write_scalar(meta.element_count);
            out.write_scalar(meta.synchronized);
            Ok(())
        }
        _ => Err(mismatch(types, ty, value)),
    }
}

fn write_struct(types: &TypeArena, s: &StructType, fields: &[(String, Value)], out: &mut ParcelMut) -> Result<()> {
    for member in &s.members {
        let value = fields
            .iter()
            .find(|(name, _)| *name == member.name)
            .map(|(_, value)| value)
            .ok_or_else(|| {
                HdiError::Marshal(format!("struct {} is missing member {}", quote(&s.name), quote(&member.name)))
            })?;
        write_value(types, member.ty, value, out)?;
    }
    Ok(())
}

/// Reads one value of type `ty` from the current position of `parcel`.
pub fn read_value(types: &TypeArena, ty: TypeId, parcel: &mut Parcel) -> Result<Value> {
    match types.get(ty) {
        TypeKind::Primitive(kind) => Ok(read_primitive(*kind, parcel)?),
        TypeKind::Enum(e) => Ok(Value::Enum(read_enum(e.base, parcel)?)),
        TypeKind::Struct(s) => {
            let mut fields = Vec::with_capacity(s.members.len());
            for member in &s.members {
                fields.push((member.name.clone(), read_value(types, member.ty, parcel)?));
            }
            Ok(Value::Struct(fields))
        }
        TypeKind::Union(_) => {
            let size = plain_size(types, ty)?;
            Ok(Value::Union(parcel.read_raw(size)?.to_vec()))
        }
        TypeKind::Array(element) | TypeKind::List(element) => {
            let len = parcel.read_len()?;
            let mut items = Vec::with_capacity(len.min(parcel.remaining()));
            for _ in 0..len {
                items.push(read_value(types, *element, parcel)?);
            }
            Ok(Value::Seq(items))
        }
        TypeKind::Map { key, value } => {
            let len = parcel.read_len()?;
            let mut entries = Vec::with_capacity(len.min(parcel.remaining()));
            for _ in 0..len {
                let k = read_value(types, *key, parcel)?;
                let v = read_value(types, *value, parcel)?;
                entries.push((k, v));
            }
            Ok(Value::Map(entries))
        }
        TypeKind::Interface(_) => Ok(Value::Remote(parcel.read_remote_object()?)),
        TypeKind::Sequenceable(_) => Ok(Value::Sequenceable(parcel.read_length_prefixed_bytes()?.to_vec())),
        TypeKind::SharedMemQueue(_) => Ok(Value::Queue(QueueMeta {
            fd:            parcel.read_fd()?,
            element_size:  parcel.read_scalar()?,
            element_count: parcel.read_scalar()?,
            synchronized:  parcel.read_scalar()?,
        })),
    }
}

/// Builds the raw block of union `ty` holding `value` in member `member`.
/// The block is zero padded up to the size of the largest member.
pub fn pack_union(types: &TypeArena, ty: TypeId, member: &str, value: &Value) -> Result<Value> {
    let body = match types.get(ty) {
        TypeKind::Union(u) => u,
        _ => return Err(mismatch(types, ty, value)),
    };
    let size = plain_size(types, ty)?;
    let member = body
        .members
        .iter()
        .find(|m| m.name == member)
        .ok_or_else(|| HdiError::Marshal(format!("union {} has no member {}", quote(&body.name), quote(member))))?;

    let mut out = ParcelMut::new();
    write_value(types, member.ty, value, &mut out)?;
    let mut bytes = out.data();
    bytes.resize(size, 0);
    Ok(Value::Union(bytes))
}

/// Reinterprets the raw block of union `ty` as member `member`.
pub fn unpack_union(types: &TypeArena, ty: TypeId, member: &str, block: &Value) -> Result<Value> {
    let (body, bytes) = match (types.get(ty), block) {
        (TypeKind::Union(u), Value::Union(bytes)) => (u, bytes),
        _ => return Err(mismatch(types, ty, block)),
    };
    let member = body
        .members
        .iter()
        .find(|m| m.name == member)
        .ok_or_else(|| HdiError::Marshal(format!("union {} has no member {}", quote(&body.name), quote(member))))?;
    read_value(types, member.ty, &mut Parcel::new(bytes))
}

/// A decoded request as the stub sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// `in` arguments in declaration order.
    pub in_args:    Vec<Value>,
    /// Caller capacities of the `out` strings, arrays and lists, present only
    /// when the caller set the out-of-band flag.
    pub capacities: Option<Vec<u32>>,
}

/// Encodes and decodes whole requests and replies of one method.
///
/// Request layout: the out-of-band flag (only for methods with an `out`
/// string, array or list), then one capacity per such parameter when the flag
/// is set, then every `in` argument. Reply layout: every `out` value.
pub struct RequestCodec<'a> {
    types:  &'a TypeArena,
    method: &'a Method,
}

impl<'a> RequestCodec<'a> {
    pub fn new(types: &'a TypeArena, method: &'a Method) -> RequestCodec<'a> {
        RequestCodec { types, method }
    }

    fn check_count(&self, what: &str, expected: usize, found: usize) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(HdiError::Marshal(format!(
                "{} takes {} {} argument(s), {} given",
                quote(&self.method.name),
                expected,
                what,
                found
            )))
        }
    }

    pub fn encode_request(&self, in_args: &[Value], capacities: Option<&[u32]>) -> Result<Vec<u8>> {
        let mut out = ParcelMut::new();
        if self.method.needs_capacity_flag(self.types) {
            out.write_scalar(capacities.is_some());
            if let Some(capacities) = capacities {
                let count = self.method.capacity_params(self.types).count();
                self.check_count("capacity", count, capacities.len())?;
                for &capacity in capacities {
                    out.write_scalar(capacity);
                }
            }
        }

        self.check_count("in", self.method.in_params().count(), in_args.len())?;
        for (param, value) in self.method.in_params().zip(in_args) {
            write_value(self.types, param.ty, value, &mut out)?;
        }
        Ok(out.data())
    }

    pub fn decode_request(&self, bytes: &[u8]) -> Result<Request> {
        let mut parcel = Parcel::new(bytes);
        let mut capacities = None;
        if self.method.needs_capacity_flag(self.types) && parcel.read_scalar::<bool>()? {
            let mut list = Vec::new();
            for _ in self.method.capacity_params(self.types) {
                list.push(parcel.read_scalar::<u32>()?);
            }
            capacities = Some(list);
        }

        let mut in_args = Vec::new();
        for param in self.method.in_params() {
            in_args.push(read_value(self.types, param.ty, &mut parcel)?);
        }
        if !parcel.is_exhausted() {
            return Err(HdiError::Marshal(format!(
                "{} trailing byte(s) after the request of {}",
                parcel.remaining(),
                quote(&self.method.name)
            )));
        }
        Ok(Request { in_args, capacities })
    }

    /// Writes the `out` values, refusing any that exceed the caller's capacity.
    pub fn encode_reply(&self, request: &Request, out_args: &[Value]) -> Result<Vec<u8>> {
        self.check_count("out", self.method.out_params().count(), out_args.len())?;
        let mut capacities = request.capacities.iter().flatten();
        let mut out = ParcelMut::new();
        for (param, value) in self.method.out_params().zip(out_args) {
            if self.types.needs_capacity(param.ty) {
                if let Some(&capacity) = capacities.next() {
                    check_capacity(value, capacity as usize)?;
                }
            }
            write_value(self.types, param.ty, value, &mut out)?;
        }
        Ok(out.data())
    }

    pub fn decode_reply(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        let mut parcel = Parcel::new(bytes);
        let mut values = Vec::new();
        for param in self.method.out_params() {
            values.push(read_value(self.types, param.ty, &mut parcel)?);
        }
        Ok(values)
    }
}

/// Strings need room for their terminator, sequences only for their elements.
fn check_capacity(value: &Value, capacity: usize) -> std::result::Result<(), ParcelError> {
    let (needed, fits) = match value {
        Value::String(s) => (s.len() + 1, s.len() < capacity),
        other => (other.len(), other.len() <= capacity),
    };
    if fits {
        Ok(())
    } else {
        Err(ParcelError::CapacityExceeded { needed, capacity })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{
        Attributes, Direction, EnumMember, EnumType, Member, NamespaceId, Parameter, Position,
    };

    fn round_trip(types: &TypeArena, ty: TypeId, value: Value) {
        let mut out = ParcelMut::new();
        write_value(types, ty, &value, &mut out).unwrap();
        let bytes = out.data();
        let mut parcel = Parcel::new(&bytes);
        assert_eq!(read_value(types, ty, &mut parcel).unwrap(), value);
        assert!(parcel.is_exhausted());
    }

    fn body(name: &str, members: &[(&str, TypeId)]) -> StructType {
        StructType {
            name:      name.to_owned(),
            namespace: NamespaceId::ROOT,
            unit:      "Types".to_owned(),
            members:   members
                .iter()
                .map(|&(n, ty)| Member {
                    name: n.to_owned(),
                    ty,
                    pos: Position::default(),
                })
                .collect(),
            attrs:     Attributes::default(),
            pos:       Position::default(),
        }
    }

    struct Fixture {
        types:  TypeArena,
        point:  TypeId,
        number: TypeId,
        color:  TypeId,
    }

    fn fixture() -> Fixture {
        let mut types = TypeArena::new();
        let int = types.primitive(PrimitiveKind::Int);
        let double = types.primitive(PrimitiveKind::Double);
        let short = types.primitive(PrimitiveKind::Short);
        let point = types.alloc(TypeKind::Struct(body("Point", &[("x", int), ("y", int)])));
        let number = types.alloc(TypeKind::Union(body("Number", &[("s", short), ("d", double)])));
        let color = types.alloc(TypeKind::Enum(EnumType {
            name:      "Color".to_owned(),
            namespace: NamespaceId::ROOT,
            unit:      "Types".to_owned(),
            base:      PrimitiveKind::UChar,
            members:   vec![EnumMember {
                name:  "RED".to_owned(),
                value: 0,
                pos:   Position::default(),
            }],
            attrs:     Attributes::default(),
            pos:       Position::default(),
        }));
        Fixture {
            types,
            point,
            number,
            color,
        }
    }

    #[test]
    fn scalars_and_strings() {
        let f = fixture();
        let t = &f.types;
        round_trip(t, t.primitive(PrimitiveKind::Boolean), Value::Bool(true));
        round_trip(t, t.primitive(PrimitiveKind::Byte), Value::I8(-3));
        round_trip(t, t.primitive(PrimitiveKind::UShort), Value::U16(65535));
        round_trip(t, t.primitive(PrimitiveKind::Long), Value::I64(i64::MIN));
        round_trip(t, t.primitive(PrimitiveKind::Float), Value::F32(1.5));
        round_trip(t, t.primitive(PrimitiveKind::String), Value::String("héllo".to_owned()));
        round_trip(t, t.primitive(PrimitiveKind::FileDescriptor), Value::Fd(7));
        round_trip(t, f.color, Value::Enum(200));
    }

    #[test]
    fn enum_width_follows_base() {
        let f = fixture();
        let mut out = ParcelMut::new();
        write_value(&f.types, f.color, &Value::Enum(9), &mut out).unwrap();
        assert_eq!(out.as_slice(), &[9]);
        assert!(write_value(&f.types, f.color, &Value::Enum(256), &mut ParcelMut::new()).is_err());
    }

    #[test]
    fn unsigned_long_enum_carries_its_largest_value() {
        let mut types = TypeArena::new();
        let big = types.alloc(TypeKind::Enum(EnumType {
            name:      "Big".to_owned(),
            namespace: NamespaceId::ROOT,
            unit:      "Types".to_owned(),
            base:      PrimitiveKind::ULong,
            members:   vec![EnumMember {
                name:  "HIGH".to_owned(),
                value: u64::MAX as i128,
                pos:   Position::default(),
            }],
            attrs:     Attributes::default(),
            pos:       Position::default(),
        }));
        round_trip(&types, big, Value::Enum(u64::MAX as i128));
        assert!(write_value(&types, big, &Value::Enum(-1), &mut ParcelMut::new()).is_err());
    }

    #[test]
    fn containers_and_structs() {
        let mut f = fixture();
        let string = f.types.primitive(PrimitiveKind::String);
        let int = f.types.primitive(PrimitiveKind::Int);
        let strings = f.types.alloc(TypeKind::Array(string));
        let points = f.types.alloc(TypeKind::List(f.point));
        let map = f.types.alloc(TypeKind::Map { key: string, value: int });
        let point = |x, y| Value::Struct(vec![("x".to_owned(), Value::I32(x)), ("y".to_owned(), Value::I32(y))]);

        round_trip(&f.types, f.point, point(1, -2));
        round_trip(
            &f.types,
            strings,
            Value::Seq(vec![Value::String("a".to_owned()), Value::String(String::new())]),
        );
        round_trip(&f.types, points, Value::Seq(vec![point(0, 0), point(3, 4)]));
        round_trip(
            &f.types,
            map,
            Value::Map(vec![(Value::String("k".to_owned()), Value::I32(1))]),
        );
        round_trip(&f.types, points, Value::Seq(Vec::new()));
    }

    #[test]
    fn unions_are_raw_blocks() {
        let f = fixture();
        let block = pack_union(&f.types, f.number, "s", &Value::I16(-2)).unwrap();
        match &block {
            Value::Union(bytes) => assert_eq!(bytes.len(), 8),
            other => panic!("unexpected {:?}", other),
        }
        round_trip(&f.types, f.number, block.clone());
        assert_eq!(unpack_union(&f.types, f.number, "s", &block).unwrap(), Value::I16(-2));

        let short = Value::Union(vec![0; 4]);
        assert!(write_value(&f.types, f.number, &short, &mut ParcelMut::new()).is_err());
    }

    #[test]
    fn mismatched_value_is_an_error() {
        let f = fixture();
        let err = write_value(&f.types, f.point, &Value::I32(1), &mut ParcelMut::new()).unwrap_err();
        assert!(err.to_string().contains("\"Point\""));
    }

    fn method(types: &TypeArena) -> Method {
        let param = |name: &str, direction, ty| Parameter {
            name: name.to_owned(),
            direction,
            ty,
            pos: Position::default(),
        };
        Method {
            name:        "Query".to_owned(),
            attrs:       Attributes::default(),
            params:      vec![
                param("id", Direction::In, types.primitive(PrimitiveKind::Int)),
                param("name", Direction::Out, types.primitive(PrimitiveKind::String)),
                param("code", Direction::Out, types.primitive(PrimitiveKind::UInt)),
            ],
            pos:         Position::default(),
            synthesized: false,
        }
    }

    #[test]
    fn request_layout() {
        let f = fixture();
        let method = method(&f.types);
        let codec = RequestCodec::new(&f.types, &method);

        let bytes = codec.encode_request(&[Value::I32(5)], Some(&[16])).unwrap();
        assert_eq!(bytes, [1, 16, 0, 0, 0, 5, 0, 0, 0]);
        let request = codec.decode_request(&bytes).unwrap();
        assert_eq!(request.capacities, Some(vec![16]));
        assert_eq!(request.in_args, [Value::I32(5)]);

        let bytes = codec.encode_request(&[Value::I32(5)], None).unwrap();
        assert_eq!(bytes, [0, 5, 0, 0, 0]);
        assert_eq!(codec.decode_request(&bytes).unwrap().capacities, None);

        assert!(codec.encode_request(&[], None).is_err());
        assert!(codec.decode_request(&[0, 5, 0, 0, 0, 9]).is_err());
    }

    #[test]
    fn reply_respects_capacity() {
        let f = fixture();
        let method = method(&f.types);
        let codec = RequestCodec::new(&f.types, &method);
        let request = Request {
            in_args:    vec![Value::I32(5)],
            capacities: Some(vec![4]),
        };

        let reply = [Value::String("abc".to_owned()), Value::U32(1)];
        let bytes = codec.encode_reply(&request, &reply).unwrap();
        assert_eq!(codec.decode_reply(&bytes).unwrap(), reply);

        let too_long = [Value::String("abcd".to_owned()), Value::U32(1)];
        match codec.encode_reply(&request, &too_long) {
            Err(HdiError::Parcel(ParcelError::CapacityExceeded { needed: 5, capacity: 4 })) => {}
            other => panic!("unexpected {:?}", other),
        }

        let unbounded = Request {
            capacities: None,
            ..request
        };
        assert!(codec.encode_reply(&unbounded, &too_long).is_ok());
    }
}
