use std::fmt;
use std::ops::Index;

/// Shared-memory queue descriptor. Only this metadata crosses the wire, never
/// the queue contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMeta {
    pub fd:            i32,
    pub element_size:  u32,
    pub element_count: u32,
    pub synchronized:  bool,
}

/// This type holds dynamic HDI data.
///
/// Values can represent anything an IDL type describes and are converted to
/// and from parcels by the compiler's marshalling interpreter, which knows the
/// type each value is read or written as.
#[derive(Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Fd(i32),
    /// An enum member, carried as its integer value.
    Enum(i128),
    /// Array or list elements.
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Struct members in declaration order.
    Struct(Vec<(String, Value)>),
    /// The raw block of a union, sized to its largest member.
    Union(Vec<u8>),
    /// Remote-object handle of an interface reference.
    Remote(u64),
    /// Payload produced by a sequenceable's own marshalling delegate.
    Sequenceable(Vec<u8>),
    Queue(QueueMeta),
    Void,
}

impl Value {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// Widens any integer-like value (including enums and descriptors) to
    /// `i64`. Returns `None` for everything else and for `u64` values that do
    /// not fit.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(value) => Some(i64::from(value)),
            Value::I8(value) => Some(i64::from(value)),
            Value::U8(value) => Some(i64::from(value)),
            Value::I16(value) => Some(i64::from(value)),
            Value::U16(value) => Some(i64::from(value)),
            Value::I32(value) | Value::Fd(value) => Some(i64::from(value)),
            Value::U32(value) => Some(i64::from(value)),
            Value::I64(value) => Some(value),
            Value::Enum(value) => i64::try_from(value).ok(),
            Value::U64(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    /// Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    /// A convenience method to extract the elements out of a [Seq](#variant.Seq).
    /// Returns `&[]` for other value kinds.
    pub fn as_seq(&self) -> &[Value] {
        match *self {
            Value::Seq(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Number of elements in a sequence, map or struct, or bytes in a union or
    /// sequenceable payload. Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Seq(ref values) => values.len(),
            Value::Map(ref entries) => entries.len(),
            Value::Struct(ref members) => members.len(),
            Value::Union(ref bytes) | Value::Sequenceable(ref bytes) => bytes.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends to a [Seq](#variant.Seq). Does nothing for other value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::Seq(ref mut values) = *self {
            values.push(value);
        }
    }

    /// Looks up a struct member by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match *self {
            Value::Struct(ref members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Sets a struct member, replacing an existing member of the same name or
    /// appending a new one. Does nothing for other value kinds.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Value::Struct(ref mut members) = *self {
            match members.iter_mut().find(|(member, _)| member == name) {
                Some(slot) => slot.1 = value,
                None => members.push((name.to_owned(), value)),
            }
        }
    }

    /// Short name of the variant, used in marshalling diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match *self {
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::U8(_) => "u8",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::I32(_) => "i32",
            Value::U32(_) => "u32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Fd(_) => "fd",
            Value::Enum(_) => "enum",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Union(_) => "union",
            Value::Remote(_) => "remote",
            Value::Sequenceable(_) => "sequenceable",
            Value::Queue(_) => "queue",
            Value::Void => "void",
        }
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't a [Seq](#variant.Seq) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value {
        match *self {
            Value::Seq(ref values) => &values[index],
            _ => panic!("indexing a {} value", self.kind_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::I8(value) => value.fmt(f),
            Value::U8(value) => value.fmt(f),
            Value::I16(value) => value.fmt(f),
            Value::U16(value) => value.fmt(f),
            Value::I32(value) => value.fmt(f),
            Value::U32(value) => value.fmt(f),
            Value::I64(value) => value.fmt(f),
            Value::U64(value) => value.fmt(f),
            Value::F32(value) => value.fmt(f),
            Value::F64(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Fd(value) => write!(f, "fd({})", value),
            Value::Enum(value) => write!(f, "enum({})", value),
            Value::Seq(ref values) => values.fmt(f),
            Value::Map(ref entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {:?}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Struct(ref members) => {
                write!(f, "{{")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Union(ref bytes) => write!(f, "union{:?}", bytes),
            Value::Remote(handle) => write!(f, "remote({:#x})", handle),
            Value::Sequenceable(ref bytes) => write!(f, "sequenceable{:?}", bytes),
            Value::Queue(ref meta) => meta.fmt(f),
            Value::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_basic() {
        let value = Value::Seq(vec![
            Value::Bool(true),
            Value::U8(255),
            Value::I32(-1),
            Value::U32(1),
            Value::F32(0.5),
            Value::String("abc".to_owned()),
            Value::Enum(3),
            Value::Struct(vec![
                ("key1".to_owned(), Value::String("value1".to_owned())),
                ("key2".to_owned(), Value::I64(2)),
            ]),
        ]);

        assert_eq!(value.len(), 8);

        assert_eq!(value[0], Value::Bool(true));
        assert_eq!(value[1], Value::U8(255));
        assert_eq!(value[5], Value::String("abc".to_owned()));

        assert!(value[0].as_bool());
        assert_eq!(value[1].as_i64(), Some(255));
        assert_eq!(value[2].as_i64(), Some(-1));
        assert_eq!(value[4].as_i64(), None);
        assert_eq!(value[5].as_str(), "abc");
        assert_eq!(value[6].as_i64(), Some(3));
        assert_eq!(value[7].get("key2"), Some(&Value::I64(2)));
        assert_eq!(value[7].get("missing"), None);
    }

    #[test]
    fn value_mutation() {
        let mut seq = Value::Seq(vec![]);
        seq.push(Value::I16(4));
        seq.push(Value::I16(5));
        assert_eq!(seq.as_seq(), &[Value::I16(4), Value::I16(5)]);

        let mut object = Value::Struct(vec![]);
        object.set("a", Value::U16(1));
        object.set("b", Value::U16(2));
        object.set("a", Value::U16(3));
        assert_eq!(object.len(), 2);
        assert_eq!(object.get("a"), Some(&Value::U16(3)));
    }

    #[test]
    fn value_debug() {
        let value = Value::Struct(vec![
            ("id".to_owned(), Value::I32(7)),
            (
                "tags".to_owned(),
                Value::Map(vec![(Value::String("k".to_owned()), Value::Bool(false))]),
            ),
            ("peer".to_owned(), Value::Remote(16)),
        ]);
        assert_eq!(
            format!("{:?}", value),
            "{id: 7, tags: {\"k\": false}, peer: remote(0x10)}"
        );
    }

    #[test]
    fn u64_outside_i64_has_no_integer_view() {
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::U64(9).as_i64(), Some(9));
    }
}
