use serde::Serialize;

use crate::ast::{
    interface::InterfaceType,
    namespace::NamespaceId,
    Attributes,
    Position,
};

/// Index of a type node in the module-wide [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    UChar,
    UShort,
    UInt,
    ULong,
    String,
    FileDescriptor,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 14] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::UChar,
        PrimitiveKind::UShort,
        PrimitiveKind::UInt,
        PrimitiveKind::ULong,
        PrimitiveKind::String,
        PrimitiveKind::FileDescriptor,
        PrimitiveKind::Void,
    ];

    pub fn idl_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::UChar => "unsigned char",
            PrimitiveKind::UShort => "unsigned short",
            PrimitiveKind::UInt => "unsigned int",
            PrimitiveKind::ULong => "unsigned long",
            PrimitiveKind::String => "String",
            PrimitiveKind::FileDescriptor => "FileDescriptor",
            PrimitiveKind::Void => "void",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::UChar
                | PrimitiveKind::UShort
                | PrimitiveKind::UInt
                | PrimitiveKind::ULong
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveKind::UChar | PrimitiveKind::UShort | PrimitiveKind::UInt | PrimitiveKind::ULong
        )
    }

    /// Wire width of plain-data primitives. Strings, descriptors and void have none.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            PrimitiveKind::Boolean | PrimitiveKind::Byte | PrimitiveKind::UChar => Some(1),
            PrimitiveKind::Short | PrimitiveKind::UShort => Some(2),
            PrimitiveKind::Int | PrimitiveKind::UInt | PrimitiveKind::Float => Some(4),
            PrimitiveKind::Long | PrimitiveKind::ULong | PrimitiveKind::Double => Some(8),
            PrimitiveKind::String | PrimitiveKind::FileDescriptor | PrimitiveKind::Void => None,
        }
    }

    /// Inclusive value range of an integral kind.
    pub fn range(self) -> Option<(i128, i128)> {
        let range = match self {
            PrimitiveKind::Byte => (i8::MIN as i128, i8::MAX as i128),
            PrimitiveKind::Short => (i16::MIN as i128, i16::MAX as i128),
            PrimitiveKind::Int => (i32::MIN as i128, i32::MAX as i128),
            PrimitiveKind::Long => (i64::MIN as i128, i64::MAX as i128),
            PrimitiveKind::UChar => (0, u8::MAX as i128),
            PrimitiveKind::UShort => (0, u16::MAX as i128),
            PrimitiveKind::UInt => (0, u32::MAX as i128),
            PrimitiveKind::ULong => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumMember {
    pub name:  String,
    /// Wide enough for every `long` and `unsigned long` value.
    pub value: i128,
    pub pos:   Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumType {
    pub name:      String,
    pub namespace: NamespaceId,
    /// Name of the compilation unit that declares this type.
    pub unit:      String,
    pub base:      PrimitiveKind,
    pub members:   Vec<EnumMember>,
    pub attrs:     Attributes,
    pub pos:       Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub name: String,
    pub ty:   TypeId,
    pub pos:  Position,
}

/// Shared by structs and unions.
#[derive(Debug, Clone, Serialize)]
pub struct StructType {
    pub name:      String,
    pub namespace: NamespaceId,
    pub unit:      String,
    pub members:   Vec<Member>,
    pub attrs:     Attributes,
    pub pos:       Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceableType {
    pub name:      String,
    pub namespace: NamespaceId,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Enum(EnumType),
    Struct(StructType),
    Union(StructType),
    Array(TypeId),
    List(TypeId),
    Map { key: TypeId, value: TypeId },
    Interface(InterfaceType),
    Sequenceable(SequenceableType),
    SharedMemQueue(TypeId),
}

impl TypeKind {
    /// Declared name of user-named kinds.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeKind::Enum(e) => Some(&e.name),
            TypeKind::Struct(s) | TypeKind::Union(s) => Some(&s.name),
            TypeKind::Interface(i) => Some(&i.name),
            TypeKind::Sequenceable(s) => Some(&s.name),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<NamespaceId> {
        match self {
            TypeKind::Enum(e) => Some(e.namespace),
            TypeKind::Struct(s) | TypeKind::Union(s) => Some(s.namespace),
            TypeKind::Interface(i) => Some(i.namespace),
            TypeKind::Sequenceable(s) => Some(s.namespace),
            _ => None,
        }
    }

    pub fn attrs(&self) -> Attributes {
        match self {
            TypeKind::Enum(e) => e.attrs,
            TypeKind::Struct(s) | TypeKind::Union(s) => s.attrs,
            TypeKind::Interface(i) => i.attrs,
            _ => Attributes::default(),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, TypeKind::Array(_) | TypeKind::List(_) | TypeKind::Map { .. })
    }
}

/// Interning key. Composite shapes are keyed by their component ids and
/// named types by `(namespace, name)`, never by concatenated strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Primitive(PrimitiveKind),
    Array(TypeId),
    List(TypeId),
    Map(TypeId, TypeId),
    SharedMemQueue(TypeId),
    Named { namespace: NamespaceId, name: String },
}

/// Arena of every type node of a run. Primitives occupy the first slots.
#[derive(Debug, Clone, Serialize)]
pub struct TypeArena {
    kinds: Vec<TypeKind>,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub fn new() -> TypeArena {
        TypeArena {
            kinds: PrimitiveKind::ALL.iter().map(|&p| TypeKind::Primitive(p)).collect(),
        }
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        TypeId(kind as u32)
    }

    pub fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.kinds[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Drops every node allocated after `len`, used to discard a failed unit.
    pub fn truncate(&mut self, len: usize) {
        self.kinds.truncate(len.max(PrimitiveKind::ALL.len()));
    }

    pub fn as_primitive(&self, id: TypeId) -> Option<PrimitiveKind> {
        match self.get(id) {
            TypeKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_interface(&self, id: TypeId) -> Option<&InterfaceType> {
        match self.get(id) {
            TypeKind::Interface(i) => Some(i),
            _ => None,
        }
    }

    /// Element type of arrays and lists.
    pub fn element(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            TypeKind::Array(e) | TypeKind::List(e) => Some(*e),
            _ => None,
        }
    }

    /// Spelling of the type as written in IDL.
    pub fn display_name(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeKind::Primitive(p) => p.idl_name().to_owned(),
            TypeKind::Enum(e) => e.name.clone(),
            TypeKind::Struct(s) | TypeKind::Union(s) => s.name.clone(),
            TypeKind::Interface(i) => i.name.clone(),
            TypeKind::Sequenceable(s) => s.name.clone(),
            TypeKind::Array(e) => format!("{}[]", self.display_name(*e)),
            TypeKind::List(e) => format!("List<{}>", self.display_name(*e)),
            TypeKind::Map { key, value } => {
                format!("Map<{}, {}>", self.display_name(*key), self.display_name(*value))
            }
            TypeKind::SharedMemQueue(e) => format!("SharedMemQueue<{}>", self.display_name(*e)),
        }
    }

    /// Byte size of a type that marshals as plain data, `None` otherwise.
    /// Unions are sized to their largest member.
    pub fn fixed_size(&self, id: TypeId) -> Option<usize> {
        match self.get(id) {
            TypeKind::Primitive(p) => p.fixed_size(),
            TypeKind::Enum(e) => e.base.fixed_size(),
            TypeKind::Struct(s) => s
                .members
                .iter()
                .map(|m| self.fixed_size(m.ty))
                .sum::<Option<usize>>(),
            TypeKind::Union(u) => u
                .members
                .iter()
                .map(|m| self.fixed_size(m.ty))
                .try_fold(0usize, |max, size| size.map(|size| max.max(size))),
            TypeKind::Array(_)
            | TypeKind::List(_)
            | TypeKind::Map { .. }
            | TypeKind::Interface(_)
            | TypeKind::Sequenceable(_)
            | TypeKind::SharedMemQueue(_) => None,
        }
    }

    /// True for types whose `out` parameters need a caller-supplied capacity.
    pub fn needs_capacity(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            TypeKind::Primitive(PrimitiveKind::String) | TypeKind::Array(_) | TypeKind::List(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_struct(name: &str, members: Vec<(&str, TypeId)>) -> StructType {
        StructType {
            name:      name.to_owned(),
            namespace: NamespaceId::ROOT,
            unit:      "Types".to_owned(),
            members:   members
                .into_iter()
                .map(|(n, ty)| Member {
                    name: n.to_owned(),
                    ty,
                    pos: Position::default(),
                })
                .collect(),
            attrs:     Attributes::default(),
            pos:       Position::default(),
        }
    }

    #[test]
    fn primitives_are_preallocated() {
        let arena = TypeArena::new();
        for &p in PrimitiveKind::ALL.iter() {
            assert_eq!(arena.as_primitive(arena.primitive(p)), Some(p));
        }
    }

    #[test]
    fn sizes_and_names() {
        let mut arena = TypeArena::new();
        let int = arena.primitive(PrimitiveKind::Int);
        let double = arena.primitive(PrimitiveKind::Double);
        let string = arena.primitive(PrimitiveKind::String);

        let point = arena.alloc(TypeKind::Struct(named_struct("Point", vec![("x", int), ("y", double)])));
        let data = arena.alloc(TypeKind::Union(named_struct("Data", vec![("a", int), ("p", point)])));
        let named = arena.alloc(TypeKind::Struct(named_struct("Named", vec![("n", string)])));
        let list = arena.alloc(TypeKind::List(point));
        let map = arena.alloc(TypeKind::Map { key: string, value: list });

        assert_eq!(arena.fixed_size(point), Some(12));
        assert_eq!(arena.fixed_size(data), Some(12));
        assert_eq!(arena.fixed_size(named), None);
        assert_eq!(arena.fixed_size(list), None);

        assert_eq!(arena.display_name(map), "Map<String, List<Point>>");
        assert!(arena.needs_capacity(string));
        assert!(arena.needs_capacity(list));
        assert!(!arena.needs_capacity(map));

        let len = arena.len();
        arena.alloc(TypeKind::Array(int));
        arena.truncate(len);
        assert_eq!(arena.len(), len);
    }
}
