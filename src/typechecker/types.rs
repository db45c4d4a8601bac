use serde::{Deserialize, Serialize};

/// Index of an interned type in the registry. Interning canonicalizes
/// structurally identical types, so two ids are the same type iff they
/// are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const INVALID: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const I32: TypeId = TypeId(2);
    pub const F32: TypeId = TypeId(3);
    pub const BOOL: TypeId = TypeId(4);
    pub const TYPE: TypeId = TypeId(5);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    Invalid = 0,
    Void = 1,
    I32 = 2,
    F32 = 3,
    Bool = 4,
    Type = 5,
    Function = 6,
    Struct = 7,
    Pointer = 8,
    Array = 9,
}

impl TypeTag {
    pub fn from_u8(byte: u8) -> Option<TypeTag> {
        match byte {
            0 => Some(TypeTag::Invalid),
            1 => Some(TypeTag::Void),
            2 => Some(TypeTag::I32),
            3 => Some(TypeTag::F32),
            4 => Some(TypeTag::Bool),
            5 => Some(TypeTag::Type),
            6 => Some(TypeTag::Function),
            7 => Some(TypeTag::Struct),
            8 => Some(TypeTag::Pointer),
            9 => Some(TypeTag::Array),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub ty: TypeId,
    /// Byte offset inside the struct; the sum of the sizes of all
    /// preceding members.
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDetails {
    None,
    Function { params: Vec<TypeId>, return_type: TypeId },
    Struct { members: Vec<Member> },
    Pointer { base: TypeId },
    Array { base: TypeId, dimension: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub tag: TypeTag,
    pub size: u32,
    pub name: String,
    pub details: TypeDetails,
}

/// Append-only interned table of canonical type descriptors. Existing ids
/// never change, so values may freely embed them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::new()
    }
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        let base = |tag, size, name: &str| TypeInfo {
            tag,
            size,
            name: name.to_string(),
            details: TypeDetails::None,
        };
        TypeRegistry {
            types: vec![
                base(TypeTag::Invalid, 0, "invalid"),
                base(TypeTag::Void, 0, "void"),
                base(TypeTag::I32, 4, "i32"),
                base(TypeTag::F32, 4, "f32"),
                base(TypeTag::Bool, 1, "bool"),
                base(TypeTag::Type, 4, "type"),
            ],
        }
    }

    /// Intern a type, returning the id of an identical existing entry if
    /// there is one. Identity is structural except for structs, which are
    /// nominal (compared by name only).
    pub fn intern(&mut self, info: TypeInfo) -> TypeId {
        for (i, existing) in self.types.iter().enumerate() {
            if Self::identical(existing, &info) {
                return TypeId(i as u32);
            }
        }
        self.types.push(info);
        TypeId(self.types.len() as u32 - 1)
    }

    fn identical(a: &TypeInfo, b: &TypeInfo) -> bool {
        if a.tag != b.tag {
            return false;
        }
        match (&a.details, &b.details) {
            (TypeDetails::None, TypeDetails::None) => a.size == b.size,
            (
                TypeDetails::Function { params: pa, return_type: ra },
                TypeDetails::Function { params: pb, return_type: rb },
            ) => pa == pb && ra == rb,
            // Structs are distinct iff their names differ; members are
            // not compared.
            (TypeDetails::Struct { .. }, TypeDetails::Struct { .. }) => a.name == b.name,
            (TypeDetails::Pointer { base: ba }, TypeDetails::Pointer { base: bb }) => ba == bb,
            (
                TypeDetails::Array { base: ba, dimension: da },
                TypeDetails::Array { base: bb, dimension: db },
            ) => ba == bb && da == db,
            _ => false,
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.0 as usize]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.get(id).name
    }

    pub fn tag(&self, id: TypeId) -> TypeTag {
        self.get(id).tag
    }

    pub fn size(&self, id: TypeId) -> u32 {
        self.get(id).size
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        id == TypeId::I32 || id == TypeId::F32
    }

    /// True for types whose runtime representation is a heap pointer and
    /// whose loads/stores move `size` raw bytes.
    pub fn is_boxed(&self, id: TypeId) -> bool {
        matches!(self.tag(id), TypeTag::Struct | TypeTag::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(params: Vec<TypeId>, return_type: TypeId, name: &str) -> TypeInfo {
        TypeInfo {
            tag: TypeTag::Function,
            size: 4,
            name: name.to_string(),
            details: TypeDetails::Function { params, return_type },
        }
    }

    #[test]
    fn test_core_types_are_seeded() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.name(TypeId::INVALID), "invalid");
        assert_eq!(registry.name(TypeId::VOID), "void");
        assert_eq!(registry.name(TypeId::I32), "i32");
        assert_eq!(registry.name(TypeId::F32), "f32");
        assert_eq!(registry.name(TypeId::BOOL), "bool");
        assert_eq!(registry.name(TypeId::TYPE), "type");
        assert_eq!(registry.size(TypeId::I32), 4);
        assert_eq!(registry.size(TypeId::BOOL), 1);
    }

    #[test]
    fn test_function_interning_is_structural() {
        let mut registry = TypeRegistry::new();
        let a = registry.intern(function(vec![TypeId::I32], TypeId::F32, "func (i32) -> f32"));
        let b = registry.intern(function(vec![TypeId::I32], TypeId::F32, "whatever"));
        let c = registry.intern(function(vec![TypeId::F32], TypeId::F32, "func (f32) -> f32"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_struct_interning_is_nominal() {
        let mut registry = TypeRegistry::new();
        let vec2 = TypeInfo {
            tag: TypeTag::Struct,
            size: 8,
            name: "Vec2".into(),
            details: TypeDetails::Struct {
                members: vec![
                    Member { name: "x".into(), ty: TypeId::I32, offset: 0 },
                    Member { name: "y".into(), ty: TypeId::I32, offset: 4 },
                ],
            },
        };
        let other = TypeInfo {
            tag: TypeTag::Struct,
            size: 4,
            name: "Other".into(),
            details: TypeDetails::Struct {
                members: vec![Member { name: "x".into(), ty: TypeId::I32, offset: 0 }],
            },
        };
        let a = registry.intern(vec2.clone());
        let b = registry.intern(vec2);
        let c = registry.intern(other);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_pointer_and_array_identity() {
        let mut registry = TypeRegistry::new();
        let ptr = |base| TypeInfo {
            tag: TypeTag::Pointer,
            size: 4,
            name: "^i32".into(),
            details: TypeDetails::Pointer { base },
        };
        assert_eq!(registry.intern(ptr(TypeId::I32)), registry.intern(ptr(TypeId::I32)));
        assert_ne!(registry.intern(ptr(TypeId::I32)), registry.intern(ptr(TypeId::F32)));

        let arr = |dimension| TypeInfo {
            tag: TypeTag::Array,
            size: 4 * dimension,
            name: format!("[{dimension}]i32"),
            details: TypeDetails::Array { base: TypeId::I32, dimension },
        };
        assert_eq!(registry.intern(arr(3)), registry.intern(arr(3)));
        assert_ne!(registry.intern(arr(3)), registry.intern(arr(4)));
    }

    #[test]
    fn test_interning_is_append_only() {
        let mut registry = TypeRegistry::new();
        let before = registry.len();
        let id = registry.intern(function(vec![], TypeId::VOID, "func ()"));
        assert_eq!(registry.len(), before + 1);
        registry.intern(function(vec![], TypeId::VOID, "func ()"));
        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.tag(id), TypeTag::Function);
    }
}
