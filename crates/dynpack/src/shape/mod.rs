// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type descriptions: the input language of converter synthesis.
//!
//! A [`TypeShape`] describes one type: its properties, constructor policy,
//! collection or dictionary nature, enum membership, and known subtypes.
//! The synthesis visitor compiles a shape into a converter exactly once per
//! serializer; shapes themselves are immutable and freely shared.

mod builder;

pub use builder::ShapeBuilder;

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Hook invoked on the owner value before any of its bytes are written.
pub type SerializeHook = Arc<dyn Fn(&Value) + Send + Sync>;
/// Hook invoked on the decoded value after all its entries were read.
pub type DeserializeHook = Arc<dyn Fn(&mut Value) + Send + Sync>;
/// Per-property predicate deciding whether the property is written.
pub type ShouldSerialize = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Leaf types with fixed wire mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveShape {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Str,
    Bin,
    /// Opaque carrier: one MessagePack value passed through verbatim.
    Raw,
}

impl PrimitiveShape {
    /// Canonical type name, also the converter-cache key for the primitive.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Str => "str",
            Self::Bin => "bin",
            Self::Raw => "raw",
        }
    }
}

/// The alias identifying a subtype inside a polymorphic envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Alias {
    Int(u32),
    Str(Arc<str>),
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "`{s}`"),
        }
    }
}

impl From<u32> for Alias {
    fn from(v: u32) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Alias {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

/// Known subtypes of a base type: alias plus derived shape, in
/// registration order.
#[derive(Clone)]
pub struct SubTypeMapping {
    entries: Vec<(Alias, Arc<TypeShape>)>,
}

impl SubTypeMapping {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register one subtype under an alias.
    #[must_use]
    pub fn with(mut self, alias: impl Into<Alias>, shape: Arc<TypeShape>) -> Self {
        self.entries.push((alias.into(), shape));
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[(Alias, Arc<TypeShape>)] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SubTypeMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubTypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self
            .entries
            .iter()
            .map(|(alias, shape)| format!("{alias} => {}", shape.name))
            .collect();
        f.debug_tuple("SubTypeMapping").field(&names).finish()
    }
}

/// How the decoder obtains an instance of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constructor {
    /// Parameterless construction; properties are set as they are read.
    Default,
    /// Construction from named parameters. Each name must match a property
    /// name case-sensitively; property values are buffered before the
    /// object is built.
    Parameterized(Vec<String>),
    /// No usable constructor; the read path fails.
    None,
}

/// One property of an object shape.
#[derive(Clone)]
pub struct PropertyShape {
    pub name: Arc<str>,
    /// Explicit integer key. Any keyed property switches the whole object
    /// to the array layout.
    pub key: Option<u32>,
    pub shape: Arc<TypeShape>,
    /// Whether the property can be read off an in-memory value (a getter).
    pub can_get: bool,
    /// Whether the property can be written back on decode (a setter).
    pub can_set: bool,
    /// Prefer the async write/read path for this property.
    pub prefer_async: bool,
    pub should_serialize: Option<ShouldSerialize>,
}

impl PropertyShape {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, shape: Arc<TypeShape>) -> Self {
        Self {
            name: name.into(),
            key: None,
            shape,
            can_get: true,
            can_set: true,
            prefer_async: false,
            should_serialize: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: u32) -> Self {
        self.key = Some(key);
        self
    }

    #[must_use]
    pub fn get_only(mut self) -> Self {
        self.can_set = false;
        self
    }

    #[must_use]
    pub fn set_only(mut self) -> Self {
        self.can_get = false;
        self
    }

    #[must_use]
    pub fn prefer_async(mut self) -> Self {
        self.prefer_async = true;
        self
    }

    #[must_use]
    pub fn with_should_serialize(mut self, pred: ShouldSerialize) -> Self {
        self.should_serialize = Some(pred);
        self
    }
}

impl fmt::Debug for PropertyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyShape")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("type", &self.shape.name)
            .field("can_get", &self.can_get)
            .field("can_set", &self.can_set)
            .field("prefer_async", &self.prefer_async)
            .field("conditional", &self.should_serialize.is_some())
            .finish()
    }
}

/// Struct-like type: properties, constructor policy, optional subtypes and
/// lifecycle hooks.
///
/// Encode order is the declaration order of `properties`; that order is
/// normative for this engine.
#[derive(Clone)]
pub struct ObjectShape {
    pub properties: Vec<PropertyShape>,
    pub constructor: Constructor,
    pub sub_types: Option<SubTypeMapping>,
    pub before_serialize: Option<SerializeHook>,
    pub after_deserialize: Option<DeserializeHook>,
}

impl ObjectShape {
    /// Whether any property declares an explicit integer key.
    #[must_use]
    pub fn uses_integer_keys(&self) -> bool {
        self.properties.iter().any(|p| p.key.is_some())
    }
}

impl fmt::Debug for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectShape")
            .field("properties", &self.properties)
            .field("constructor", &self.constructor)
            .field("sub_types", &self.sub_types)
            .field("before_serialize", &self.before_serialize.is_some())
            .field("after_deserialize", &self.after_deserialize.is_some())
            .finish()
    }
}

/// Named enumeration over integer constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumShape {
    /// `(member name, underlying value)` pairs.
    pub members: Vec<(String, i64)>,
}

/// The kind of a type.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    Primitive(PrimitiveShape),
    Enum(EnumShape),
    /// Optional wrapper: nil on the wire, or the inner value.
    Nullable(Arc<TypeShape>),
    /// Homogeneous sequence.
    Array(Arc<TypeShape>),
    /// Rectangular multi-dimensional array. The wire layout is chosen by
    /// the serializer options.
    MultiDimArray {
        element: Arc<TypeShape>,
        rank: usize,
    },
    /// Homogeneous dictionary.
    Dictionary {
        key: Arc<TypeShape>,
        value: Arc<TypeShape>,
    },
    Object(ObjectShape),
    /// Reference to a named type, resolved at synthesis time. This is how
    /// recursive types are expressed; the target must be the type under
    /// synthesis or registered with the serializer.
    Reference(Arc<str>),
}

/// A complete type description.
#[derive(Debug, Clone)]
pub struct TypeShape {
    pub name: Arc<str>,
    pub kind: ShapeKind,
}

impl TypeShape {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, kind: ShapeKind) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
        })
    }

    /// A primitive shape, named after the primitive itself.
    #[must_use]
    pub fn primitive(prim: PrimitiveShape) -> Arc<Self> {
        Self::new(prim.name(), ShapeKind::Primitive(prim))
    }

    /// An anonymous nullable wrapper around `inner`.
    #[must_use]
    pub fn nullable(inner: Arc<TypeShape>) -> Arc<Self> {
        let name = format!("{}?", inner.name);
        Self::new(name, ShapeKind::Nullable(inner))
    }

    /// An anonymous sequence of `element`.
    #[must_use]
    pub fn array(element: Arc<TypeShape>) -> Arc<Self> {
        let name = format!("[{}]", element.name);
        Self::new(name, ShapeKind::Array(element))
    }

    /// A rectangular array of `rank` dimensions.
    #[must_use]
    pub fn multi_dim_array(element: Arc<TypeShape>, rank: usize) -> Arc<Self> {
        let name = format!("[{}; rank {rank}]", element.name);
        Self::new(name, ShapeKind::MultiDimArray { element, rank })
    }

    /// An anonymous dictionary.
    #[must_use]
    pub fn dictionary(key: Arc<TypeShape>, value: Arc<TypeShape>) -> Arc<Self> {
        let name = format!("{{{} => {}}}", key.name, value.name);
        Self::new(name, ShapeKind::Dictionary { key, value })
    }

    /// A reference to a named type, resolved at synthesis time.
    #[must_use]
    pub fn reference(target: impl Into<Arc<str>>) -> Arc<Self> {
        let target = target.into();
        Self::new(target.clone(), ShapeKind::Reference(target))
    }

    /// A named enumeration.
    #[must_use]
    pub fn enumeration(
        name: impl Into<Arc<str>>,
        members: Vec<(String, i64)>,
    ) -> Arc<Self> {
        Self::new(name, ShapeKind::Enum(EnumShape { members }))
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, ShapeKind::Object(_))
    }

    /// The object description, if this is an object shape.
    #[must_use]
    pub fn object(&self) -> Option<&ObjectShape> {
        match &self.kind {
            ShapeKind::Object(obj) => Some(obj),
            _ => None,
        }
    }
}
