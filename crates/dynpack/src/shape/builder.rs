// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder for object shapes.

use super::{
    Constructor, DeserializeHook, ObjectShape, PrimitiveShape, PropertyShape, SerializeHook,
    ShapeKind, SubTypeMapping, TypeShape,
};
use std::sync::Arc;

/// Builder for object [`TypeShape`]s.
///
/// # Example
///
/// ```rust
/// use dynpack::{PrimitiveShape, ShapeBuilder};
///
/// let shape = ShapeBuilder::new("SensorReading")
///     .field("sensor_id", PrimitiveShape::U32)
///     .field("temperature", PrimitiveShape::F64)
///     .string_field("location")
///     .build();
/// assert_eq!(shape.name.as_ref(), "SensorReading");
/// ```
pub struct ShapeBuilder {
    name: Arc<str>,
    properties: Vec<PropertyShape>,
    constructor: Constructor,
    sub_types: Option<SubTypeMapping>,
    before_serialize: Option<SerializeHook>,
    after_deserialize: Option<DeserializeHook>,
}

impl ShapeBuilder {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            constructor: Constructor::Default,
            sub_types: None,
            before_serialize: None,
            after_deserialize: None,
        }
    }

    /// Add a primitive property.
    #[must_use]
    pub fn field(self, name: impl Into<Arc<str>>, prim: PrimitiveShape) -> Self {
        self.field_with_shape(name, TypeShape::primitive(prim))
    }

    /// Add a property with an explicit type shape.
    #[must_use]
    pub fn field_with_shape(mut self, name: impl Into<Arc<str>>, shape: Arc<TypeShape>) -> Self {
        self.properties.push(PropertyShape::new(name, shape));
        self
    }

    /// Add a primitive property under an explicit integer key. Any keyed
    /// property switches the whole object to the array layout.
    #[must_use]
    pub fn keyed_field(self, name: impl Into<Arc<str>>, key: u32, prim: PrimitiveShape) -> Self {
        self.keyed_field_with_shape(name, key, TypeShape::primitive(prim))
    }

    /// Add a property with an explicit integer key and type shape.
    #[must_use]
    pub fn keyed_field_with_shape(
        mut self,
        name: impl Into<Arc<str>>,
        key: u32,
        shape: Arc<TypeShape>,
    ) -> Self {
        self.properties
            .push(PropertyShape::new(name, shape).with_key(key));
        self
    }

    /// Add a string property.
    #[must_use]
    pub fn string_field(self, name: impl Into<Arc<str>>) -> Self {
        self.field(name, PrimitiveShape::Str)
    }

    /// Add a nullable property.
    #[must_use]
    pub fn nullable_field(self, name: impl Into<Arc<str>>, prim: PrimitiveShape) -> Self {
        self.field_with_shape(name, TypeShape::nullable(TypeShape::primitive(prim)))
    }

    /// Add a sequence property.
    #[must_use]
    pub fn array_field(self, name: impl Into<Arc<str>>, element: Arc<TypeShape>) -> Self {
        self.field_with_shape(name, TypeShape::array(element))
    }

    /// Add a fully configured property.
    #[must_use]
    pub fn property(mut self, property: PropertyShape) -> Self {
        self.properties.push(property);
        self
    }

    /// Set the constructor policy. Defaults to [`Constructor::Default`].
    #[must_use]
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    /// Declare the known subtypes of this type.
    #[must_use]
    pub fn sub_types(mut self, mapping: SubTypeMapping) -> Self {
        self.sub_types = Some(mapping);
        self
    }

    /// Hook invoked before any of the value's bytes are written.
    #[must_use]
    pub fn before_serialize(mut self, hook: SerializeHook) -> Self {
        self.before_serialize = Some(hook);
        self
    }

    /// Hook invoked after all the value's entries were read.
    #[must_use]
    pub fn after_deserialize(mut self, hook: DeserializeHook) -> Self {
        self.after_deserialize = Some(hook);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<TypeShape> {
        TypeShape::new(
            self.name,
            ShapeKind::Object(ObjectShape {
                properties: self.properties,
                constructor: self.constructor,
                sub_types: self.sub_types,
                before_serialize: self.before_serialize,
                after_deserialize: self.after_deserialize,
            }),
        )
    }
}
