// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shape-directed converter synthesis.
//!
//! [`Synthesizer::get_or_make`] compiles a shape into a converter, walking
//! member shapes recursively. Named types (objects, enums) are published to
//! the serializer's cache under the insert-once contract; anonymous
//! composites are rebuilt around their members' cached converters on each
//! request. Cycles are broken with forwarding handles local to one
//! synthesis pass, so an unfilled handle can never escape to another
//! thread.

use super::accessor::{ConstructorPlan, PropertyAccessor};
use super::cache::{ConverterCache, ForwardConverter};
use super::{
    ArrayObjectConverter, Converter, DictionaryConverter, EnumConverter, MapObjectConverter,
    MultiDimConverter, NullableConverter, SequenceConverter, SubTypeEnvelopeConverter,
};
use crate::error::{PackError, PackResult};
use crate::serializer::MultiDimLayout;
use crate::shape::{
    Constructor, ObjectShape, PrimitiveShape, ShapeKind, SubTypeMapping, TypeShape,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// One synthesis pass: types currently being built, keyed by name.
#[derive(Default)]
struct Session {
    in_progress: HashMap<Arc<str>, Arc<ForwardConverter>>,
}

/// The shape-directed synthesis visitor.
///
/// Shared by reference across threads; all mutable state is the cache (and
/// the subtype override table), both concurrent.
pub struct Synthesizer {
    cache: Arc<ConverterCache>,
    overrides: Arc<DashMap<Arc<str>, SubTypeMapping>>,
    /// Named shapes registered for reference resolution.
    shapes: Arc<DashMap<Arc<str>, Arc<TypeShape>>>,
    multi_dim_layout: MultiDimLayout,
}

impl Synthesizer {
    pub fn new(
        cache: Arc<ConverterCache>,
        overrides: Arc<DashMap<Arc<str>, SubTypeMapping>>,
        shapes: Arc<DashMap<Arc<str>, Arc<TypeShape>>>,
        multi_dim_layout: MultiDimLayout,
    ) -> Self {
        Self {
            cache,
            overrides,
            shapes,
            multi_dim_layout,
        }
    }

    /// Look up or synthesize the converter for `shape`.
    ///
    /// Lookup order: the instance cache, then (for primitives) the static
    /// registry, then synthesis. Concurrent synthesis of the same type is
    /// allowed; the first published converter wins and later callers
    /// receive it.
    pub fn get_or_make(&self, shape: &Arc<TypeShape>) -> PackResult<Arc<dyn Converter>> {
        let mut session = Session::default();
        self.resolve(shape, &mut session)
    }

    fn resolve(
        &self,
        shape: &Arc<TypeShape>,
        session: &mut Session,
    ) -> PackResult<Arc<dyn Converter>> {
        match &shape.kind {
            ShapeKind::Primitive(prim) => {
                if let Some(found) = self.cache.get(prim.name()) {
                    return Ok(found);
                }
                Ok(super::primitive_converter(*prim))
            }
            ShapeKind::Enum(e) => {
                if let Some(found) = self.cache.get(&shape.name) {
                    return Ok(found);
                }
                let converter: Arc<dyn Converter> = Arc::new(EnumConverter::new(e.members.clone()));
                Ok(self.cache.try_insert(shape.name.clone(), converter))
            }
            ShapeKind::Nullable(inner) => Ok(Arc::new(NullableConverter::new(
                self.resolve(inner, session)?,
            ))),
            ShapeKind::Array(element) => Ok(Arc::new(SequenceConverter::new(
                self.resolve(element, session)?,
            ))),
            ShapeKind::MultiDimArray { element, rank } => Ok(Arc::new(MultiDimConverter::new(
                self.resolve(element, session)?,
                *rank,
                self.multi_dim_layout,
            ))),
            ShapeKind::Dictionary { key, value } => Ok(Arc::new(DictionaryConverter::new(
                self.resolve(key, session)?,
                self.resolve(value, session)?,
            ))),
            ShapeKind::Object(obj) => self.resolve_object(shape, obj, session),
            ShapeKind::Reference(target) => self.resolve_reference(target, session),
        }
    }

    fn resolve_reference(
        &self,
        target: &Arc<str>,
        session: &mut Session,
    ) -> PackResult<Arc<dyn Converter>> {
        if let Some(forward) = session.in_progress.get(target) {
            return Ok(forward.clone());
        }
        if let Some(found) = self.cache.get(target) {
            return Ok(found);
        }
        let registered = self
            .shapes
            .get(target)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PackError::InvalidShape {
                type_name: target.to_string(),
                detail: "reference to an unregistered type".to_string(),
            })?;
        self.resolve(&registered, session)
    }

    fn resolve_object(
        &self,
        shape: &Arc<TypeShape>,
        obj: &ObjectShape,
        session: &mut Session,
    ) -> PackResult<Arc<dyn Converter>> {
        if let Some(found) = self.cache.get(&shape.name) {
            return Ok(found);
        }
        if let Some(forward) = session.in_progress.get(&shape.name) {
            // recursive reference into a type currently being built
            return Ok(forward.clone());
        }

        let forward = Arc::new(ForwardConverter::new());
        session
            .in_progress
            .insert(shape.name.clone(), forward.clone());
        let built = self.build_object(shape, obj, session);
        session.in_progress.remove(&shape.name);
        let built = built?;
        forward.fill(built.clone());

        let published = self.cache.try_insert(shape.name.clone(), built);
        tracing::debug!(type_name = %shape.name, "synthesized object converter");
        Ok(published)
    }

    fn build_object(
        &self,
        shape: &Arc<TypeShape>,
        obj: &ObjectShape,
        session: &mut Session,
    ) -> PackResult<Arc<dyn Converter>> {
        let ctor_params: Vec<&str> = match &obj.constructor {
            Constructor::Parameterized(params) => {
                for param in params {
                    if !obj.properties.iter().any(|p| p.name.as_ref() == param.as_str()) {
                        return Err(PackError::InvalidShape {
                            type_name: shape.name.to_string(),
                            detail: format!("constructor parameter `{param}` matches no property"),
                        });
                    }
                }
                params.iter().map(String::as_str).collect()
            }
            _ => Vec::new(),
        };
        let plan = match &obj.constructor {
            Constructor::Default => ConstructorPlan::Default,
            Constructor::None => ConstructorPlan::Unavailable,
            Constructor::Parameterized(_) => ConstructorPlan::Buffered {
                declared: obj.properties.iter().map(|p| p.name.clone()).collect(),
            },
        };

        let mut accessors = Vec::with_capacity(obj.properties.len());
        for prop in &obj.properties {
            let converter = self.resolve(&prop.shape, session)?;
            let has_ctor_param = ctor_params.contains(&prop.name.as_ref());
            let can_read = prop.can_set || has_ctor_param;
            let accessor = PropertyAccessor {
                name: prop.name.clone(),
                prefer_async: prop.prefer_async || converter.prefer_async(),
                accepts_nil: matches!(
                    prop.shape.kind,
                    ShapeKind::Nullable(_) | ShapeKind::Primitive(PrimitiveShape::Raw)
                ),
                converter,
                can_write: prop.can_get,
                can_read,
                suppress_if_no_ctor_param: !prop.can_set && !has_ctor_param,
                should_serialize: prop.should_serialize.clone(),
            };
            accessors.push((prop.key, accessor));
        }

        let inner: Arc<dyn Converter> = if obj.uses_integer_keys() {
            // sparse slot table; holes stay nil on the wire
            let mut keyed = Vec::with_capacity(accessors.len());
            for (declared_at, (key, accessor)) in accessors.into_iter().enumerate() {
                if accessor.is_dead() {
                    continue;
                }
                let key = key.map_or(declared_at, |k| k as usize);
                keyed.push((key, accessor));
            }
            let len = keyed.iter().map(|(k, _)| k + 1).max().unwrap_or(0);
            let mut slots: Vec<Option<PropertyAccessor>> = Vec::new();
            slots.resize_with(len, || None);
            for (key, accessor) in keyed {
                if slots[key].is_some() {
                    return Err(PackError::InvalidShape {
                        type_name: shape.name.to_string(),
                        detail: format!("two properties share the integer key {key}"),
                    });
                }
                slots[key] = Some(accessor);
            }
            Arc::new(ArrayObjectConverter::new(
                shape.name.clone(),
                slots,
                plan,
                obj.before_serialize.clone(),
                obj.after_deserialize.clone(),
            ))
        } else {
            let live: Vec<PropertyAccessor> = accessors
                .into_iter()
                .map(|(_, accessor)| accessor)
                .filter(|accessor| !accessor.is_dead())
                .collect();
            Arc::new(MapObjectConverter::new(
                shape.name.clone(),
                live,
                plan,
                obj.before_serialize.clone(),
                obj.after_deserialize.clone(),
            ))
        };

        // a runtime-registered mapping wholly replaces the declared one
        let mapping = self
            .overrides
            .get(&shape.name)
            .map(|entry| entry.value().clone())
            .or_else(|| obj.sub_types.clone());
        match mapping {
            Some(mapping) if !mapping.is_empty() => {
                let mut entries = Vec::with_capacity(mapping.entries().len());
                for (alias, sub_shape) in mapping.entries() {
                    let converter = self.resolve(sub_shape, session)?;
                    entries.push((alias.clone(), sub_shape.name.clone(), converter));
                }
                Ok(Arc::new(SubTypeEnvelopeConverter::new(
                    shape.name.clone(),
                    inner,
                    entries,
                )?))
            }
            _ => Ok(inner),
        }
    }
}
