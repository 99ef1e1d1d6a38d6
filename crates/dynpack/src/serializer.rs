// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Public serializer façade.
//!
//! A [`Serializer`] owns the converter cache and the synthesis visitor;
//! create one per configuration and share it freely. Each encode/decode
//! call gets its own [`SerializationContext`].

use crate::context::{CancelToken, SerializationContext};
use crate::convert::cache::ConverterCache;
use crate::convert::{Converter, Synthesizer};
use crate::error::{PackError, PackResult};
use crate::shape::{SubTypeMapping, TypeShape};
use crate::value::Value;
use crate::wire::{AsyncReader, AsyncWriter, Reader, Writer};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Wire layout for rectangular multi-dimensional arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiDimLayout {
    /// Arrays of arrays.
    #[default]
    Nested,
    /// One array: the dimensions, then the elements in row-major order.
    Flat,
}

/// Serializer configuration.
#[derive(Debug, Clone)]
pub struct SerializerOptions {
    /// Maximum nesting depth for encode and decode.
    pub max_depth: u32,
    pub multi_dim_layout: MultiDimLayout,
    /// Staged bytes that trigger a drain at the next structure boundary in
    /// async encoding.
    pub flush_watermark: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            multi_dim_layout: MultiDimLayout::default(),
            flush_watermark: crate::wire::DEFAULT_FLUSH_WATERMARK,
        }
    }
}

/// Builder for [`Serializer`].
#[derive(Debug, Default)]
pub struct SerializerBuilder {
    options: SerializerOptions,
}

impl SerializerBuilder {
    #[must_use]
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn multi_dim_layout(mut self, layout: MultiDimLayout) -> Self {
        self.options.multi_dim_layout = layout;
        self
    }

    #[must_use]
    pub fn flush_watermark(mut self, watermark: usize) -> Self {
        self.options.flush_watermark = watermark;
        self
    }

    #[must_use]
    pub fn build(self) -> Serializer {
        Serializer::with_options(self.options)
    }
}

/// The MessagePack serialization engine.
///
/// Converters are synthesized from shapes on first use and cached for the
/// serializer's lifetime; the cache and the synthesis pipeline are safe to
/// drive from many threads at once.
///
/// # Example
///
/// ```rust
/// use dynpack::{ObjectValue, PrimitiveShape, Serializer, ShapeBuilder, Value};
///
/// let shape = ShapeBuilder::new("SensorReading")
///     .field("sensor_id", PrimitiveShape::U32)
///     .field("temperature", PrimitiveShape::F64)
///     .build();
///
/// let serializer = Serializer::new();
/// let reading = Value::Object(
///     ObjectValue::new("SensorReading")
///         .with("sensor_id", Value::UInt(42))
///         .with("temperature", Value::F64(23.5)),
/// );
///
/// let bytes = serializer.to_bytes(&shape, &reading)?;
/// assert_eq!(serializer.from_bytes(&shape, &bytes)?, reading);
/// # Ok::<(), dynpack::PackError>(())
/// ```
pub struct Serializer {
    options: SerializerOptions,
    cache: Arc<ConverterCache>,
    overrides: Arc<DashMap<Arc<str>, SubTypeMapping>>,
    shapes: Arc<DashMap<Arc<str>, Arc<TypeShape>>>,
    synthesizer: Synthesizer,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(SerializerOptions::default())
    }

    #[must_use]
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::default()
    }

    #[must_use]
    pub fn with_options(options: SerializerOptions) -> Self {
        let cache = Arc::new(ConverterCache::new());
        let overrides = Arc::new(DashMap::new());
        let shapes = Arc::new(DashMap::new());
        let synthesizer = Synthesizer::new(
            cache.clone(),
            overrides.clone(),
            shapes.clone(),
            options.multi_dim_layout,
        );
        Self {
            options,
            cache,
            overrides,
            shapes,
            synthesizer,
        }
    }

    /// Register a named shape so [`ShapeKind::Reference`] properties can
    /// resolve to it. Recursive types register themselves and reference
    /// their own name.
    ///
    /// [`ShapeKind::Reference`]: crate::shape::ShapeKind::Reference
    pub fn register_shape(&self, shape: Arc<TypeShape>) {
        self.shapes.insert(shape.name.clone(), shape);
    }

    /// The cached (or newly synthesized) converter for `shape`.
    pub fn converter(&self, shape: &Arc<TypeShape>) -> PackResult<Arc<dyn Converter>> {
        self.synthesizer.get_or_make(shape)
    }

    fn context(&self, cancel: Option<CancelToken>) -> SerializationContext {
        match cancel {
            Some(token) => SerializationContext::with_cancel(self.options.max_depth, token),
            None => SerializationContext::new(self.options.max_depth),
        }
    }

    /// Encode `value` into a fresh buffer.
    pub fn to_bytes(&self, shape: &Arc<TypeShape>, value: &Value) -> PackResult<Vec<u8>> {
        let converter = self.converter(shape)?;
        let mut writer = Writer::new();
        let mut ctx = self.context(None);
        converter.write(value, &mut writer, &mut ctx)?;
        Ok(writer.take())
    }

    /// Encode `value` into an existing writer.
    pub fn write_value(
        &self,
        shape: &Arc<TypeShape>,
        value: &Value,
        writer: &mut Writer,
    ) -> PackResult<()> {
        let converter = self.converter(shape)?;
        let mut ctx = self.context(None);
        converter.write(value, writer, &mut ctx)
    }

    /// Decode one value from `bytes`. Raw carriers in the result copy their
    /// bytes; use [`Serializer::from_shared`] to share them instead.
    pub fn from_bytes(&self, shape: &Arc<TypeShape>, bytes: &[u8]) -> PackResult<Value> {
        let converter = self.converter(shape)?;
        let mut reader = Reader::new(bytes);
        let mut ctx = self.context(None);
        converter.read(&mut reader, &mut ctx)
    }

    /// Decode one value from a reference-counted buffer; raw carriers in
    /// the result borrow it zero-copy.
    pub fn from_shared(&self, shape: &Arc<TypeShape>, bytes: &Arc<[u8]>) -> PackResult<Value> {
        let converter = self.converter(shape)?;
        let mut reader = Reader::from_shared(bytes);
        let mut ctx = self.context(None);
        converter.read(&mut reader, &mut ctx)
    }

    /// Encode `value` into an async sink, draining at structure boundaries.
    pub async fn write_async<W>(
        &self,
        shape: &Arc<TypeShape>,
        value: &Value,
        sink: &mut W,
    ) -> PackResult<()>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.write_async_inner(shape, value, sink, None).await
    }

    /// [`Serializer::write_async`] with a cancellation token checked at
    /// every suspension point.
    pub async fn write_async_with_cancel<W>(
        &self,
        shape: &Arc<TypeShape>,
        value: &Value,
        sink: &mut W,
        cancel: CancelToken,
    ) -> PackResult<()>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.write_async_inner(shape, value, sink, Some(cancel))
            .await
    }

    async fn write_async_inner<W>(
        &self,
        shape: &Arc<TypeShape>,
        value: &Value,
        sink: &mut W,
        cancel: Option<CancelToken>,
    ) -> PackResult<()>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let converter = self.converter(shape)?;
        let mut ctx = self.context(cancel);
        let mut writer = AsyncWriter::with_watermark(sink, self.options.flush_watermark);
        converter.write_async(value, &mut writer, &mut ctx).await?;
        writer.finish(&mut ctx).await
    }

    /// Decode one value from an async source.
    pub async fn read_async<R>(&self, shape: &Arc<TypeShape>, source: &mut R) -> PackResult<Value>
    where
        R: AsyncRead + Send + Unpin,
    {
        self.read_async_inner(shape, source, None).await
    }

    /// [`Serializer::read_async`] with a cancellation token checked at
    /// every suspension point.
    pub async fn read_async_with_cancel<R>(
        &self,
        shape: &Arc<TypeShape>,
        source: &mut R,
        cancel: CancelToken,
    ) -> PackResult<Value>
    where
        R: AsyncRead + Send + Unpin,
    {
        self.read_async_inner(shape, source, Some(cancel)).await
    }

    async fn read_async_inner<R>(
        &self,
        shape: &Arc<TypeShape>,
        source: &mut R,
        cancel: Option<CancelToken>,
    ) -> PackResult<Value>
    where
        R: AsyncRead + Send + Unpin,
    {
        let converter = self.converter(shape)?;
        let mut ctx = self.context(cancel);
        let mut reader = AsyncReader::new(source);
        converter.read_async(&mut reader, &mut ctx).await
    }

    /// Register a custom converter under a type name, ahead of synthesis.
    ///
    /// The instance cache wins over the primitive registry, so this also
    /// overrides a primitive. Fails once a converter for the name exists.
    pub fn register_converter(
        &self,
        type_name: impl Into<Arc<str>>,
        converter: Arc<dyn Converter>,
    ) -> PackResult<()> {
        let type_name = type_name.into();
        if self.cache.contains(&type_name) {
            return Err(PackError::AlreadySynthesized(type_name.to_string()));
        }
        tracing::debug!(type_name = %type_name, "registering user converter");
        self.cache.try_insert(type_name, converter);
        Ok(())
    }

    /// Register (or replace) the subtype mapping for a base type at
    /// runtime. The mapping wholly replaces any shape-declared table.
    ///
    /// Fails with [`PackError::AlreadySynthesized`] once the base type's
    /// converter exists; the cache is never invalidated.
    pub fn register_subtypes(
        &self,
        base: impl Into<Arc<str>>,
        mapping: SubTypeMapping,
    ) -> PackResult<()> {
        let base = base.into();
        if self.cache.contains(&base) {
            return Err(PackError::AlreadySynthesized(base.to_string()));
        }
        tracing::debug!(base = %base, subtypes = mapping.entries().len(), "registering subtypes");
        self.overrides.insert(base, mapping);
        Ok(())
    }

    #[must_use]
    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }
}
