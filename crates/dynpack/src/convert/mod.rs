// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Converters: the per-type encode/decode procedures and the machinery
//! that synthesizes, caches, and composes them.

pub mod cache;

mod accessor;
mod collections;
mod object_array;
mod object_map;
mod primitives;
mod subtypes;
mod synthesis;

pub(crate) use collections::{
    DictionaryConverter, EnumConverter, MultiDimConverter, NullableConverter, SequenceConverter,
};
pub(crate) use object_array::ArrayObjectConverter;
pub(crate) use object_map::MapObjectConverter;
pub(crate) use primitives::primitive_converter;
pub(crate) use subtypes::SubTypeEnvelopeConverter;
pub use synthesis::Synthesizer;

use crate::context::SerializationContext;
use crate::error::PackResult;
use crate::value::Value;
use crate::wire::{AsyncReader, AsyncWriter, Reader, Writer, DEFAULT_READ_BUDGET};
use std::future::Future;
use std::pin::Pin;

/// Boxed future used by the async converter methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The encode/decode pair for one type.
///
/// A converter is immutable once synthesized and may be shared across
/// threads; all per-call state lives in the [`SerializationContext`].
/// `read` and `write` are inverses on every value the originating shape
/// admits.
///
/// The async methods default to staging through the sync path and flushing
/// at the value boundary; converters that can interleave member writes with
/// flushes (the object converters) override them.
pub trait Converter: Send + Sync {
    /// Encode `value` into `writer`.
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()>;

    /// Decode one value from `reader`.
    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value>;

    /// Whether this converter's values are worth routing through the async
    /// path on their own (large payloads).
    fn prefer_async(&self) -> bool {
        false
    }

    /// Encode `value` through the async framing adapter.
    fn write_async<'a, 'w>(
        &'a self,
        value: &'a Value,
        writer: &'a mut AsyncWriter<'w>,
        ctx: &'a mut SerializationContext,
    ) -> BoxFuture<'a, PackResult<()>>
    where
        'w: 'a,
    {
        Box::pin(async move {
            self.write(value, writer.staging(), ctx)?;
            writer.flush_if_appropriate(ctx).await
        })
    }

    /// Decode one value through the async framing adapter.
    fn read_async<'a, 'r>(
        &'a self,
        reader: &'a mut AsyncReader<'r>,
        ctx: &'a mut SerializationContext,
    ) -> BoxFuture<'a, PackResult<Value>>
    where
        'r: 'a,
    {
        Box::pin(async move {
            reader
                .read_next_structures(1, DEFAULT_READ_BUDGET, ctx)
                .await?;
            let (value, used) = {
                let mut sync = Reader::new(reader.buffered());
                let value = self.read(&mut sync, ctx)?;
                (value, sync.position())
            };
            reader.consume(used);
            Ok(value)
        })
    }
}
