// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Insert-once converter cache.
//!
//! One cache per serializer, keyed by type name. Publication uses
//! first-writer-wins semantics: when two threads synthesize the same type
//! concurrently, both finish their trees but only the first inserted
//! converter is retained, and later callers receive the retained one. Both
//! trees are functionally equivalent, so callers never need to care which
//! instance they got.

use super::{BoxFuture, Converter};
use crate::context::SerializationContext;
use crate::error::PackResult;
use crate::value::Value;
use crate::wire::{AsyncReader, AsyncWriter, Reader, Writer};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

/// Type name to converter map with no-overwrite inserts.
#[derive(Default)]
pub struct ConverterCache {
    map: DashMap<Arc<str>, Arc<dyn Converter>>,
}

impl ConverterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Converter>> {
        self.map.get(type_name).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.map.contains_key(type_name)
    }

    /// Insert unless an entry already exists; returns the retained
    /// converter either way.
    pub fn try_insert(
        &self,
        type_name: Arc<str>,
        converter: Arc<dyn Converter>,
    ) -> Arc<dyn Converter> {
        match self.map.entry(type_name) {
            Entry::Occupied(entry) => {
                tracing::trace!(
                    type_name = %entry.key(),
                    "converter already cached, discarding the new instance"
                );
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                entry.insert(converter.clone());
                converter
            }
        }
    }
}

/// Indirection cell for cyclic shapes.
///
/// Synthesis seeds the in-progress set with a forwarding handle before it
/// walks an object's members, so recursive requests for the same type get
/// the handle; the cell is filled exactly once, when the real converter is
/// complete, and the handle delegates ever after. The fill happens before
/// the handle can reach any encode/decode call.
pub(crate) struct ForwardConverter {
    cell: OnceLock<Arc<dyn Converter>>,
}

impl ForwardConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn fill(&self, converter: Arc<dyn Converter>) {
        let _ = self.cell.set(converter);
    }

    #[allow(clippy::expect_used)] // filled before synthesis returns the handle
    fn target(&self) -> &Arc<dyn Converter> {
        self.cell
            .get()
            .expect("forwarding cell filled during synthesis")
    }
}

impl Converter for ForwardConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        self.target().write(value, writer, ctx)
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        self.target().read(reader, ctx)
    }

    fn prefer_async(&self) -> bool {
        self.cell
            .get()
            .map_or(false, |converter| converter.prefer_async())
    }

    fn write_async<'a, 'w>(
        &'a self,
        value: &'a Value,
        writer: &'a mut AsyncWriter<'w>,
        ctx: &'a mut SerializationContext,
    ) -> BoxFuture<'a, PackResult<()>>
    where
        'w: 'a,
    {
        self.target().write_async(value, writer, ctx)
    }

    fn read_async<'a, 'r>(
        &'a self,
        reader: &'a mut AsyncReader<'r>,
        ctx: &'a mut SerializationContext,
    ) -> BoxFuture<'a, PackResult<Value>>
    where
        'r: 'a,
    {
        self.target().read_async(reader, ctx)
    }
}
