// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object-as-array converter: properties on the wire positionally, indexed
//! by their user-assigned integer key.
//!
//! Encode chooses between a plain array (nil holes) and an integer-keyed
//! map, whichever is smaller for the include set; decode accepts either.

use super::accessor::{ConstructorPlan, ObjectAssembler, PropertyAccessor};
use super::{BoxFuture, Converter};
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult, WireErrorKind};
use crate::pool;
use crate::shape::{DeserializeHook, SerializeHook};
use crate::value::Value;
use crate::wire::constants::NIL;
use crate::wire::{AsyncReader, AsyncWriter, Reader, WireType, Writer, DEFAULT_READ_BUDGET};
use std::sync::Arc;

pub(crate) struct ArrayObjectConverter {
    type_name: Arc<str>,
    /// Slot table indexed by the declared integer key; `None` is a hole,
    /// always encoded as nil. Length is max key + 1.
    slots: Vec<Option<PropertyAccessor>>,
    /// Whether any property carries a predicate; without predicates the
    /// full declared-length array is always emitted.
    use_selection: bool,
    plan: ConstructorPlan,
    before_serialize: Option<SerializeHook>,
    after_deserialize: Option<DeserializeHook>,
}

/// The wire form chosen for one encode.
enum WireForm {
    EmptyArray,
    /// `{int key => value}` over the include list.
    Map,
    /// Array truncated to `len`, nil for holes and excluded slots.
    Array { len: usize },
}

impl ArrayObjectConverter {
    pub fn new(
        type_name: Arc<str>,
        slots: Vec<Option<PropertyAccessor>>,
        plan: ConstructorPlan,
        before_serialize: Option<SerializeHook>,
        after_deserialize: Option<DeserializeHook>,
    ) -> Self {
        let use_selection = slots
            .iter()
            .flatten()
            .any(|p| p.should_serialize.is_some());
        Self {
            type_name,
            slots,
            use_selection,
            plan,
            before_serialize,
            after_deserialize,
        }
    }

    /// Fill `include` and pick the cheaper wire form.
    fn select_form(&self, value: &Value, include: &mut Vec<usize>) -> WireForm {
        if !self.use_selection || self.slots.is_empty() {
            for (i, slot) in self.slots.iter().enumerate() {
                if slot.as_ref().is_some_and(|p| p.can_write) {
                    include.push(i);
                }
            }
            return WireForm::Array {
                len: self.slots.len(),
            };
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(p) = slot {
                if p.included(value) {
                    include.push(i);
                }
            }
        }
        if include.is_empty() {
            return WireForm::EmptyArray;
        }
        let k = include[include.len() - 1];
        let map_overhead = Writer::encoded_uint_len(k as u64) * include.len();
        let array_overhead = (k + 1) - include.len();
        if map_overhead < array_overhead {
            WireForm::Map
        } else {
            WireForm::Array { len: k + 1 }
        }
    }

    /// The accessor writing position `i`, or `None` when the position emits
    /// nil. `include` is the sorted include list.
    fn entry_at(&self, i: usize, include: &[usize]) -> Option<&PropertyAccessor> {
        if include.binary_search(&i).is_err() {
            return None;
        }
        self.slots.get(i)?.as_ref()
    }

    fn read_slot_sync(
        prop: &PropertyAccessor,
        reader: &mut Reader<'_>,
        ctx: &mut SerializationContext,
        assembler: &mut ObjectAssembler,
    ) -> PackResult<()> {
        // a nil in a slot whose type has no nil reading is a hole
        if !prop.accepts_nil && reader.try_read_nil() {
            return Ok(());
        }
        let v = prop.converter.read(reader, ctx)?;
        assembler.set(prop.name.clone(), v);
        Ok(())
    }
}

impl Converter for ArrayObjectConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| PackError::mismatch("object", value.kind_name()))?;
        if let Some(hook) = &self.before_serialize {
            hook(value);
        }
        ctx.depth_step()?;
        let mut include = pool::take_indexes();
        match self.select_form(value, &mut include) {
            WireForm::EmptyArray => writer.write_array_header(0),
            WireForm::Map => {
                writer.write_map_header(include.len() as u32);
                for &i in include.iter() {
                    if let Some(prop) = &self.slots[i] {
                        writer.write_uint(i as u64);
                        prop.write_field(obj, writer, ctx)?;
                    }
                }
            }
            WireForm::Array { len } => {
                writer.write_array_header(len as u32);
                for i in 0..len {
                    match self.entry_at(i, &include) {
                        Some(prop) => prop.write_field(obj, writer, ctx)?,
                        None => writer.write_nil(),
                    }
                }
            }
        }
        ctx.depth_unstep();
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        let mut assembler = ObjectAssembler::new(&self.plan, &self.type_name)?;
        ctx.depth_step()?;
        match reader.peek_type()? {
            WireType::Map => {
                let n = reader.read_map_header()?;
                for _ in 0..n {
                    let key = reader.read_uint()? as usize;
                    match self.slots.get(key).and_then(Option::as_ref) {
                        Some(prop) if prop.can_read => {
                            Self::read_slot_sync(prop, reader, ctx, &mut assembler)?;
                        }
                        _ => reader.skip(ctx)?,
                    }
                }
            }
            WireType::Array => {
                let n = reader.read_array_header()?;
                for i in 0..n as usize {
                    match self.slots.get(i).and_then(Option::as_ref) {
                        Some(prop) if prop.can_read => {
                            Self::read_slot_sync(prop, reader, ctx, &mut assembler)?;
                        }
                        _ => reader.skip(ctx)?,
                    }
                }
            }
            _ => {
                return Err(PackError::wire(
                    WireErrorKind::HeaderMismatch {
                        expected: "array or map",
                        found: reader.peek_byte()?,
                    },
                    reader.position(),
                ));
            }
        }
        ctx.depth_unstep();
        let mut value = Value::Object(assembler.finish());
        if let Some(hook) = &self.after_deserialize {
            hook(&mut value);
        }
        Ok(value)
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
        Box::pin(async move {
            let obj = value
                .as_object()
                .ok_or_else(|| PackError::mismatch("object", value.kind_name()))?;
            if let Some(hook) = &self.before_serialize {
                hook(value);
            }
            ctx.depth_step()?;
            let mut include = pool::take_indexes();
            match self.select_form(value, &mut include) {
                WireForm::EmptyArray => writer.staging().write_array_header(0),
                WireForm::Map => {
                    writer.staging().write_map_header(include.len() as u32);
                    let mut at = 0;
                    while at < include.len() {
                        while at < include.len() {
                            let i = include[at];
                            let Some(prop) = &self.slots[i] else {
                                at += 1;
                                continue;
                            };
                            if prop.prefer_async {
                                break;
                            }
                            if writer.is_time_to_flush() {
                                writer.flush_if_appropriate(ctx).await?;
                            }
                            writer.staging().write_uint(i as u64);
                            prop.write_field(obj, writer.staging(), ctx)?;
                            at += 1;
                        }
                        writer.flush_if_appropriate(ctx).await?;
                        while at < include.len() {
                            let i = include[at];
                            let Some(prop) = &self.slots[i] else {
                                at += 1;
                                continue;
                            };
                            if !prop.prefer_async {
                                break;
                            }
                            ctx.check_cancelled()?;
                            // the integer key stays synchronous
                            writer.staging().write_uint(i as u64);
                            let field = prop.field(obj);
                            prop.converter.write_async(field, writer, ctx).await?;
                            at += 1;
                        }
                    }
                }
                WireForm::Array { len } => {
                    writer.staging().write_array_header(len as u32);
                    let mut i = 0;
                    while i < len {
                        while i < len {
                            if self
                                .entry_at(i, &include)
                                .is_some_and(|p| p.prefer_async)
                            {
                                break;
                            }
                            if writer.is_time_to_flush() {
                                writer.flush_if_appropriate(ctx).await?;
                            }
                            match self.entry_at(i, &include) {
                                Some(prop) => {
                                    prop.write_field(obj, writer.staging(), ctx)?;
                                }
                                None => writer.staging().write_nil(),
                            }
                            i += 1;
                        }
                        writer.flush_if_appropriate(ctx).await?;
                        while i < len {
                            let Some(prop) = self.entry_at(i, &include) else {
                                break;
                            };
                            if !prop.prefer_async {
                                break;
                            }
                            ctx.check_cancelled()?;
                            let field = prop.field(obj);
                            prop.converter.write_async(field, writer, ctx).await?;
                            i += 1;
                        }
                    }
                }
            }
            ctx.depth_unstep();
            Ok(())
        })
    }

    fn read_async<'a, 'r>(
        &'a self,
        reader: &'a mut AsyncReader<'r>,
        ctx: &'a mut SerializationContext,
    ) -> BoxFuture<'a, PackResult<Value>>
    where
        'r: 'a,
    {
        Box::pin(async move {
            let mut assembler = ObjectAssembler::new(&self.plan, &self.type_name)?;
            ctx.depth_step()?;
            reader.fill_for_header(ctx).await?;
            let marker = reader.buffered()[0];
            match crate::wire::classify(marker) {
                Some(WireType::Array) => {
                    let n = {
                        let mut sync = Reader::new(reader.buffered());
                        let n = sync.read_array_header()?;
                        reader.consume(sync.position());
                        n as usize
                    };
                    self.read_array_entries_async(n, reader, ctx, &mut assembler)
                        .await?;
                }
                Some(WireType::Map) => {
                    let n = {
                        let mut sync = Reader::new(reader.buffered());
                        let n = sync.read_map_header()?;
                        reader.consume(sync.position());
                        n as usize
                    };
                    self.read_map_entries_async(n, reader, ctx, &mut assembler)
                        .await?;
                }
                _ => {
                    return Err(PackError::wire(
                        WireErrorKind::HeaderMismatch {
                            expected: "array or map",
                            found: marker,
                        },
                        0,
                    ));
                }
            }
            ctx.depth_unstep();
            let mut value = Value::Object(assembler.finish());
            if let Some(hook) = &self.after_deserialize {
                hook(&mut value);
            }
            Ok(value)
        })
    }
}

impl ArrayObjectConverter {
    async fn read_array_entries_async(
        &self,
        n: usize,
        reader: &mut AsyncReader<'_>,
        ctx: &mut SerializationContext,
        assembler: &mut ObjectAssembler,
    ) -> PackResult<()> {
        let mut i = 0;
        while i < n {
            let slot = self.slots.get(i).and_then(Option::as_ref);
            if let Some(prop) = slot {
                if prop.can_read && prop.prefer_async {
                    ctx.check_cancelled()?;
                    reader.fill_for_header(ctx).await?;
                    if !prop.accepts_nil && reader.buffered()[0] == NIL {
                        reader.consume(1);
                    } else {
                        let v = prop.converter.read_async(reader, ctx).await?;
                        assembler.set(prop.name.clone(), v);
                    }
                    i += 1;
                    continue;
                }
            }
            // batch the run of sync entries the buffer can cover
            let run_end = (i..n)
                .find(|&j| {
                    self.slots
                        .get(j)
                        .and_then(Option::as_ref)
                        .is_some_and(|p| p.can_read && p.prefer_async)
                })
                .unwrap_or(n);
            let avail = reader
                .read_next_structures(1, DEFAULT_READ_BUDGET, ctx)
                .await?;
            let take = avail.min(run_end - i);
            let mut used = 0;
            {
                let mut sync = Reader::new(reader.buffered());
                for _ in 0..take {
                    match self.slots.get(i).and_then(Option::as_ref) {
                        Some(prop) if prop.can_read => {
                            Self::read_slot_sync(prop, &mut sync, ctx, assembler)?;
                        }
                        _ => sync.skip(ctx)?,
                    }
                    used = sync.position();
                    i += 1;
                }
            }
            reader.consume(used);
        }
        Ok(())
    }

    async fn read_map_entries_async(
        &self,
        n: usize,
        reader: &mut AsyncReader<'_>,
        ctx: &mut SerializationContext,
        assembler: &mut ObjectAssembler,
    ) -> PackResult<()> {
        let mut remaining = n;
        while remaining > 0 {
            // an entry is two structures: integer key plus value
            let avail = reader
                .read_next_structures(2, DEFAULT_READ_BUDGET, ctx)
                .await?;
            let mut entries = (avail / 2).min(remaining);
            let mut pending: Option<&PropertyAccessor> = None;
            let mut used = 0;
            {
                let mut sync = Reader::new(reader.buffered());
                while entries > 0 {
                    let key = sync.read_uint()? as usize;
                    match self.slots.get(key).and_then(Option::as_ref) {
                        Some(prop) if prop.can_read && prop.prefer_async => {
                            // leave the value for the async reader
                            used = sync.position();
                            pending = Some(prop);
                            remaining -= 1;
                            entries = 0;
                        }
                        Some(prop) if prop.can_read => {
                            Self::read_slot_sync(prop, &mut sync, ctx, assembler)?;
                            used = sync.position();
                            remaining -= 1;
                            entries -= 1;
                        }
                        _ => {
                            sync.skip(ctx)?;
                            used = sync.position();
                            remaining -= 1;
                            entries -= 1;
                        }
                    }
                }
            }
            reader.consume(used);
            if let Some(prop) = pending {
                ctx.check_cancelled()?;
                reader.fill_for_header(ctx).await?;
                if !prop.accepts_nil && reader.buffered()[0] == NIL {
                    reader.consume(1);
                } else {
                    let v = prop.converter.read_async(reader, ctx).await?;
                    assembler.set(prop.name.clone(), v);
                }
            }
        }
        Ok(())
    }
}
