// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object-as-map converter: properties on the wire as a `{name => value}`
//! map with string keys.
//!
//! Encode order is the shape's declaration order. Decode matches keys by
//! their raw UTF-8 bytes, without allocating, and skips unknown keys so
//! newer producers stay readable.

use super::accessor::{ConstructorPlan, ObjectAssembler, PropertyAccessor};
use super::{BoxFuture, Converter};
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult};
use crate::pool;
use crate::shape::{DeserializeHook, SerializeHook};
use crate::value::Value;
use crate::wire::{AsyncReader, AsyncWriter, Reader, Writer, DEFAULT_READ_BUDGET};
use std::collections::HashMap;
use std::sync::Arc;

/// One property on the encode side, its wire key pre-encoded for blitting.
struct SerializableProperty {
    accessor: PropertyAccessor,
    /// MessagePack string header plus UTF-8 name bytes.
    encoded_name: Box<[u8]>,
}

/// One property on the decode side.
struct DeserializableProperty {
    name: Arc<str>,
    converter: Arc<dyn Converter>,
    prefer_async: bool,
}

pub(crate) struct MapObjectConverter {
    type_name: Arc<str>,
    ser_props: Vec<SerializableProperty>,
    de_props: Vec<DeserializableProperty>,
    /// UTF-8 name bytes to `de_props` index; matched against raw key spans.
    de_index: HashMap<Box<[u8]>, usize>,
    plan: ConstructorPlan,
    before_serialize: Option<SerializeHook>,
    after_deserialize: Option<DeserializeHook>,
}

impl MapObjectConverter {
    pub fn new(
        type_name: Arc<str>,
        accessors: Vec<PropertyAccessor>,
        plan: ConstructorPlan,
        before_serialize: Option<SerializeHook>,
        after_deserialize: Option<DeserializeHook>,
    ) -> Self {
        let mut ser_props = Vec::new();
        let mut de_props = Vec::new();
        let mut de_index = HashMap::new();
        for accessor in accessors {
            debug_assert!(!accessor.is_dead());
            if !accessor.suppress_if_no_ctor_param {
                let index = de_props.len();
                de_index.insert(
                    accessor.name.as_bytes().to_vec().into_boxed_slice(),
                    index,
                );
                de_props.push(DeserializableProperty {
                    name: accessor.name.clone(),
                    converter: accessor.converter.clone(),
                    prefer_async: accessor.prefer_async,
                });
            }
            if accessor.can_write {
                let mut name = Writer::new();
                name.write_str(&accessor.name);
                ser_props.push(SerializableProperty {
                    encoded_name: name.take().into_boxed_slice(),
                    accessor,
                });
            }
        }
        Self {
            type_name,
            ser_props,
            de_props,
            de_index,
            plan,
            before_serialize,
            after_deserialize,
        }
    }
}

impl Converter for MapObjectConverter {
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
        for (i, prop) in self.ser_props.iter().enumerate() {
            if prop.accessor.included(value) {
                include.push(i);
            }
        }
        writer.write_map_header(include.len() as u32);
        for &i in include.iter() {
            let prop = &self.ser_props[i];
            writer.write_raw_span(&prop.encoded_name);
            prop.accessor.write_field(obj, writer, ctx)?;
        }
        ctx.depth_unstep();
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        let mut assembler = ObjectAssembler::new(&self.plan, &self.type_name)?;
        ctx.depth_step()?;
        let n = reader.read_map_header()?;
        for _ in 0..n {
            let key = reader.read_str_span()?;
            match self.de_index.get(key) {
                Some(&i) => {
                    let prop = &self.de_props[i];
                    let v = prop.converter.read(reader, ctx)?;
                    assembler.set(prop.name.clone(), v);
                }
                None => reader.skip(ctx)?,
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
            for (i, prop) in self.ser_props.iter().enumerate() {
                if prop.accessor.included(value) {
                    include.push(i);
                }
            }
            writer.staging().write_map_header(include.len() as u32);
            let mut at = 0;
            while at < include.len() {
                // run of sync properties, flushing only between them
                while at < include.len() {
                    let prop = &self.ser_props[include[at]];
                    if prop.accessor.prefer_async {
                        break;
                    }
                    if writer.is_time_to_flush() {
                        writer.flush_if_appropriate(ctx).await?;
                    }
                    writer.staging().write_raw_span(&prop.encoded_name);
                    prop.accessor.write_field(obj, writer.staging(), ctx)?;
                    at += 1;
                }
                writer.flush_if_appropriate(ctx).await?;
                // async properties, one in flight at a time
                while at < include.len() {
                    let prop = &self.ser_props[include[at]];
                    if !prop.accessor.prefer_async {
                        break;
                    }
                    ctx.check_cancelled()?;
                    writer.staging().write_raw_span(&prop.encoded_name);
                    let field = prop.accessor.field(obj);
                    prop.accessor.converter.write_async(field, writer, ctx).await?;
                    at += 1;
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
            let n = {
                let mut sync = Reader::new(reader.buffered());
                let n = sync.read_map_header()?;
                reader.consume(sync.position());
                n
            };
            let mut remaining = n as usize;
            while remaining > 0 {
                // an entry is two structures: key plus value
                let avail = reader
                    .read_next_structures(2, DEFAULT_READ_BUDGET, ctx)
                    .await?;
                let mut entries = (avail / 2).min(remaining);
                let mut pending: Option<usize> = None;
                let mut used = 0;
                {
                    let mut sync = Reader::new(reader.buffered());
                    while entries > 0 {
                        let key = sync.read_str_span()?;
                        match self.de_index.get(key) {
                            Some(&i) if self.de_props[i].prefer_async => {
                                // surrender the sync reader after the key
                                used = sync.position();
                                pending = Some(i);
                                remaining -= 1;
                                entries = 0;
                            }
                            Some(&i) => {
                                let prop = &self.de_props[i];
                                let v = prop.converter.read(&mut sync, ctx)?;
                                assembler.set(prop.name.clone(), v);
                                used = sync.position();
                                remaining -= 1;
                                entries -= 1;
                            }
                            None => {
                                sync.skip(ctx)?;
                                used = sync.position();
                                remaining -= 1;
                                entries -= 1;
                            }
                        }
                    }
                }
                reader.consume(used);
                if let Some(i) = pending {
                    ctx.check_cancelled()?;
                    let prop = &self.de_props[i];
                    let v = prop.converter.read_async(reader, ctx).await?;
                    assembler.set(prop.name.clone(), v);
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
