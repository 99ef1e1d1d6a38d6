// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Converters for the composite wrappers: nullable, sequences,
//! multi-dimensional arrays, dictionaries, and enums.

use super::Converter;
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult};
use crate::serializer::MultiDimLayout;
use crate::value::Value;
use crate::wire::{Reader, WireType, Writer};
use std::sync::Arc;

/// Nil on the wire, or the inner value.
pub(crate) struct NullableConverter {
    inner: Arc<dyn Converter>,
}

impl NullableConverter {
    pub fn new(inner: Arc<dyn Converter>) -> Self {
        Self { inner }
    }
}

impl Converter for NullableConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        if value.is_nil() {
            writer.write_nil();
            Ok(())
        } else {
            self.inner.write(value, writer, ctx)
        }
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        if reader.try_read_nil() {
            Ok(Value::Nil)
        } else {
            self.inner.read(reader, ctx)
        }
    }
}

/// Homogeneous sequence.
pub(crate) struct SequenceConverter {
    element: Arc<dyn Converter>,
}

impl SequenceConverter {
    pub fn new(element: Arc<dyn Converter>) -> Self {
        Self { element }
    }
}

impl Converter for SequenceConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        let items = value
            .as_array()
            .ok_or_else(|| PackError::mismatch("array", value.kind_name()))?;
        ctx.depth_step()?;
        writer.write_array_header(items.len() as u32);
        for item in items {
            self.element.write(item, writer, ctx)?;
        }
        ctx.depth_unstep();
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        ctx.depth_step()?;
        let n = reader.read_array_header()?;
        // cap the reservation by the input left: the count is untrusted
        let mut items = Vec::with_capacity((n as usize).min(reader.remaining()));
        for _ in 0..n {
            items.push(self.element.read(reader, ctx)?);
        }
        ctx.depth_unstep();
        Ok(Value::Array(items))
    }
}

/// Rectangular multi-dimensional array.
///
/// `Nested` writes arrays of arrays; `Flat` writes one array holding the
/// dimensions followed by the elements in row-major order. Both decode back
/// to the nested in-memory representation.
pub(crate) struct MultiDimConverter {
    element: Arc<dyn Converter>,
    rank: usize,
    layout: MultiDimLayout,
}

impl MultiDimConverter {
    pub fn new(element: Arc<dyn Converter>, rank: usize, layout: MultiDimLayout) -> Self {
        Self {
            element,
            rank: rank.max(1),
            layout,
        }
    }

    fn write_nested(
        &self,
        value: &Value,
        level: usize,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        if level == self.rank {
            return self.element.write(value, writer, ctx);
        }
        let items = value
            .as_array()
            .ok_or_else(|| PackError::mismatch("array", value.kind_name()))?;
        ctx.depth_step()?;
        writer.write_array_header(items.len() as u32);
        for item in items {
            self.write_nested(item, level + 1, writer, ctx)?;
        }
        ctx.depth_unstep();
        Ok(())
    }

    fn read_nested(
        &self,
        level: usize,
        reader: &mut Reader<'_>,
        ctx: &mut SerializationContext,
    ) -> PackResult<Value> {
        if level == self.rank {
            return self.element.read(reader, ctx);
        }
        ctx.depth_step()?;
        let n = reader.read_array_header()?;
        // cap the reservation by the input left: the count is untrusted
        let mut items = Vec::with_capacity((n as usize).min(reader.remaining()));
        for _ in 0..n {
            items.push(self.read_nested(level + 1, reader, ctx)?);
        }
        ctx.depth_unstep();
        Ok(Value::Array(items))
    }

    /// Record dimensions and flatten, rejecting ragged input.
    fn collect_flat<'v>(
        &self,
        value: &'v Value,
        level: usize,
        dims: &mut Vec<usize>,
        out: &mut Vec<&'v Value>,
    ) -> PackResult<()> {
        if level == self.rank {
            out.push(value);
            return Ok(());
        }
        let items = value
            .as_array()
            .ok_or_else(|| PackError::mismatch("array", value.kind_name()))?;
        if dims.len() == level {
            dims.push(items.len());
        } else if dims[level] != items.len() {
            return Err(PackError::mismatch("rectangular array", items.len()));
        }
        for item in items {
            self.collect_flat(item, level + 1, dims, out)?;
        }
        Ok(())
    }

    fn build_nested(
        &self,
        dims: &[usize],
        level: usize,
        elements: &mut std::vec::IntoIter<Value>,
    ) -> Value {
        if level == self.rank {
            return elements.next().unwrap_or(Value::Nil);
        }
        let items = (0..dims[level])
            .map(|_| self.build_nested(dims, level + 1, elements))
            .collect();
        Value::Array(items)
    }
}

impl Converter for MultiDimConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        match self.layout {
            MultiDimLayout::Nested => self.write_nested(value, 0, writer, ctx),
            MultiDimLayout::Flat => {
                let mut dims = Vec::with_capacity(self.rank);
                let mut elements = Vec::new();
                self.collect_flat(value, 0, &mut dims, &mut elements)?;
                // Empty outer dimensions leave the tail unrecorded.
                dims.resize(self.rank, 0);
                ctx.depth_step()?;
                writer.write_array_header((self.rank + elements.len()) as u32);
                for dim in &dims {
                    writer.write_uint(*dim as u64);
                }
                for element in elements {
                    self.element.write(element, writer, ctx)?;
                }
                ctx.depth_unstep();
                Ok(())
            }
        }
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        match self.layout {
            MultiDimLayout::Nested => self.read_nested(0, reader, ctx),
            MultiDimLayout::Flat => {
                ctx.depth_step()?;
                let n = reader.read_array_header()? as usize;
                if n < self.rank {
                    return Err(PackError::mismatch("flat multi-dim array", n));
                }
                let mut dims = Vec::with_capacity(self.rank);
                for _ in 0..self.rank {
                    dims.push(reader.read_uint()? as usize);
                }
                let total = dims
                    .iter()
                    .try_fold(1usize, |acc, &d| acc.checked_mul(d))
                    .ok_or_else(|| PackError::mismatch("flat multi-dim array", n))?;
                if n != self.rank + total {
                    return Err(PackError::mismatch("flat multi-dim array", n));
                }
                // cap the reservation by the input left: the dims are untrusted
                let mut elements = Vec::with_capacity(total.min(reader.remaining()));
                for _ in 0..total {
                    elements.push(self.element.read(reader, ctx)?);
                }
                ctx.depth_unstep();
                let mut iter = elements.into_iter();
                Ok(self.build_nested(&dims, 0, &mut iter))
            }
        }
    }
}

/// Homogeneous dictionary.
pub(crate) struct DictionaryConverter {
    key: Arc<dyn Converter>,
    value: Arc<dyn Converter>,
}

impl DictionaryConverter {
    pub fn new(key: Arc<dyn Converter>, value: Arc<dyn Converter>) -> Self {
        Self { key, value }
    }
}

impl Converter for DictionaryConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        let entries = value
            .as_map()
            .ok_or_else(|| PackError::mismatch("map", value.kind_name()))?;
        ctx.depth_step()?;
        writer.write_map_header(entries.len() as u32);
        for (k, v) in entries {
            self.key.write(k, writer, ctx)?;
            self.value.write(v, writer, ctx)?;
        }
        ctx.depth_unstep();
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        ctx.depth_step()?;
        let n = reader.read_map_header()?;
        // cap the reservation by the input left: the count is untrusted
        let mut entries = Vec::with_capacity((n as usize).min(reader.remaining()));
        for _ in 0..n {
            let k = self.key.read(reader, ctx)?;
            let v = self.value.read(reader, ctx)?;
            entries.push((k, v));
        }
        ctx.depth_unstep();
        Ok(Value::Map(entries))
    }
}

/// Named integer constants, written as their underlying value.
///
/// Decode also accepts the member name as a string and maps it back; values
/// outside the member set pass through unchanged for forward compatibility.
pub(crate) struct EnumConverter {
    members: Vec<(String, i64)>,
}

impl EnumConverter {
    pub fn new(members: Vec<(String, i64)>) -> Self {
        Self { members }
    }
}

impl Converter for EnumConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        _ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        let v = value
            .as_int()
            .ok_or_else(|| PackError::mismatch("enum value", value.kind_name()))?;
        writer.write_int(v);
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, _ctx: &mut SerializationContext) -> PackResult<Value> {
        match reader.peek_type()? {
            WireType::Int => Ok(Value::Int(reader.read_int()?)),
            WireType::Str => {
                let name = reader.read_str()?;
                self.members
                    .iter()
                    .find(|(member, _)| *member == name)
                    .map(|(_, v)| Value::Int(*v))
                    .ok_or_else(|| PackError::mismatch("enum member name", name))
            }
            _ => Err(PackError::mismatch("enum value", "non-integer wire value")),
        }
    }
}
