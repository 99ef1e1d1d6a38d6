// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Polymorphic envelope: `[alias | nil, payload]`.
//!
//! The alias in slot 0 identifies the runtime subtype; nil means the value
//! is exactly the declared base type. Both tables are immutable once the
//! converter is built.

use super::Converter;
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult, WireErrorKind};
use crate::shape::Alias;
use crate::value::Value;
use crate::wire::{Reader, WireType, Writer};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct SubTypeEnvelopeConverter {
    base_name: Arc<str>,
    base: Arc<dyn Converter>,
    /// Alias to subtype converter, for decode dispatch.
    deserializers: HashMap<Alias, Arc<dyn Converter>>,
    /// Runtime type name to alias plus converter, for encode dispatch.
    serializers: HashMap<Arc<str>, (Alias, Arc<dyn Converter>)>,
}

impl SubTypeEnvelopeConverter {
    /// Build the dispatch tables, rejecting duplicate aliases or subtypes
    /// so the two tables stay bijective.
    pub fn new(
        base_name: Arc<str>,
        base: Arc<dyn Converter>,
        entries: Vec<(Alias, Arc<str>, Arc<dyn Converter>)>,
    ) -> PackResult<Self> {
        let mut deserializers = HashMap::with_capacity(entries.len());
        let mut serializers = HashMap::with_capacity(entries.len());
        for (alias, type_name, converter) in entries {
            if deserializers
                .insert(alias.clone(), converter.clone())
                .is_some()
            {
                return Err(PackError::InvalidSubTypeMapping {
                    base: base_name.to_string(),
                    detail: format!("alias {alias} registered twice"),
                });
            }
            if serializers
                .insert(type_name.clone(), (alias, converter))
                .is_some()
            {
                return Err(PackError::InvalidSubTypeMapping {
                    base: base_name.to_string(),
                    detail: format!("subtype `{type_name}` registered twice"),
                });
            }
        }
        Ok(Self {
            base_name,
            base,
            deserializers,
            serializers,
        })
    }
}

impl Converter for SubTypeEnvelopeConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| PackError::mismatch("object", value.kind_name()))?;
        ctx.depth_step()?;
        let runtime = obj.type_name();
        if runtime == self.base_name.as_ref() {
            writer.write_array_header(2);
            writer.write_nil();
            self.base.write(value, writer, ctx)?;
        } else if let Some((alias, converter)) = self.serializers.get(runtime) {
            writer.write_array_header(2);
            match alias {
                Alias::Int(v) => writer.write_uint(u64::from(*v)),
                Alias::Str(s) => writer.write_str(s),
            }
            converter.write(value, writer, ctx)?;
        } else {
            return Err(PackError::UnknownSubType {
                base: self.base_name.to_string(),
                runtime: runtime.to_string(),
            });
        }
        ctx.depth_unstep();
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        ctx.depth_step()?;
        let n = reader.read_array_header()?;
        if n != 2 {
            return Err(PackError::MalformedPolymorphicEnvelope(n));
        }
        let value = if reader.try_read_nil() {
            self.base.read(reader, ctx)?
        } else {
            let alias = match reader.peek_type()? {
                WireType::Int => Alias::Int(reader.read_u32()?),
                WireType::Str => Alias::Str(Arc::from(reader.read_str()?)),
                _ => {
                    return Err(PackError::wire(
                        WireErrorKind::HeaderMismatch {
                            expected: "subtype alias",
                            found: reader.peek_byte()?,
                        },
                        reader.position(),
                    ));
                }
            };
            let converter = self
                .deserializers
                .get(&alias)
                .ok_or(PackError::UnknownAlias(alias))?;
            converter.read(reader, ctx)?
        };
        ctx.depth_unstep();
        Ok(value)
    }
}
