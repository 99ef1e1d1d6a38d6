// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Converters for the leaf types and the static primitive registry.

use super::Converter;
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult};
use crate::raw::RawBytes;
use crate::shape::PrimitiveShape;
use crate::value::Value;
use crate::wire::{Reader, Writer};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// One converter per primitive wire mapping.
pub(crate) struct PrimitiveConverter {
    prim: PrimitiveShape,
}

impl PrimitiveConverter {
    fn uint_field(&self, value: &Value, max: u64) -> PackResult<u64> {
        let v = value
            .as_uint()
            .ok_or_else(|| PackError::mismatch(self.prim.name(), value.kind_name()))?;
        if v > max {
            return Err(PackError::mismatch(self.prim.name(), v));
        }
        Ok(v)
    }

    fn int_field(&self, value: &Value, min: i64, max: i64) -> PackResult<i64> {
        let v = value
            .as_int()
            .ok_or_else(|| PackError::mismatch(self.prim.name(), value.kind_name()))?;
        if v < min || v > max {
            return Err(PackError::mismatch(self.prim.name(), v));
        }
        Ok(v)
    }
}

impl Converter for PrimitiveConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        _ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        match self.prim {
            PrimitiveShape::Bool => {
                let v = value
                    .as_bool()
                    .ok_or_else(|| PackError::mismatch("bool", value.kind_name()))?;
                writer.write_bool(v);
            }
            PrimitiveShape::U8 => writer.write_uint(self.uint_field(value, u64::from(u8::MAX))?),
            PrimitiveShape::U16 => writer.write_uint(self.uint_field(value, u64::from(u16::MAX))?),
            PrimitiveShape::U32 => writer.write_uint(self.uint_field(value, u64::from(u32::MAX))?),
            PrimitiveShape::U64 => writer.write_uint(self.uint_field(value, u64::MAX)?),
            PrimitiveShape::I8 => {
                writer.write_int(self.int_field(value, i64::from(i8::MIN), i64::from(i8::MAX))?);
            }
            PrimitiveShape::I16 => {
                writer.write_int(self.int_field(value, i64::from(i16::MIN), i64::from(i16::MAX))?);
            }
            PrimitiveShape::I32 => {
                writer.write_int(self.int_field(value, i64::from(i32::MIN), i64::from(i32::MAX))?);
            }
            PrimitiveShape::I64 => writer.write_int(self.int_field(value, i64::MIN, i64::MAX)?),
            PrimitiveShape::F32 => {
                let v = value
                    .as_f32()
                    .ok_or_else(|| PackError::mismatch("f32", value.kind_name()))?;
                writer.write_f32(v);
            }
            PrimitiveShape::F64 => {
                let v = value
                    .as_f64()
                    .ok_or_else(|| PackError::mismatch("f64", value.kind_name()))?;
                writer.write_f64(v);
            }
            PrimitiveShape::Str => {
                let v = value
                    .as_str()
                    .ok_or_else(|| PackError::mismatch("str", value.kind_name()))?;
                writer.write_str(v);
            }
            PrimitiveShape::Bin => {
                let v = value
                    .as_bin()
                    .ok_or_else(|| PackError::mismatch("bin", value.kind_name()))?;
                writer.write_bin(v);
            }
            PrimitiveShape::Raw => {
                debug_assert!(false, "raw uses RawConverter");
                return Err(PackError::mismatch("raw", value.kind_name()));
            }
        }
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, _ctx: &mut SerializationContext) -> PackResult<Value> {
        Ok(match self.prim {
            PrimitiveShape::Bool => Value::Bool(reader.read_bool()?),
            PrimitiveShape::U8 => Value::UInt(u64::from(reader.read_u8()?)),
            PrimitiveShape::U16 => Value::UInt(u64::from(reader.read_u16()?)),
            PrimitiveShape::U32 => Value::UInt(u64::from(reader.read_u32()?)),
            PrimitiveShape::U64 => Value::UInt(reader.read_u64()?),
            PrimitiveShape::I8 => Value::Int(i64::from(reader.read_i8()?)),
            PrimitiveShape::I16 => Value::Int(i64::from(reader.read_i16()?)),
            PrimitiveShape::I32 => Value::Int(i64::from(reader.read_i32()?)),
            PrimitiveShape::I64 => Value::Int(reader.read_i64()?),
            PrimitiveShape::F32 => Value::F32(reader.read_f32()?),
            PrimitiveShape::F64 => Value::F64(reader.read_f64()?),
            PrimitiveShape::Str => Value::Str(reader.read_str()?),
            PrimitiveShape::Bin => Value::Bin(reader.read_bin()?),
            PrimitiveShape::Raw => {
                debug_assert!(false, "raw uses RawConverter");
                return Err(PackError::mismatch("raw", "primitive read"));
            }
        })
    }
}

/// Pass-through converter for the opaque carrier.
///
/// Read records the byte range of exactly one value; when the reader is
/// backed by a reference-counted buffer the carrier shares it, otherwise it
/// copies and is born owned.
pub(crate) struct RawConverter;

impl Converter for RawConverter {
    fn write(
        &self,
        value: &Value,
        writer: &mut Writer,
        _ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        let raw = value
            .as_raw()
            .ok_or_else(|| PackError::mismatch("raw", value.kind_name()))?;
        writer.write_raw_span(raw.bytes());
        Ok(())
    }

    fn read(&self, reader: &mut Reader<'_>, ctx: &mut SerializationContext) -> PackResult<Value> {
        let start = reader.position();
        reader.skip(ctx)?;
        let end = reader.position();
        let raw = match reader.shared_backing() {
            Some(buf) => RawBytes::shared(buf.clone(), start..end),
            None => RawBytes::from_vec(reader.input_slice(start, end).to_vec()),
        };
        Ok(Value::Raw(raw))
    }

    fn prefer_async(&self) -> bool {
        true
    }
}

/// The static registry consulted after the instance cache misses.
pub(crate) fn registry() -> &'static HashMap<&'static str, Arc<dyn Converter>> {
    static REGISTRY: OnceLock<HashMap<&'static str, Arc<dyn Converter>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let prims = [
            PrimitiveShape::Bool,
            PrimitiveShape::U8,
            PrimitiveShape::U16,
            PrimitiveShape::U32,
            PrimitiveShape::U64,
            PrimitiveShape::I8,
            PrimitiveShape::I16,
            PrimitiveShape::I32,
            PrimitiveShape::I64,
            PrimitiveShape::F32,
            PrimitiveShape::F64,
            PrimitiveShape::Str,
            PrimitiveShape::Bin,
        ];
        let mut map: HashMap<&'static str, Arc<dyn Converter>> = HashMap::new();
        for prim in prims {
            map.insert(prim.name(), Arc::new(PrimitiveConverter { prim }));
        }
        map.insert(PrimitiveShape::Raw.name(), Arc::new(RawConverter));
        map
    })
}

/// The registry converter for `prim`.
pub(crate) fn primitive_converter(prim: PrimitiveShape) -> Arc<dyn Converter> {
    registry()
        .get(prim.name())
        .cloned()
        .unwrap_or_else(|| Arc::new(PrimitiveConverter { prim }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SerializationContext {
        SerializationContext::new(64)
    }

    fn roundtrip(prim: PrimitiveShape, value: Value) -> Value {
        let conv = primitive_converter(prim);
        let mut w = Writer::new();
        conv.write(&value, &mut w, &mut ctx()).expect("write");
        let bytes = w.take();
        let mut r = Reader::new(&bytes);
        conv.read(&mut r, &mut ctx()).expect("read")
    }

    #[test]
    fn test_primitive_roundtrips() {
        assert_eq!(
            roundtrip(PrimitiveShape::Bool, Value::Bool(true)),
            Value::Bool(true)
        );
        assert_eq!(
            roundtrip(PrimitiveShape::U32, Value::UInt(70_000)),
            Value::UInt(70_000)
        );
        assert_eq!(
            roundtrip(PrimitiveShape::I16, Value::Int(-300)),
            Value::Int(-300)
        );
        assert_eq!(
            roundtrip(PrimitiveShape::Str, Value::Str("héllo".into())),
            Value::Str("héllo".into())
        );
        assert_eq!(
            roundtrip(PrimitiveShape::Bin, Value::Bin(vec![0, 1, 2])),
            Value::Bin(vec![0, 1, 2])
        );
    }

    #[test]
    fn test_i32_encodes_42_as_one_byte() {
        let conv = primitive_converter(PrimitiveShape::I32);
        let mut w = Writer::new();
        conv.write(&Value::Int(42), &mut w, &mut ctx())
            .expect("write");
        assert_eq!(w.bytes(), &[0x2a]);
        let mut r = Reader::new(&[0x2a]);
        assert_eq!(
            conv.read(&mut r, &mut ctx()).expect("read"),
            Value::Int(42)
        );
    }

    #[test]
    fn test_range_checked_write() {
        let conv = primitive_converter(PrimitiveShape::U8);
        let mut w = Writer::new();
        assert!(matches!(
            conv.write(&Value::UInt(300), &mut w, &mut ctx()),
            Err(PackError::TypeMismatch { expected: "u8", .. })
        ));
    }

    #[test]
    fn test_raw_shares_backing_buffer() {
        let bytes: Arc<[u8]> = Arc::from(&[0x92u8, 0x01, 0x02, 0x2a][..]);
        let mut r = Reader::from_shared(&bytes);
        let value = RawConverter.read(&mut r, &mut ctx()).expect("read raw");
        let raw = value.as_raw().expect("raw value");
        assert!(!raw.is_owned());
        assert_eq!(raw.bytes(), &[0x92, 0x01, 0x02]);

        let mut w = Writer::new();
        RawConverter
            .write(&value, &mut w, &mut ctx())
            .expect("write raw");
        assert_eq!(w.bytes(), &[0x92, 0x01, 0x02]);
    }

    #[test]
    fn test_raw_copies_without_backing() {
        let bytes = [0xa1u8, b'x'];
        let mut r = Reader::new(&bytes);
        let value = RawConverter.read(&mut r, &mut ctx()).expect("read raw");
        let raw = value.as_raw().expect("raw value");
        assert!(raw.is_owned());
        assert_eq!(raw.bytes(), &bytes);
    }
}
