// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dynpack - shape-driven MessagePack serialization
//!
//! A MessagePack engine for data whose types are described at runtime.
//! A [`TypeShape`] captures one type's properties, constructor policy,
//! collection nature, enum membership, and known subtypes; the engine
//! compiles the shape into a converter once, caches it per serializer, and
//! uses it for every subsequent value.
//!
//! ## Quick Start
//!
//! ```rust
//! use dynpack::{ObjectValue, PrimitiveShape, Serializer, ShapeBuilder, Value};
//!
//! let shape = ShapeBuilder::new("SensorReading")
//!     .field("sensor_id", PrimitiveShape::U32)
//!     .field("temperature", PrimitiveShape::F64)
//!     .string_field("location")
//!     .build();
//!
//! let serializer = Serializer::new();
//! let reading = Value::Object(
//!     ObjectValue::new("SensorReading")
//!         .with("sensor_id", Value::UInt(42))
//!         .with("temperature", Value::F64(23.5))
//!         .with("location", Value::Str("Building A".into())),
//! );
//!
//! let bytes = serializer.to_bytes(&shape, &reading)?;
//! let decoded = serializer.from_bytes(&shape, &bytes)?;
//! assert_eq!(decoded, reading);
//! # Ok::<(), dynpack::PackError>(())
//! ```
//!
//! ## Wire forms
//!
//! | Shape | Wire form |
//! |-------|-----------|
//! | object, named properties | map of `{name => value}`, string keys |
//! | object, integer-keyed properties | array of length max-key+1 with nil holes, or `{int => value}` map when smaller |
//! | known subtypes | two-element envelope `[alias or nil, payload]` |
//! | raw carrier | one value passed through verbatim |
//!
//! Decoders skip unknown map keys and out-of-range array entries, so older
//! readers stay compatible with newer producers. Unknown subtype aliases
//! are errors: dropping a value's identity silently is never safe.
//!
//! ## Async
//!
//! [`Serializer::write_async`] and [`Serializer::read_async`] run the same
//! converters over `tokio` IO. Encoding stages bytes and drains them at
//! structure boundaries once a watermark is crossed; decoding buffers whole
//! structures and hands them to the sync path in batches. Properties marked
//! `prefer_async` are awaited one at a time.
//!
//! ## Modules
//!
//! - [`shape`] - runtime type descriptions and the fluent builder
//! - [`value`] - the dynamic value tree
//! - [`convert`] - the converter contract and synthesis machinery
//! - [`wire`] - the MessagePack byte layer
//! - [`serializer`] - the public façade

pub mod context;
pub mod convert;
pub mod error;
pub mod raw;
pub mod serializer;
pub mod shape;
pub mod value;
pub mod wire;

mod pool;

pub use context::{CancelToken, SerializationContext};
pub use convert::{BoxFuture, Converter};
pub use error::{PackError, PackResult, WireErrorKind};
pub use raw::RawBytes;
pub use serializer::{MultiDimLayout, Serializer, SerializerBuilder, SerializerOptions};
pub use shape::{
    Alias, Constructor, DeserializeHook, EnumShape, ObjectShape, PrimitiveShape, PropertyShape,
    SerializeHook, ShapeBuilder, ShapeKind, ShouldSerialize, SubTypeMapping, TypeShape,
};
pub use value::{ObjectValue, Value};
pub use wire::{AsyncReader, AsyncWriter, Reader, WireType, Writer};
