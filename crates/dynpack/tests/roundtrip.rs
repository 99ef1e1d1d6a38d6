// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Roundtrip coverage for primitives, composites, raw carriers, and the
//! depth budget.

#![allow(clippy::float_cmp)]
#![allow(clippy::missing_panics_doc)]

use dynpack::{
    MultiDimLayout, PackError, PrimitiveShape, Serializer, TypeShape, Value,
};
use std::sync::Arc;

fn roundtrip(serializer: &Serializer, shape: &Arc<TypeShape>, value: &Value) -> Value {
    let bytes = serializer.to_bytes(shape, value).expect("encode");
    serializer.from_bytes(shape, &bytes).expect("decode")
}

#[test]
fn primitive_roundtrips() {
    let serializer = Serializer::new();
    let cases = [
        (PrimitiveShape::Bool, Value::Bool(false)),
        (PrimitiveShape::U8, Value::UInt(200)),
        (PrimitiveShape::U64, Value::UInt(u64::MAX)),
        (PrimitiveShape::I8, Value::Int(-100)),
        (PrimitiveShape::I64, Value::Int(i64::MIN)),
        (PrimitiveShape::F32, Value::F32(1.25)),
        (PrimitiveShape::F64, Value::F64(-0.5)),
        (PrimitiveShape::Str, Value::Str("héllo wörld".into())),
        (PrimitiveShape::Bin, Value::Bin(vec![0u8; 300])),
    ];
    for (prim, value) in cases {
        let shape = TypeShape::primitive(prim);
        assert_eq!(roundtrip(&serializer, &shape, &value), value, "{prim:?}");
    }
}

#[test]
fn i32_wire_form_is_minimal() {
    let serializer = Serializer::new();
    let shape = TypeShape::primitive(PrimitiveShape::I32);
    let bytes = serializer.to_bytes(&shape, &Value::Int(42)).expect("encode");
    assert_eq!(bytes, vec![0x2a]);
    assert_eq!(
        serializer.from_bytes(&shape, &[0x2a]).expect("decode"),
        Value::Int(42)
    );
}

#[test]
fn sequence_and_nullable_roundtrip() {
    let serializer = Serializer::new();
    let shape = TypeShape::array(TypeShape::nullable(TypeShape::primitive(PrimitiveShape::I64)));
    let value = Value::Array(vec![Value::Int(1), Value::Nil, Value::Int(-3)]);
    assert_eq!(roundtrip(&serializer, &shape, &value), value);
}

#[test]
fn dictionary_roundtrip() {
    let serializer = Serializer::new();
    let shape = TypeShape::dictionary(
        TypeShape::primitive(PrimitiveShape::Str),
        TypeShape::primitive(PrimitiveShape::U32),
    );
    let value = Value::Map(vec![
        (Value::Str("one".into()), Value::UInt(1)),
        (Value::Str("two".into()), Value::UInt(2)),
    ]);
    assert_eq!(roundtrip(&serializer, &shape, &value), value);
}

#[test]
fn enum_roundtrip_keeps_unknown_values() {
    let serializer = Serializer::new();
    let shape = TypeShape::enumeration(
        "Status",
        vec![("Idle".into(), 0), ("Busy".into(), 2)],
    );
    assert_eq!(
        roundtrip(&serializer, &shape, &Value::Int(2)),
        Value::Int(2)
    );
    // a value outside the member set still travels
    assert_eq!(
        roundtrip(&serializer, &shape, &Value::Int(9)),
        Value::Int(9)
    );
}

#[test]
fn multi_dim_nested_and_flat_agree_in_memory() {
    let matrix = Value::Array(vec![
        Value::Array(vec![Value::Int(1), Value::Int(2)]),
        Value::Array(vec![Value::Int(3), Value::Int(4)]),
    ]);
    let shape = TypeShape::multi_dim_array(TypeShape::primitive(PrimitiveShape::I64), 2);

    let nested = Serializer::builder()
        .multi_dim_layout(MultiDimLayout::Nested)
        .build();
    let flat = Serializer::builder()
        .multi_dim_layout(MultiDimLayout::Flat)
        .build();

    let nested_bytes = nested.to_bytes(&shape, &matrix).expect("nested encode");
    let flat_bytes = flat.to_bytes(&shape, &matrix).expect("flat encode");
    assert_ne!(nested_bytes, flat_bytes);

    assert_eq!(
        nested.from_bytes(&shape, &nested_bytes).expect("nested decode"),
        matrix
    );
    assert_eq!(
        flat.from_bytes(&shape, &flat_bytes).expect("flat decode"),
        matrix
    );
}

#[test]
fn depth_budget_is_enforced() {
    let shape = TypeShape::array(TypeShape::array(TypeShape::array(TypeShape::primitive(
        PrimitiveShape::I64,
    ))));
    let value = Value::Array(vec![Value::Array(vec![Value::Array(vec![Value::Int(1)])])]);

    let deep_enough = Serializer::builder().max_depth(3).build();
    assert!(deep_enough.to_bytes(&shape, &value).is_ok());

    let too_shallow = Serializer::builder().max_depth(2).build();
    assert!(matches!(
        too_shallow.to_bytes(&shape, &value),
        Err(PackError::DepthExceeded)
    ));

    let bytes = deep_enough.to_bytes(&shape, &value).expect("encode");
    assert!(matches!(
        too_shallow.from_bytes(&shape, &bytes),
        Err(PackError::DepthExceeded)
    ));
}

#[test]
fn huge_claimed_counts_fail_instead_of_allocating() {
    let serializer = Serializer::new();

    // ARRAY32 header claiming ~4.29B elements, then nothing
    let bytes = [0xdd, 0xff, 0xff, 0xff, 0xff];
    let shape = TypeShape::array(TypeShape::primitive(PrimitiveShape::U8));
    assert!(matches!(
        serializer.from_bytes(&shape, &bytes),
        Err(PackError::WireFormat { .. })
    ));

    // same for a MAP32 header on a dictionary shape
    let bytes = [0xdf, 0xff, 0xff, 0xff, 0xff];
    let shape = TypeShape::dictionary(
        TypeShape::primitive(PrimitiveShape::Str),
        TypeShape::primitive(PrimitiveShape::U8),
    );
    assert!(matches!(
        serializer.from_bytes(&shape, &bytes),
        Err(PackError::WireFormat { .. })
    ));

    // flat multi-dim with huge claimed dimensions
    let shape = TypeShape::multi_dim_array(TypeShape::primitive(PrimitiveShape::U8), 2);
    let flat = Serializer::builder()
        .multi_dim_layout(MultiDimLayout::Flat)
        .build();
    let bytes = [0x93, 0xce, 0xff, 0xff, 0xff, 0xff, 0xce, 0xff, 0xff, 0xff, 0xff];
    assert!(flat.from_bytes(&shape, &bytes).is_err());
}

#[test]
fn raw_carrier_passes_through_and_promotes() {
    let serializer = Serializer::new();
    let shape = TypeShape::primitive(PrimitiveShape::Raw);

    // decode from a shared buffer: zero-copy window
    let input: Arc<[u8]> = Arc::from(&[0x92u8, 0x01, 0xa1, b'x'][..]);
    let value = serializer.from_shared(&shape, &input).expect("decode");
    let raw = value.as_raw().expect("raw value");
    assert!(!raw.is_owned());
    assert_eq!(raw.bytes(), input.as_ref());

    // write emits the bytes verbatim
    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(bytes, input.as_ref());

    // promotion detaches from the input buffer, idempotently
    let mut raw = raw.clone();
    raw.make_owned();
    raw.make_owned();
    assert!(raw.is_owned());
    assert_eq!(raw.bytes(), input.as_ref());

    // decode from a transient slice copies up front
    let value = serializer.from_bytes(&shape, input.as_ref()).expect("decode");
    assert!(value.as_raw().expect("raw value").is_owned());
}
