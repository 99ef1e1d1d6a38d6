// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent synthesis: insert-once publication and shared converter trees.

#![allow(clippy::missing_panics_doc)]

use dynpack::{ObjectValue, PrimitiveShape, Serializer, ShapeBuilder, TypeShape, Value};
use std::sync::{Arc, Barrier};
use std::thread;

fn record_shape() -> Arc<TypeShape> {
    ShapeBuilder::new("Record")
        .field("id", PrimitiveShape::U64)
        .string_field("name")
        .array_field("scores", TypeShape::primitive(PrimitiveShape::F64))
        .build()
}

fn record_value(id: u64) -> Value {
    Value::Object(
        ObjectValue::new("Record")
            .with("id", Value::UInt(id))
            .with("name", Value::Str(format!("record-{id}")))
            .with(
                "scores",
                Value::Array(vec![Value::F64(1.0), Value::F64(2.5)]),
            ),
    )
}

#[test]
fn concurrent_synthesis_converges_to_one_converter() {
    let serializer = Arc::new(Serializer::new());
    let shape = record_shape();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let serializer = serializer.clone();
            let shape = shape.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let value = record_value(i as u64);
                let bytes = serializer.to_bytes(&shape, &value).expect("encode");
                let decoded = serializer.from_bytes(&shape, &bytes).expect("decode");
                assert_eq!(decoded, value);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    // after the race settles, lookups return one shared instance
    let first = serializer.converter(&shape).expect("converter");
    let second = serializer.converter(&shape).expect("converter");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn many_types_synthesize_in_parallel() {
    let serializer = Arc::new(Serializer::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let serializer = serializer.clone();
            thread::spawn(move || {
                let shape = ShapeBuilder::new(format!("Gen{i}"))
                    .field("x", PrimitiveShape::I64)
                    .build();
                let value = Value::Object(
                    ObjectValue::new(format!("Gen{i}")).with("x", Value::Int(i)),
                );
                let bytes = serializer.to_bytes(&shape, &value).expect("encode");
                assert_eq!(
                    serializer.from_bytes(&shape, &bytes).expect("decode"),
                    value
                );
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }
}
