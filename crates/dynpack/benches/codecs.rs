// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encode/decode throughput for the main object layouts.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::unreadable_literal)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dynpack::{ObjectValue, PrimitiveShape, Serializer, ShapeBuilder, TypeShape, Value};
use std::sync::Arc;

fn reading_shape() -> Arc<TypeShape> {
    ShapeBuilder::new("SensorReading")
        .field("sensor_id", PrimitiveShape::U32)
        .field("temperature", PrimitiveShape::F64)
        .field("humidity", PrimitiveShape::F32)
        .field("timestamp", PrimitiveShape::U64)
        .string_field("location")
        .build()
}

fn keyed_shape() -> Arc<TypeShape> {
    ShapeBuilder::new("Frame")
        .keyed_field("seq", 0, PrimitiveShape::U64)
        .keyed_field("flags", 1, PrimitiveShape::U8)
        .keyed_field_with_shape("payload", 4, TypeShape::primitive(PrimitiveShape::Bin))
        .build()
}

fn reading_value() -> Value {
    Value::Object(
        ObjectValue::new("SensorReading")
            .with("sensor_id", Value::UInt(42))
            .with("temperature", Value::F64(23.5))
            .with("humidity", Value::F32(65.0))
            .with("timestamp", Value::UInt(1702900000))
            .with("location", Value::Str("Building A".into())),
    )
}

fn frame_value() -> Value {
    Value::Object(
        ObjectValue::new("Frame")
            .with("seq", Value::UInt(777))
            .with("flags", Value::UInt(3))
            .with("payload", Value::Bin(vec![0xab; 256])),
    )
}

fn bench_map_layout(c: &mut Criterion) {
    let serializer = Serializer::new();
    let shape = reading_shape();
    let value = reading_value();
    let bytes = serializer.to_bytes(&shape, &value).expect("encode");

    let mut group = c.benchmark_group("map_layout");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| serializer.to_bytes(black_box(&shape), black_box(&value)).expect("encode"));
    });
    group.bench_function("decode", |b| {
        b.iter(|| serializer.from_bytes(black_box(&shape), black_box(&bytes)).expect("decode"));
    });
    group.finish();
}

fn bench_array_layout(c: &mut Criterion) {
    let serializer = Serializer::new();
    let shape = keyed_shape();
    let value = frame_value();
    let bytes = serializer.to_bytes(&shape, &value).expect("encode");

    let mut group = c.benchmark_group("array_layout");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| serializer.to_bytes(black_box(&shape), black_box(&value)).expect("encode"));
    });
    group.bench_function("decode", |b| {
        b.iter(|| serializer.from_bytes(black_box(&shape), black_box(&bytes)).expect("decode"));
    });
    group.finish();
}

criterion_group!(benches, bench_map_layout, bench_array_layout);
criterion_main!(benches);
