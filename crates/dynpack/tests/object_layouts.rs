// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire-level coverage for the two object layouts: byte-exact vectors,
//! representation selection, forward compatibility, constructors, and the
//! lifecycle hooks.

#![allow(clippy::missing_panics_doc)]

use dynpack::{
    Constructor, ObjectValue, PackError, PrimitiveShape, PropertyShape, Serializer, ShapeBuilder,
    TypeShape, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn map_layout_single_property_vector() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Person").string_field("name").build();
    let value = Value::Object(
        ObjectValue::new("Person").with("name", Value::Str("Alice".into())),
    );

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(
        bytes,
        vec![0x81, 0xa4, b'n', b'a', b'm', b'e', 0xa5, b'A', b'l', b'i', b'c', b'e']
    );
    assert_eq!(serializer.from_bytes(&shape, &bytes).expect("decode"), value);
}

#[test]
fn map_layout_writes_declaration_order() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Pair")
        .field("b", PrimitiveShape::U8)
        .field("a", PrimitiveShape::U8)
        .build();
    // insertion order of the value does not matter
    let value = Value::Object(
        ObjectValue::new("Pair")
            .with("a", Value::UInt(1))
            .with("b", Value::UInt(2)),
    );
    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(bytes, vec![0x82, 0xa1, b'b', 0x02, 0xa1, b'a', 0x01]);
}

#[test]
fn map_layout_skips_unknown_keys() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Versioned")
        .field("id", PrimitiveShape::U32)
        .build();
    // {"extra": [1, 2], "id": 7} from some newer producer
    let bytes = [
        0x82, 0xa5, b'e', b'x', b't', b'r', b'a', 0x92, 0x01, 0x02, 0xa2, b'i', b'd', 0x07,
    ];
    let value = serializer.from_bytes(&shape, &bytes).expect("decode");
    let expected = Value::Object(ObjectValue::new("Versioned").with("id", Value::UInt(7)));
    assert_eq!(value, expected);
}

#[test]
fn array_layout_holes_vector() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Sparse")
        .keyed_field("a", 0, PrimitiveShape::Str)
        .keyed_field("c", 2, PrimitiveShape::Str)
        .build();
    let value = Value::Object(
        ObjectValue::new("Sparse")
            .with("a", Value::Str("a".into()))
            .with("c", Value::Str("c".into())),
    );

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(bytes, vec![0x93, 0xa1, b'a', 0xc0, 0xa1, b'c']);
    assert_eq!(serializer.from_bytes(&shape, &bytes).expect("decode"), value);
    // the engine's own output re-encodes byte-identically
    let again = serializer.from_bytes(&shape, &bytes).expect("decode");
    assert_eq!(serializer.to_bytes(&shape, &again).expect("encode"), bytes);
}

#[test]
fn array_layout_accepts_integer_keyed_map() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Sparse")
        .keyed_field("a", 0, PrimitiveShape::Str)
        .keyed_field("c", 2, PrimitiveShape::Str)
        .build();
    // {0: "a", 2: "c", 9: true} - index 9 is out of range and skipped
    let bytes = [0x83, 0x00, 0xa1, b'a', 0x02, 0xa1, b'c', 0x09, 0xc3];
    let value = serializer.from_bytes(&shape, &bytes).expect("decode");
    let expected = Value::Object(
        ObjectValue::new("Sparse")
            .with("a", Value::Str("a".into()))
            .with("c", Value::Str("c".into())),
    );
    assert_eq!(value, expected);
}

#[test]
fn array_layout_extra_entries_are_skipped() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Small")
        .keyed_field("x", 0, PrimitiveShape::U8)
        .build();
    // [1, "future", [2, 3]]
    let bytes = [0x93, 0x01, 0xa6, b'f', b'u', b't', b'u', b'r', b'e', 0x92, 0x02, 0x03];
    let value = serializer.from_bytes(&shape, &bytes).expect("decode");
    let expected = Value::Object(ObjectValue::new("Small").with("x", Value::UInt(1)));
    assert_eq!(value, expected);
}

fn always(_: &Value) -> bool {
    true
}

fn never(_: &Value) -> bool {
    false
}

fn selective_shape(keys: &[u32], pass: fn(&Value) -> bool) -> Arc<TypeShape> {
    let mut builder = ShapeBuilder::new("Selective");
    for &key in keys {
        builder = builder.property(
            PropertyShape::new(
                format!("p{key}").as_str(),
                TypeShape::primitive(PrimitiveShape::U8),
            )
            .with_key(key)
            .with_should_serialize(Arc::new(pass)),
        );
    }
    builder.build()
}

fn selective_value(keys: &[u32]) -> Value {
    let mut obj = ObjectValue::new("Selective");
    for &key in keys {
        obj.set(format!("p{key}").as_str(), Value::UInt(u64::from(key) + 10));
    }
    Value::Object(obj)
}

#[test]
fn selection_prefers_map_for_sparse_includes() {
    // include set {0, 5}: map costs 2, array holes cost 4
    let serializer = Serializer::new();
    let shape = selective_shape(&[0, 5], always);
    let value = selective_value(&[0, 5]);

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(bytes, vec![0x82, 0x00, 0x0a, 0x05, 0x0f]);
    assert_eq!(serializer.from_bytes(&shape, &bytes).expect("decode"), value);
}

#[test]
fn selection_prefers_array_for_dense_includes() {
    // include set {0, 1, 2}: array has no holes, map costs 3 keys
    let serializer = Serializer::new();
    let shape = selective_shape(&[0, 1, 2], always);
    let value = selective_value(&[0, 1, 2]);

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(bytes, vec![0x93, 0x0a, 0x0b, 0x0c]);
    assert_eq!(serializer.from_bytes(&shape, &bytes).expect("decode"), value);
}

#[test]
fn selection_excluding_everything_emits_empty_array() {
    let serializer = Serializer::new();
    let shape = selective_shape(&[0, 3], never);
    let value = selective_value(&[0, 3]);

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(bytes, vec![0x90]);

    let decoded = serializer.from_bytes(&shape, &bytes).expect("decode");
    let empty = Value::Object(ObjectValue::new("Selective"));
    assert_eq!(decoded, empty);
}

#[test]
fn constructor_none_fails_decode_only() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Opaque")
        .field("id", PrimitiveShape::U32)
        .constructor(Constructor::None)
        .build();
    let value = Value::Object(ObjectValue::new("Opaque").with("id", Value::UInt(1)));

    let bytes = serializer.to_bytes(&shape, &value).expect("encode works");
    assert!(matches!(
        serializer.from_bytes(&shape, &bytes),
        Err(PackError::NotSupported(name)) if name == "Opaque"
    ));
}

#[test]
fn parameterized_constructor_restores_get_only_properties() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Sealed")
        .property(
            PropertyShape::new("id", TypeShape::primitive(PrimitiveShape::U32)).get_only(),
        )
        .string_field("note")
        .constructor(Constructor::Parameterized(vec!["id".into()]))
        .build();
    let value = Value::Object(
        ObjectValue::new("Sealed")
            .with("id", Value::UInt(9))
            .with("note", Value::Str("kept".into())),
    );

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(serializer.from_bytes(&shape, &bytes).expect("decode"), value);
}

#[test]
fn get_only_without_ctor_param_is_suppressed_on_decode() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Partial")
        .property(
            PropertyShape::new("derived", TypeShape::primitive(PrimitiveShape::U32)).get_only(),
        )
        .field("stored", PrimitiveShape::U32)
        .build();
    let value = Value::Object(
        ObjectValue::new("Partial")
            .with("derived", Value::UInt(3))
            .with("stored", Value::UInt(4)),
    );

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    let decoded = serializer.from_bytes(&shape, &bytes).expect("decode");
    let expected = Value::Object(ObjectValue::new("Partial").with("stored", Value::UInt(4)));
    assert_eq!(decoded, expected);
}

#[test]
fn bad_constructor_parameter_is_rejected() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Typo")
        .field("id", PrimitiveShape::U32)
        .constructor(Constructor::Parameterized(vec!["Id".into()]))
        .build();
    assert!(matches!(
        serializer.to_bytes(
            &shape,
            &Value::Object(ObjectValue::new("Typo").with("id", Value::UInt(1)))
        ),
        Err(PackError::InvalidShape { .. })
    ));
}

#[test]
fn lifecycle_hooks_fire_exactly_once() {
    let before_calls = Arc::new(AtomicUsize::new(0));
    let after_calls = Arc::new(AtomicUsize::new(0));

    let before = {
        let calls = before_calls.clone();
        Arc::new(move |_: &Value| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    let after = {
        let calls = after_calls.clone();
        Arc::new(move |value: &mut Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(obj) = value.as_object_mut() {
                obj.set("restored", Value::Bool(true));
            }
        })
    };

    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("Audited")
        .field("id", PrimitiveShape::U32)
        .nullable_field("restored", PrimitiveShape::Bool)
        .before_serialize(before)
        .after_deserialize(after)
        .build();
    let value = Value::Object(
        ObjectValue::new("Audited")
            .with("id", Value::UInt(5))
            .with("restored", Value::Nil),
    );

    let bytes = serializer.to_bytes(&shape, &value).expect("encode");
    assert_eq!(before_calls.load(Ordering::SeqCst), 1);
    assert_eq!(after_calls.load(Ordering::SeqCst), 0);

    let decoded = serializer.from_bytes(&shape, &bytes).expect("decode");
    assert_eq!(before_calls.load(Ordering::SeqCst), 1);
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        decoded.as_object().and_then(|o| o.get("restored")),
        Some(&Value::Bool(true))
    );
}

#[test]
fn recursive_shape_roundtrips() {
    let serializer = Serializer::new();
    let shape = ShapeBuilder::new("TreeNode")
        .field("label", PrimitiveShape::U32)
        .array_field("children", TypeShape::reference("TreeNode"))
        .build();
    serializer.register_shape(shape.clone());

    let leaf = |label: u64| {
        Value::Object(
            ObjectValue::new("TreeNode")
                .with("label", Value::UInt(label))
                .with("children", Value::Array(vec![])),
        )
    };
    let tree = Value::Object(
        ObjectValue::new("TreeNode")
            .with("label", Value::UInt(1))
            .with("children", Value::Array(vec![leaf(2), leaf(3)])),
    );

    let bytes = serializer.to_bytes(&shape, &tree).expect("encode");
    assert_eq!(serializer.from_bytes(&shape, &bytes).expect("decode"), tree);
}
