// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property plumbing shared by the object converters.

use super::Converter;
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult};
use crate::shape::ShouldSerialize;
use crate::value::{ObjectValue, Value};
use crate::wire::Writer;
use std::sync::Arc;

/// One property of an owner object, paired with the converter for its type.
///
/// An accessor with neither a usable write side nor a usable read side is
/// structurally dead; synthesis drops it before converters see it.
#[derive(Clone)]
pub(crate) struct PropertyAccessor {
    pub name: Arc<str>,
    pub converter: Arc<dyn Converter>,
    /// The property can be read off an in-memory value (it has a getter).
    pub can_write: bool,
    /// The property can be stored on decode (a setter or a constructor
    /// parameter).
    pub can_read: bool,
    /// Get-only property with no constructor parameter to carry it back.
    pub suppress_if_no_ctor_param: bool,
    pub prefer_async: bool,
    /// A nil on the wire is a legitimate value for this property (nullable
    /// or raw shapes); otherwise nil is treated as an absent slot.
    pub accepts_nil: bool,
    pub should_serialize: Option<ShouldSerialize>,
}

impl PropertyAccessor {
    /// Whether this property is written for `owner`.
    pub fn included(&self, owner: &Value) -> bool {
        self.can_write
            && self
                .should_serialize
                .as_ref()
                .map_or(true, |pred| pred(owner))
    }

    /// The property's current value; absent fields read as nil.
    pub fn field<'v>(&self, obj: &'v ObjectValue) -> &'v Value {
        obj.get(&self.name).unwrap_or(&Value::Nil)
    }

    pub fn write_field(
        &self,
        obj: &ObjectValue,
        writer: &mut Writer,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        self.converter.write(self.field(obj), writer, ctx)
    }

    pub fn is_dead(&self) -> bool {
        !self.can_write && !self.can_read
    }
}

/// How decoded properties become an object, per the constructor policy.
pub(crate) enum ConstructorPlan {
    /// Parameterless construction; fields land as they are read.
    Default,
    /// Buffer fields, then build the object in declaration order.
    Buffered { declared: Vec<Arc<str>> },
    /// No usable constructor.
    Unavailable,
}

/// Builds the decoded object under a [`ConstructorPlan`].
pub(crate) enum ObjectAssembler {
    Direct(ObjectValue),
    Buffered {
        type_name: Arc<str>,
        staged: Vec<(Arc<str>, Value)>,
        declared: Vec<Arc<str>>,
    },
}

impl ObjectAssembler {
    pub fn new(plan: &ConstructorPlan, type_name: &Arc<str>) -> PackResult<Self> {
        match plan {
            ConstructorPlan::Unavailable => Err(PackError::NotSupported(type_name.to_string())),
            ConstructorPlan::Default => Ok(Self::Direct(ObjectValue::new(type_name.clone()))),
            ConstructorPlan::Buffered { declared } => Ok(Self::Buffered {
                type_name: type_name.clone(),
                staged: Vec::new(),
                declared: declared.clone(),
            }),
        }
    }

    pub fn set(&mut self, name: Arc<str>, value: Value) {
        match self {
            Self::Direct(obj) => obj.set(name, value),
            Self::Buffered { staged, .. } => {
                match staged.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, slot)) => *slot = value,
                    None => staged.push((name, value)),
                }
            }
        }
    }

    pub fn finish(self) -> ObjectValue {
        match self {
            Self::Direct(obj) => obj,
            Self::Buffered {
                type_name,
                mut staged,
                declared,
            } => {
                let mut obj = ObjectValue::new(type_name);
                for name in &declared {
                    if let Some(i) = staged.iter().position(|(n, _)| n == name) {
                        let (n, v) = staged.swap_remove(i);
                        obj.set(n, v);
                    }
                }
                for (n, v) in staged {
                    obj.set(n, v);
                }
                obj
            }
        }
    }
}
