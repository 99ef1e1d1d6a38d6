// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for encode, decode, and converter synthesis.

use crate::shape::Alias;
use std::fmt;
use thiserror::Error;

/// Result type used throughout the engine.
pub type PackResult<T> = Result<T, PackError>;

/// Low-level wire failures surfaced by the byte reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorKind {
    /// The buffer ended inside a value.
    Truncated,
    /// A byte that is not a valid MessagePack marker (`0xc1`).
    InvalidTypeByte(u8),
    /// The marker found does not introduce the kind of value the caller asked for.
    HeaderMismatch {
        expected: &'static str,
        found: u8,
    },
    /// A string value is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for WireErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "unexpected end of input"),
            Self::InvalidTypeByte(b) => write!(f, "invalid type byte 0x{b:02x}"),
            Self::HeaderMismatch { expected, found } => {
                write!(f, "expected {expected}, found marker 0x{found:02x}")
            }
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
        }
    }
}

/// Errors produced by the serialization engine.
///
/// Errors are never recovered inside a converter; they unwind the whole
/// encode or decode call. Unknown map keys and extra array entries are
/// skipped, never reported.
#[derive(Debug, Error)]
pub enum PackError {
    /// Maximum nesting depth reached during encode or decode.
    #[error("maximum nesting depth exceeded")]
    DepthExceeded,

    /// Decode requested for a type without a usable constructor.
    #[error("type `{0}` cannot be deserialized: no usable constructor")]
    NotSupported(String),

    /// A polymorphic envelope carried an alias no subtype is registered for.
    #[error("unknown subtype alias {0}")]
    UnknownAlias(Alias),

    /// Encode saw a runtime type that is not in the subtypes table.
    #[error("runtime type `{runtime}` is not a registered subtype of `{base}`")]
    UnknownSubType { base: String, runtime: String },

    /// A polymorphic envelope whose outer array length is not 2.
    #[error("polymorphic envelope must hold 2 elements, found {0}")]
    MalformedPolymorphicEnvelope(u32),

    /// Cancellation observed at a suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// Header mismatch, truncation, or invalid type byte from the reader.
    #[error("wire format error at offset {pos}: {kind}")]
    WireFormat { kind: WireErrorKind, pos: usize },

    /// The value handed to a converter does not match the shape.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A registration arrived after the target converter was synthesized.
    #[error("`{0}` already has a synthesized converter; registration must happen first")]
    AlreadySynthesized(String),

    /// A subtype mapping that is not bijective.
    #[error("invalid subtype mapping for `{base}`: {detail}")]
    InvalidSubTypeMapping { base: String, detail: String },

    /// A shape that cannot be compiled (conflicting keys, bad constructor
    /// parameters).
    #[error("invalid shape `{type_name}`: {detail}")]
    InvalidShape { type_name: String, detail: String },

    /// Async sink or source failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PackError {
    /// Shorthand for a [`PackError::TypeMismatch`].
    pub fn mismatch(expected: &'static str, found: impl fmt::Display) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.to_string(),
        }
    }

    /// Shorthand for a [`PackError::WireFormat`].
    pub fn wire(kind: WireErrorKind, pos: usize) -> Self {
        Self::WireFormat { kind, pos }
    }
}
