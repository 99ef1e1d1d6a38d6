// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Positioned MessagePack reader over a byte slice.
//!
//! String and binary payloads are returned as zero-copy spans of the input.
//! When the reader is built over a reference-counted buffer, decoded raw
//! carriers can share it instead of copying.

use super::constants::*;
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult, WireErrorKind};
use std::sync::Arc;

/// Generate typed integer reads on top of the any-width decoders. Each
/// method range-checks the decoded value against the target type.
macro_rules! impl_read_uint {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self) -> PackResult<$type> {
            let v = self.read_uint()?;
            <$type>::try_from(v).map_err(|_| PackError::mismatch(stringify!($type), v))
        }
    };
}

macro_rules! impl_read_int {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self) -> PackResult<$type> {
            let v = self.read_int()?;
            <$type>::try_from(v).map_err(|_| PackError::mismatch(stringify!($type), v))
        }
    };
}

/// Bounds-checked MessagePack decoder.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    shared: Option<Arc<[u8]>>,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            shared: None,
        }
    }

    /// Build a reader whose raw spans can share the backing buffer.
    #[must_use]
    pub fn from_shared(buf: &'a Arc<[u8]>) -> Self {
        Self {
            data: buf,
            pos: 0,
            shared: Some(buf.clone()),
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The reference-counted backing buffer, when one exists.
    #[must_use]
    pub fn shared_backing(&self) -> Option<&Arc<[u8]>> {
        self.shared.as_ref()
    }

    /// A window of the underlying input.
    #[must_use]
    pub fn input_slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }

    fn check(&self, n: usize) -> PackResult<()> {
        if self.pos + n > self.data.len() {
            Err(PackError::wire(WireErrorKind::Truncated, self.data.len()))
        } else {
            Ok(())
        }
    }

    fn take(&mut self, n: usize) -> PackResult<&'a [u8]> {
        self.check(n)?;
        let span = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(span)
    }

    fn u8(&mut self) -> PackResult<u8> {
        self.check(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn u16(&mut self) -> PackResult<u16> {
        let span = self.take(2)?;
        Ok(u16::from_be_bytes([span[0], span[1]]))
    }

    fn u32(&mut self) -> PackResult<u32> {
        let span = self.take(4)?;
        Ok(u32::from_be_bytes([span[0], span[1], span[2], span[3]]))
    }

    fn u64(&mut self) -> PackResult<u64> {
        let span = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(span);
        Ok(u64::from_be_bytes(bytes))
    }

    /// First byte of the next value, without consuming it.
    pub fn peek_byte(&self) -> PackResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(PackError::wire(WireErrorKind::Truncated, self.pos))
    }

    /// Classify the next value, without consuming it.
    pub fn peek_type(&self) -> PackResult<WireType> {
        let marker = self.peek_byte()?;
        classify(marker)
            .ok_or_else(|| PackError::wire(WireErrorKind::InvalidTypeByte(marker), self.pos))
    }

    pub fn read_nil(&mut self) -> PackResult<()> {
        let marker = self.u8()?;
        if marker == NIL {
            Ok(())
        } else {
            Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "nil",
                    found: marker,
                },
                self.pos - 1,
            ))
        }
    }

    /// Consume a nil marker if one is next.
    #[must_use]
    pub fn try_read_nil(&mut self) -> bool {
        if self.data.get(self.pos) == Some(&NIL) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn read_bool(&mut self) -> PackResult<bool> {
        let marker = self.u8()?;
        match marker {
            TRUE => Ok(true),
            FALSE => Ok(false),
            _ => Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "bool",
                    found: marker,
                },
                self.pos - 1,
            )),
        }
    }

    /// Read any-width unsigned integer. Positive signed encodings are
    /// accepted when they fit.
    pub fn read_uint(&mut self) -> PackResult<u64> {
        let v = self.read_int_any()?;
        match v {
            IntValue::Unsigned(v) => Ok(v),
            IntValue::Signed(v) => {
                u64::try_from(v).map_err(|_| PackError::mismatch("unsigned integer", v))
            }
        }
    }

    /// Read any-width signed integer. Unsigned encodings are accepted when
    /// they fit.
    pub fn read_int(&mut self) -> PackResult<i64> {
        let v = self.read_int_any()?;
        match v {
            IntValue::Signed(v) => Ok(v),
            IntValue::Unsigned(v) => {
                i64::try_from(v).map_err(|_| PackError::mismatch("signed integer", v))
            }
        }
    }

    fn read_int_any(&mut self) -> PackResult<IntValue> {
        let marker = self.u8()?;
        match marker {
            0x00..=POS_FIXINT_MAX => Ok(IntValue::Unsigned(u64::from(marker))),
            NEG_FIXINT_BASE..=0xff => Ok(IntValue::Signed(i64::from(marker as i8))),
            UINT8 => Ok(IntValue::Unsigned(u64::from(self.u8()?))),
            UINT16 => Ok(IntValue::Unsigned(u64::from(self.u16()?))),
            UINT32 => Ok(IntValue::Unsigned(u64::from(self.u32()?))),
            UINT64 => Ok(IntValue::Unsigned(self.u64()?)),
            INT8 => Ok(IntValue::Signed(i64::from(self.u8()? as i8))),
            INT16 => Ok(IntValue::Signed(i64::from(self.u16()? as i16))),
            INT32 => Ok(IntValue::Signed(i64::from(self.u32()? as i32))),
            INT64 => Ok(IntValue::Signed(self.u64()? as i64)),
            _ => Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "integer",
                    found: marker,
                },
                self.pos - 1,
            )),
        }
    }

    impl_read_uint!(read_u8, u8);
    impl_read_uint!(read_u16, u16);
    impl_read_uint!(read_u32, u32);
    impl_read_int!(read_i8, i8);
    impl_read_int!(read_i16, i16);
    impl_read_int!(read_i32, i32);

    pub fn read_u64(&mut self) -> PackResult<u64> {
        self.read_uint()
    }

    pub fn read_i64(&mut self) -> PackResult<i64> {
        self.read_int()
    }

    pub fn read_f32(&mut self) -> PackResult<f32> {
        let marker = self.u8()?;
        if marker == FLOAT32 {
            Ok(f32::from_bits(self.u32()?))
        } else {
            Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "f32",
                    found: marker,
                },
                self.pos - 1,
            ))
        }
    }

    /// Read an f64. An f32 encoding widens.
    pub fn read_f64(&mut self) -> PackResult<f64> {
        let marker = self.u8()?;
        match marker {
            FLOAT64 => Ok(f64::from_bits(self.u64()?)),
            FLOAT32 => Ok(f64::from(f32::from_bits(self.u32()?))),
            _ => Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "float",
                    found: marker,
                },
                self.pos - 1,
            )),
        }
    }

    /// UTF-8 payload of a string value, zero-copy and unvalidated.
    pub fn read_str_span(&mut self) -> PackResult<&'a [u8]> {
        let marker = self.u8()?;
        let len = match marker {
            FIXSTR_BASE..=0xbf => usize::from(marker & 0x1f),
            STR8 => usize::from(self.u8()?),
            STR16 => usize::from(self.u16()?),
            STR32 => self.u32()? as usize,
            _ => {
                return Err(PackError::wire(
                    WireErrorKind::HeaderMismatch {
                        expected: "string",
                        found: marker,
                    },
                    self.pos - 1,
                ))
            }
        };
        self.take(len)
    }

    pub fn read_str(&mut self) -> PackResult<String> {
        let start = self.pos;
        let span = self.read_str_span()?;
        std::str::from_utf8(span)
            .map(str::to_owned)
            .map_err(|_| PackError::wire(WireErrorKind::InvalidUtf8, start))
    }

    pub fn read_bin_span(&mut self) -> PackResult<&'a [u8]> {
        let marker = self.u8()?;
        let len = match marker {
            BIN8 => usize::from(self.u8()?),
            BIN16 => usize::from(self.u16()?),
            BIN32 => self.u32()? as usize,
            _ => {
                return Err(PackError::wire(
                    WireErrorKind::HeaderMismatch {
                        expected: "binary",
                        found: marker,
                    },
                    self.pos - 1,
                ))
            }
        };
        self.take(len)
    }

    pub fn read_bin(&mut self) -> PackResult<Vec<u8>> {
        self.read_bin_span().map(<[u8]>::to_vec)
    }

    pub fn read_array_header(&mut self) -> PackResult<u32> {
        let marker = self.u8()?;
        match marker {
            FIXARRAY_BASE..=0x9f => Ok(u32::from(marker & 0x0f)),
            ARRAY16 => Ok(u32::from(self.u16()?)),
            ARRAY32 => self.u32(),
            _ => Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "array",
                    found: marker,
                },
                self.pos - 1,
            )),
        }
    }

    pub fn read_map_header(&mut self) -> PackResult<u32> {
        let marker = self.u8()?;
        match marker {
            FIXMAP_BASE..=0x8f => Ok(u32::from(marker & 0x0f)),
            MAP16 => Ok(u32::from(self.u16()?)),
            MAP32 => self.u32(),
            _ => Err(PackError::wire(
                WireErrorKind::HeaderMismatch {
                    expected: "map",
                    found: marker,
                },
                self.pos - 1,
            )),
        }
    }

    /// Skip exactly one value, whatever it is. Nested values consume depth
    /// from `ctx` like regular decoding does.
    pub fn skip(&mut self, ctx: &mut SerializationContext) -> PackResult<()> {
        match self.peek_type()? {
            WireType::Nil | WireType::Bool => {
                self.pos += 1;
                Ok(())
            }
            WireType::Int => self.read_int_any().map(|_| ()),
            WireType::Float => {
                let marker = self.u8()?;
                let width = if marker == FLOAT32 { 4 } else { 8 };
                self.take(width).map(|_| ())
            }
            WireType::Str => self.read_str_span().map(|_| ()),
            WireType::Bin => self.read_bin_span().map(|_| ()),
            WireType::Array => {
                ctx.depth_step()?;
                let n = self.read_array_header()?;
                for _ in 0..n {
                    self.skip(ctx)?;
                }
                ctx.depth_unstep();
                Ok(())
            }
            WireType::Map => {
                ctx.depth_step()?;
                let n = self.read_map_header()?;
                for _ in 0..n {
                    self.skip(ctx)?;
                    self.skip(ctx)?;
                }
                ctx.depth_unstep();
                Ok(())
            }
            WireType::Ext => {
                let marker = self.u8()?;
                let len = match marker {
                    FIXEXT1 => 1,
                    FIXEXT2 => 2,
                    FIXEXT4 => 4,
                    FIXEXT8 => 8,
                    FIXEXT16 => 16,
                    EXT8 => usize::from(self.u8()?),
                    EXT16 => usize::from(self.u16()?),
                    _ => self.u32()? as usize,
                };
                // one extra byte for the extension type tag
                self.take(len + 1).map(|_| ())
            }
        }
    }

    /// The raw bytes of exactly one value, zero-copy.
    pub fn read_raw_span(&mut self, ctx: &mut SerializationContext) -> PackResult<&'a [u8]> {
        let start = self.pos;
        self.skip(ctx)?;
        Ok(&self.data[start..self.pos])
    }
}

enum IntValue {
    Signed(i64),
    Unsigned(u64),
}
