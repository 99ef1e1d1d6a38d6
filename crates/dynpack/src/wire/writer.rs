// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable MessagePack writer.
//!
//! Integers are always written in their smallest wire form.

use super::constants::*;

/// Buffered MessagePack encoder.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take the encoded bytes, leaving the writer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn write_nil(&mut self) {
        self.buf.push(NIL);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(if v { TRUE } else { FALSE });
    }

    /// Write an unsigned integer in its smallest form.
    pub fn write_uint(&mut self, v: u64) {
        if v <= u64::from(POS_FIXINT_MAX) {
            self.buf.push(v as u8);
        } else if v <= u64::from(u8::MAX) {
            self.buf.push(UINT8);
            self.buf.push(v as u8);
        } else if v <= u64::from(u16::MAX) {
            self.buf.push(UINT16);
            self.buf.extend_from_slice(&(v as u16).to_be_bytes());
        } else if v <= u64::from(u32::MAX) {
            self.buf.push(UINT32);
            self.buf.extend_from_slice(&(v as u32).to_be_bytes());
        } else {
            self.buf.push(UINT64);
            self.buf.extend_from_slice(&v.to_be_bytes());
        }
    }

    /// Write a signed integer in its smallest form. Non-negative values use
    /// the unsigned encodings.
    pub fn write_int(&mut self, v: i64) {
        if v >= 0 {
            self.write_uint(v as u64);
        } else if v >= -32 {
            self.buf.push(v as u8);
        } else if v >= i64::from(i8::MIN) {
            self.buf.push(INT8);
            self.buf.push(v as u8);
        } else if v >= i64::from(i16::MIN) {
            self.buf.push(INT16);
            self.buf.extend_from_slice(&(v as i16).to_be_bytes());
        } else if v >= i64::from(i32::MIN) {
            self.buf.push(INT32);
            self.buf.extend_from_slice(&(v as i32).to_be_bytes());
        } else {
            self.buf.push(INT64);
            self.buf.extend_from_slice(&v.to_be_bytes());
        }
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.push(FLOAT32);
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.push(FLOAT64);
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_str(&mut self, v: &str) {
        let bytes = v.as_bytes();
        self.write_str_header(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Write only the string header for a payload of `len` bytes.
    pub fn write_str_header(&mut self, len: usize) {
        if len <= 31 {
            self.buf.push(FIXSTR_BASE | len as u8);
        } else if len <= usize::from(u8::MAX) {
            self.buf.push(STR8);
            self.buf.push(len as u8);
        } else if len <= usize::from(u16::MAX) {
            self.buf.push(STR16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(STR32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }

    pub fn write_bin(&mut self, v: &[u8]) {
        if v.len() <= usize::from(u8::MAX) {
            self.buf.push(BIN8);
            self.buf.push(v.len() as u8);
        } else if v.len() <= usize::from(u16::MAX) {
            self.buf.push(BIN16);
            self.buf.extend_from_slice(&(v.len() as u16).to_be_bytes());
        } else {
            self.buf.push(BIN32);
            self.buf.extend_from_slice(&(v.len() as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(v);
    }

    pub fn write_array_header(&mut self, n: u32) {
        if n <= 15 {
            self.buf.push(FIXARRAY_BASE | n as u8);
        } else if n <= u32::from(u16::MAX) {
            self.buf.push(ARRAY16);
            self.buf.extend_from_slice(&(n as u16).to_be_bytes());
        } else {
            self.buf.push(ARRAY32);
            self.buf.extend_from_slice(&n.to_be_bytes());
        }
    }

    pub fn write_map_header(&mut self, n: u32) {
        if n <= 15 {
            self.buf.push(FIXMAP_BASE | n as u8);
        } else if n <= u32::from(u16::MAX) {
            self.buf.push(MAP16);
            self.buf.extend_from_slice(&(n as u16).to_be_bytes());
        } else {
            self.buf.push(MAP32);
            self.buf.extend_from_slice(&n.to_be_bytes());
        }
    }

    /// Blit pre-encoded bytes verbatim.
    pub fn write_raw_span(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Wire length of `v` encoded as an unsigned integer.
    #[must_use]
    pub fn encoded_uint_len(v: u64) -> usize {
        if v <= u64::from(POS_FIXINT_MAX) {
            1
        } else if v <= u64::from(u8::MAX) {
            2
        } else if v <= u64::from(u16::MAX) {
            3
        } else if v <= u64::from(u32::MAX) {
            5
        } else {
            9
        }
    }
}
