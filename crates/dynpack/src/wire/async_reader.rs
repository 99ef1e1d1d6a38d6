// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Async framing for decode: buffers whole MessagePack structures from an
//! `AsyncRead` source so decoders can run synchronously over them.

use super::constants::*;
use super::reader::Reader;
use crate::context::SerializationContext;
use crate::error::{PackError, PackResult, WireErrorKind};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default per-fill byte budget.
pub const DEFAULT_READ_BUDGET: usize = 4 * 1024;

/// Batching adapter between an async source and the sync [`Reader`].
///
/// [`AsyncReader::read_next_structures`] grows the internal buffer until it
/// holds at least the requested number of complete values measured from the
/// current position. Decoders then read from [`AsyncReader::buffered`] with
/// a sync reader and [`AsyncReader::consume`] what they used; unconsumed
/// bytes stay buffered for the next request.
pub struct AsyncReader<'r> {
    source: &'r mut (dyn AsyncRead + Send + Unpin),
    buf: Vec<u8>,
    start: usize,
}

impl<'r> AsyncReader<'r> {
    pub fn new(source: &'r mut (dyn AsyncRead + Send + Unpin)) -> Self {
        Self {
            source,
            buf: Vec::new(),
            start: 0,
        }
    }

    /// Unconsumed buffered bytes.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// Mark `n` buffered bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.start + n <= self.buf.len());
        self.start += n;
    }

    /// Ensure at least `min` whole structures are buffered; returns how many
    /// whole structures the buffer currently holds (may exceed `min`).
    ///
    /// `budget` caps how many bytes each read from the source may pull.
    /// Ending the stream before `min` structures arrive is a truncation
    /// error; cancellation is checked before every pull.
    pub async fn read_next_structures(
        &mut self,
        min: usize,
        budget: usize,
        ctx: &mut SerializationContext,
    ) -> PackResult<usize> {
        loop {
            ctx.check_cancelled()?;
            let count = count_structures(self.buffered(), ctx.remaining_depth())?;
            if count >= min {
                return Ok(count);
            }
            if self.fill(budget).await? == 0 {
                return Err(PackError::wire(WireErrorKind::Truncated, self.buf.len()));
            }
        }
    }

    /// Ensure the next value's header (marker plus length bytes) is
    /// buffered, without requiring the body.
    pub async fn fill_for_header(&mut self, ctx: &mut SerializationContext) -> PackResult<()> {
        loop {
            ctx.check_cancelled()?;
            if let Some(marker) = self.buffered().first() {
                let need = header_len(*marker);
                if self.buffered().len() >= need {
                    return Ok(());
                }
            }
            if self.fill(DEFAULT_READ_BUDGET).await? == 0 {
                return Err(PackError::wire(WireErrorKind::Truncated, self.buf.len()));
            }
        }
    }

    async fn fill(&mut self, budget: usize) -> PackResult<usize> {
        // Reclaim the consumed prefix before growing.
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let old = self.buf.len();
        self.buf.resize(old + budget.max(64), 0);
        let n = self.source.read(&mut self.buf[old..]).await?;
        self.buf.truncate(old + n);
        Ok(n)
    }
}

/// Bytes needed to decode the header introduced by `marker` (marker byte
/// included).
fn header_len(marker: u8) -> usize {
    match marker {
        ARRAY16 | MAP16 | STR16 | BIN16 | EXT16 => 3,
        ARRAY32 | MAP32 | STR32 | BIN32 | EXT32 => 5,
        STR8 | BIN8 | EXT8 => 2,
        _ => 1,
    }
}

/// Count complete values at the front of `buf`. Truncation stops the count;
/// malformed bytes are real errors.
fn count_structures(buf: &[u8], depth: u32) -> PackResult<usize> {
    let mut count = 0;
    let mut pos = 0;
    while pos < buf.len() {
        match structure_len(&buf[pos..], depth)? {
            Some(len) => {
                pos += len;
                count += 1;
            }
            None => break,
        }
    }
    Ok(count)
}

/// Wire length of the first value in `buf`, or `None` if it is incomplete.
fn structure_len(buf: &[u8], depth: u32) -> PackResult<Option<usize>> {
    let mut reader = Reader::new(buf);
    let mut probe = SerializationContext::new(depth);
    match reader.skip(&mut probe) {
        Ok(()) => Ok(Some(reader.position())),
        Err(PackError::WireFormat {
            kind: WireErrorKind::Truncated,
            ..
        }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SerializationContext {
        SerializationContext::new(64)
    }

    #[tokio::test]
    async fn test_buffers_minimum_structures() {
        let bytes = [0x01u8, 0x92, 0x02, 0x03, 0xa1, b'x'];
        let mut source: &[u8] = &bytes;
        let mut r = AsyncReader::new(&mut source);
        let count = r
            .read_next_structures(3, 2, &mut ctx())
            .await
            .expect("three structures");
        assert_eq!(count, 3);

        let mut sync = Reader::new(r.buffered());
        assert_eq!(sync.read_uint().expect("first"), 1);
        r.consume(sync.position());
        assert_eq!(r.buffered()[0], 0x92);
    }

    #[tokio::test]
    async fn test_truncated_source() {
        let bytes = [0x92u8, 0x01];
        let mut source: &[u8] = &bytes;
        let mut r = AsyncReader::new(&mut source);
        assert!(matches!(
            r.read_next_structures(1, 16, &mut ctx()).await,
            Err(PackError::WireFormat {
                kind: WireErrorKind::Truncated,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fill_for_header() {
        let bytes = [ARRAY16, 0x00, 0x02, 0x01, 0x02];
        let mut source: &[u8] = &bytes;
        let mut r = AsyncReader::new(&mut source);
        r.fill_for_header(&mut ctx()).await.expect("header");
        let mut sync = Reader::new(r.buffered());
        assert_eq!(sync.read_array_header().expect("header"), 2);
    }

    #[test]
    fn test_count_structures_partial() {
        // one whole int, then a truncated fixstr
        let buf = [0x2a, 0xa4, b'n', b'a'];
        assert_eq!(count_structures(&buf, 64).expect("count"), 1);
    }
}
