// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Async framing for encode: a staging buffer in front of an `AsyncWrite`
//! sink, drained at structure boundaries.

use super::writer::Writer;
use crate::context::SerializationContext;
use crate::error::PackResult;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Default staging watermark: once the staged bytes pass this size the next
/// boundary check drains them to the sink.
pub const DEFAULT_FLUSH_WATERMARK: usize = 8 * 1024;

/// Batching adapter between the sync [`Writer`] and an async sink.
///
/// Converters encode into the staging writer; between structures they ask
/// [`AsyncWriter::flush_if_appropriate`], which drains staged bytes only
/// when the watermark was crossed. A flush therefore never lands inside a
/// value's bytes.
pub struct AsyncWriter<'w> {
    sink: &'w mut (dyn AsyncWrite + Send + Unpin),
    staged: Writer,
    watermark: usize,
}

impl<'w> AsyncWriter<'w> {
    pub fn new(sink: &'w mut (dyn AsyncWrite + Send + Unpin)) -> Self {
        Self::with_watermark(sink, DEFAULT_FLUSH_WATERMARK)
    }

    pub fn with_watermark(
        sink: &'w mut (dyn AsyncWrite + Send + Unpin),
        watermark: usize,
    ) -> Self {
        Self {
            sink,
            staged: Writer::new(),
            watermark: watermark.max(1),
        }
    }

    /// The staging writer converters encode into.
    pub fn staging(&mut self) -> &mut Writer {
        &mut self.staged
    }

    /// Whether enough bytes are staged to justify draining at the next
    /// structure boundary.
    #[must_use]
    pub fn is_time_to_flush(&self) -> bool {
        self.staged.len() >= self.watermark
    }

    /// Drain the staged bytes if the watermark was crossed. Checks
    /// cancellation; callers invoke this only at structure boundaries.
    pub async fn flush_if_appropriate(
        &mut self,
        ctx: &mut SerializationContext,
    ) -> PackResult<()> {
        ctx.check_cancelled()?;
        if self.is_time_to_flush() {
            self.drain().await?;
        }
        Ok(())
    }

    /// Drain all staged bytes and flush the sink.
    pub async fn finish(&mut self, ctx: &mut SerializationContext) -> PackResult<()> {
        ctx.check_cancelled()?;
        self.drain().await?;
        self.sink.flush().await?;
        Ok(())
    }

    async fn drain(&mut self) -> PackResult<()> {
        if !self.staged.is_empty() {
            let bytes = self.staged.take();
            self.sink.write_all(&bytes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watermark_gates_drain() {
        let mut sink: Vec<u8> = Vec::new();
        let mut ctx = SerializationContext::new(8);
        {
            let mut w = AsyncWriter::with_watermark(&mut sink, 4);
            w.staging().write_uint(1);
            w.flush_if_appropriate(&mut ctx).await.expect("below watermark");
            assert!(!w.staging().is_empty());

            w.staging().write_uint(2);
            w.staging().write_uint(3);
            w.staging().write_uint(4);
            w.flush_if_appropriate(&mut ctx).await.expect("drain");
            assert!(w.staging().is_empty());
            w.finish(&mut ctx).await.expect("finish");
        }
        assert_eq!(sink, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[tokio::test]
    async fn test_finish_drains_remainder() {
        let mut sink: Vec<u8> = Vec::new();
        let mut ctx = SerializationContext::new(8);
        {
            let mut w = AsyncWriter::new(&mut sink);
            w.staging().write_bool(true);
            w.finish(&mut ctx).await.expect("finish");
        }
        assert_eq!(sink, vec![0xc3]);
    }

    #[tokio::test]
    async fn test_cancelled_flush() {
        use crate::context::CancelToken;

        let mut sink: Vec<u8> = Vec::new();
        let token = CancelToken::new();
        let mut ctx = SerializationContext::with_cancel(8, token.clone());
        let mut w = AsyncWriter::new(&mut sink);
        token.cancel();
        assert!(w.flush_if_appropriate(&mut ctx).await.is_err());
    }
}
