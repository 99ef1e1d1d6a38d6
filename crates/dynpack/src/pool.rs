// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide pool of scratch index buffers.
//!
//! The object-as-array writer borrows a buffer per encode to hold the
//! include list. The RAII guard returns the buffer on every exit path,
//! including error unwinds and cancellation.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Buffers retained by the pool.
const MAX_POOLED: usize = 16;
/// A buffer that grew past this capacity is dropped instead of retained.
const MAX_RETAINED_CAPACITY: usize = 1024;

static INDEX_POOL: Mutex<Vec<Vec<usize>>> = Mutex::new(Vec::new());

/// A pooled `Vec<usize>`, returned to the pool on drop.
pub(crate) struct ScratchIndexes {
    buf: Vec<usize>,
}

impl Deref for ScratchIndexes {
    type Target = Vec<usize>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for ScratchIndexes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for ScratchIndexes {
    fn drop(&mut self) {
        if self.buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        let mut pool = INDEX_POOL.lock();
        if pool.len() < MAX_POOLED {
            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();
            pool.push(buf);
        }
    }
}

/// Borrow an empty index buffer from the pool.
pub(crate) fn take_indexes() -> ScratchIndexes {
    let buf = INDEX_POOL.lock().pop().unwrap_or_default();
    debug_assert!(buf.is_empty());
    ScratchIndexes { buf }
}
