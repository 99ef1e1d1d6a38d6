// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-call serialization state: depth budget and cooperative cancellation.

use crate::error::{PackError, PackResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle.
///
/// Cloning shares the underlying flag. Converters check the token at every
/// suspension point; a cancelled token surfaces as [`PackError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Scoped state for one encode or decode call.
///
/// Lives exactly as long as the call; never shared between calls.
#[derive(Debug)]
pub struct SerializationContext {
    remaining_depth: u32,
    cancel: Option<CancelToken>,
}

impl SerializationContext {
    #[must_use]
    pub fn new(max_depth: u32) -> Self {
        Self {
            remaining_depth: max_depth,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(max_depth: u32, token: CancelToken) -> Self {
        Self {
            remaining_depth: max_depth,
            cancel: Some(token),
        }
    }

    /// Enter one nesting level; fails with [`PackError::DepthExceeded`] when
    /// the budget is spent.
    pub fn depth_step(&mut self) -> PackResult<()> {
        match self.remaining_depth.checked_sub(1) {
            Some(rest) => {
                self.remaining_depth = rest;
                Ok(())
            }
            None => Err(PackError::DepthExceeded),
        }
    }

    /// Leave a nesting level entered with [`Self::depth_step`].
    pub fn depth_unstep(&mut self) {
        self.remaining_depth += 1;
    }

    #[must_use]
    pub fn remaining_depth(&self) -> u32 {
        self.remaining_depth
    }

    /// Surface [`PackError::Cancelled`] if the attached token fired.
    pub fn check_cancelled(&self) -> PackResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(PackError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_budget() {
        let mut ctx = SerializationContext::new(2);
        ctx.depth_step().expect("level 1");
        ctx.depth_step().expect("level 2");
        assert!(matches!(ctx.depth_step(), Err(PackError::DepthExceeded)));
        ctx.depth_unstep();
        assert_eq!(ctx.remaining_depth(), 1);
        ctx.depth_step().expect("level 2 again");
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let ctx = SerializationContext::with_cancel(8, token.clone());
        ctx.check_cancelled().expect("not cancelled yet");
        token.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(PackError::Cancelled)));
    }

    #[test]
    fn test_no_token_never_cancels() {
        let ctx = SerializationContext::new(8);
        ctx.check_cancelled().expect("no token attached");
    }
}
