use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Cancellation signal shared between a caller and a running archive operation.
///
/// Clones observe the same flag. Archive, extract and insert check it once per entry.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`Error::Cancelled`] once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_flag() {
        let ctx = Context::new();
        let other = ctx.clone();
        assert!(ctx.check().is_ok());

        other.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }
}
