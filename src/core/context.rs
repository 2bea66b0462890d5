use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crate::core::error::{Error, Result};

/// Cooperative cancellation shared by every task of one logical query.
///
/// Segment searches poll it between units of work; canceling never interrupts a
/// task mid-step.
#[derive(Debug, Clone, Default)]
pub struct Context {
    canceled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            return Err(Error::canceled());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let ctx = Context::new();
        let child = ctx.clone();
        assert!(child.check().is_ok());

        ctx.cancel();
        assert!(child.is_canceled());
        assert!(child.check().unwrap_err().is_canceled());
    }
}
