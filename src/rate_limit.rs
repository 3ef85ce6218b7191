//! Capacity-1 admission gate for outbound remote calls
//!
//! At most one call is in flight at a time, and after each call the slot is
//! held for an extra cooldown interval so consecutive calls are spaced out
//! even when responses return instantly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Token-bucket-of-one guarding all remote calls
#[derive(Debug, Clone)]
pub struct RateGate {
    slot: Arc<Semaphore>,
    cooldown: Duration,
}

impl RateGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            cooldown,
        }
    }

    /// Wait for the slot. The returned guard releases it on drop; call
    /// [`SlotGuard::release_after_cooldown`] instead once the remote call
    /// has completed, so the next call waits out the spacing interval.
    pub async fn acquire(&self) -> SlotGuard {
        // The semaphore is never closed, so acquire cannot fail.
        let permit = self.slot.clone().acquire_owned().await.unwrap();
        SlotGuard {
            permit: Some(permit),
            cooldown: self.cooldown,
        }
    }
}

/// Exclusive hold on the rate gate slot
#[derive(Debug)]
pub struct SlotGuard {
    permit: Option<OwnedSemaphorePermit>,
    cooldown: Duration,
}

impl SlotGuard {
    /// Release the slot after the cooldown elapses, without blocking the
    /// caller. Used on every path where the remote call actually went out;
    /// plain drop (immediate release) covers requests that never left.
    pub fn release_after_cooldown(mut self) {
        if let Some(permit) = self.permit.take() {
            let cooldown = self.cooldown;
            tokio::spawn(async move {
                tokio::time::sleep(cooldown).await;
                drop(permit);
            });
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
