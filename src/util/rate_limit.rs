//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::ws::protocol::ControlState;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Control updates forwarded per second per connection. Clients send one
/// per rendered frame, so this sits well above any display rate.
pub const INBOUND_RATE_LIMIT: u32 = 300;

/// How often a held-back control update is pushed through
pub const PENDING_FLUSH_INTERVAL: Duration = Duration::from_millis(20);

/// Per-connection flood guard
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    inbound: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new() -> Self {
        Self::with_limit(INBOUND_RATE_LIMIT)
    }

    pub fn with_limit(per_second: u32) -> Self {
        Self {
            inbound: create_limiter(per_second),
        }
    }

    /// Check if an inbound message is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.inbound.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limits control updates without ever losing the latest one.
///
/// Updates over quota are held back, each replacing the previous held
/// update, and delivered by `take_pending` on the next flush.
pub struct ControlCoalescer {
    limiter: ConnectionRateLimiter,
    pending: Option<ControlState>,
}

impl ControlCoalescer {
    pub fn new(limiter: ConnectionRateLimiter) -> Self {
        Self {
            limiter,
            pending: None,
        }
    }

    /// Returns the update to forward now, or None if it was held back
    pub fn offer(&mut self, controls: ControlState) -> Option<ControlState> {
        if self.limiter.check() {
            // Anything held is older than this update
            self.pending = None;
            Some(controls)
        } else {
            self.pending = Some(controls);
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Hand out the held-back update, bypassing the quota
    pub fn take_pending(&mut self) -> Option<ControlState> {
        self.pending.take()
    }
}
