//! Replay-protection counters.
//!
//! - [`NonceManager`]: millisecond nonces for Hyperliquid actions, strictly
//!   increasing and tracking server time.
//! - [`SequenceCounter`]: cosmos account sequence for one wallet, shared by
//!   every concurrent signing call for that wallet.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, SignerError};

/// Wall-clock source in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Drift above this is logged on sync.
const DRIFT_WARN_MS: i64 = 2_000;
/// Drift above this fails the sync; nonces that far off are refused upstream.
const DRIFT_LIMIT_MS: i64 = 5_000;

/// Hyperliquid action nonces.
///
/// Each nonce is the estimated exchange time in milliseconds, bumped past the
/// previous one when two calls land in the same millisecond or the local clock
/// steps backward. The estimate is `local + offset`, where the offset comes
/// from the last [`sync_with_server`](Self::sync_with_server).
pub struct NonceManager<C: Clock> {
    last: AtomicU64,
    offset_ms: AtomicI64,
    clock: C,
}

impl<C: Clock> NonceManager<C> {
    #[must_use]
    pub fn new(clock: C) -> Self {
        let last = AtomicU64::new(clock.now_ms());
        Self {
            last,
            offset_ms: AtomicI64::new(0),
            clock,
        }
    }

    #[must_use]
    pub fn approx_server_time_ms(&self) -> u64 {
        let local = self.clock.now_ms();
        let offset = self.offset_ms.load(Ordering::Acquire);
        match u64::try_from(offset) {
            Ok(ahead) => local.saturating_add(ahead),
            Err(_) => local.saturating_sub(offset.unsigned_abs()),
        }
    }

    /// Issue a nonce strictly greater than every earlier one.
    pub fn next(&self) -> u64 {
        let floor = self.approx_server_time_ms();
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let candidate = current.saturating_add(1).max(floor);
            match self
                .last
                .compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return candidate,
                Err(seen) => current = seen,
            }
        }
    }

    /// Record the exchange clock. Issued nonces never fall below it afterward.
    ///
    /// # Errors
    /// [`SignerError::TimeDriftTooLarge`] when the clocks disagree by more
    /// than five seconds; the previous offset is kept.
    pub fn sync_with_server(&self, server_time_ms: u64) -> Result<()> {
        let offset = server_time_ms as i64 - self.clock.now_ms() as i64;
        if offset.abs() > DRIFT_LIMIT_MS {
            return Err(SignerError::TimeDriftTooLarge(offset));
        }
        if offset.abs() > DRIFT_WARN_MS {
            tracing::warn!(offset_ms = offset, "Local clock drifting from exchange");
        }

        self.offset_ms.store(offset, Ordering::Release);
        self.last.fetch_max(server_time_ms, Ordering::AcqRel);
        Ok(())
    }

    #[must_use]
    pub fn server_offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Acquire)
    }
}

/// Next unused account sequence for one wallet.
///
/// Starts unsynced. [`observe`](Self::observe) feeds it the chain's value
/// (from `account_info`) and never moves it backward, so sequences handed
/// out locally but not yet visible on chain are not reused.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    /// `None` until the first `observe` after construction or `reset`.
    next: Mutex<Option<u64>>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_synced(&self) -> bool {
        self.next.lock().is_some()
    }

    /// Record the sequence the chain reports as next.
    pub fn observe(&self, chain_sequence: u64) {
        let mut next = self.next.lock();
        *next = Some(next.map_or(chain_sequence, |local| local.max(chain_sequence)));
    }

    /// Take the next sequence. `None` until the counter has been synced.
    pub fn reserve(&self) -> Option<u64> {
        let mut next = self.next.lock();
        let sequence = (*next)?;
        *next = Some(sequence + 1);
        Some(sequence)
    }

    /// Next value `reserve` would return, without taking it. `None` until
    /// synced.
    pub fn current(&self) -> Option<u64> {
        *self.next.lock()
    }

    /// Forget local progress after a rejected broadcast. The next `observe`
    /// sets the counter to the chain's value exactly.
    pub fn reset(&self) {
        *self.next.lock() = None;
    }
}
