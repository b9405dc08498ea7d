// =============================================================================
// Rate-Limit Tracker — keeps dashboard polling under Binance's weight budget
// =============================================================================
//
// Binance allows 6000 request weight per minute per IP on the spot REST API.
// The tracker reads the `X-MBX-USED-WEIGHT-1M` response header after every
// request and refuses new requests once our own ceiling is reached. The
// reading is only trusted for the minute it was taken in, so a blocked
// tracker unblocks itself when the exchange's window rolls over.
// =============================================================================

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use serde::Serialize;
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
pub const WEIGHT_HARD_LIMIT: u32 = 5000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 4000;

/// Request weight of `GET /api/v3/klines` for `limit <= 1000`.
pub const KLINES_WEIGHT: u32 = 2;
/// Request weight of `GET /api/v3/ticker/24hr` for a single symbol.
pub const TICKER_WEIGHT: u32 = 2;

/// Request weight of `GET /api/v3/depth` for the given limit.
pub fn depth_weight(limit: u32) -> u32 {
    match limit {
        0..=100 => 5,
        101..=500 => 25,
        501..=1000 => 50,
        _ => 250,
    }
}

/// Thread-safe weight tracker backed by atomic counters.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    /// Epoch minute in which `used_weight_1m` was reported.
    observed_minute: AtomicI64,
}

/// Serialisable view of the tracker for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

fn current_minute() -> i64 {
    chrono::Utc::now().timestamp() / 60
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            observed_minute: AtomicI64::new(0),
        }
    }

    /// Update from the HTTP response headers returned by Binance.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let weight = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok());

        if let Some(w) = weight {
            self.record(w, current_minute());
        }
    }

    fn record(&self, weight: u32, minute: i64) {
        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        self.observed_minute.store(minute, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    fn used_in(&self, minute: i64) -> u32 {
        if self.observed_minute.load(Ordering::Relaxed) == minute {
            self.used_weight_1m.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// `Ok(())` if `weight` more request weight fits under the hard limit,
    /// otherwise the weight already used this minute.
    pub fn try_acquire(&self, weight: u32) -> Result<(), u32> {
        self.try_acquire_at(weight, current_minute())
    }

    fn try_acquire_at(&self, weight: u32, minute: i64) -> Result<(), u32> {
        let used = self.used_in(minute);
        // The header value is exchange-supplied and may be arbitrarily large.
        if used.saturating_add(weight) <= WEIGHT_HARD_LIMIT {
            Ok(())
        } else {
            warn!(
                current_weight = used,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
            Err(used)
        }
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_in(current_minute()),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .field("observed_minute", &self.observed_minute.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn fresh_tracker_allows_requests() {
        let t = RateLimitTracker::new();
        assert!(t.try_acquire(KLINES_WEIGHT).is_ok());
    }

    #[test]
    fn blocks_near_the_ceiling_within_the_same_minute() {
        let t = RateLimitTracker::new();
        t.record(WEIGHT_HARD_LIMIT - 1, 100);
        assert!(t.try_acquire_at(1, 100).is_ok());
        assert_eq!(t.try_acquire_at(2, 100), Err(WEIGHT_HARD_LIMIT - 1));
    }

    #[test]
    fn reading_expires_when_minute_rolls_over() {
        let t = RateLimitTracker::new();
        t.record(WEIGHT_HARD_LIMIT, 100);
        assert!(t.try_acquire_at(1, 100).is_err());
        assert!(t.try_acquire_at(1, 101).is_ok());
    }

    #[test]
    fn oversized_header_weight_blocks_without_overflow() {
        let t = RateLimitTracker::new();
        t.record(u32::MAX, 100);
        assert_eq!(t.try_acquire_at(KLINES_WEIGHT, 100), Err(u32::MAX));

        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static("4294967295"));
        t.update_from_headers(&headers);
        assert!(t.try_acquire(u32::MAX).is_err());
    }

    #[test]
    fn header_updates_weight() {
        let t = RateLimitTracker::new();
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static("42"));
        t.update_from_headers(&headers);
        assert_eq!(t.used_weight_1m.load(Ordering::Relaxed), 42);
    }

    #[test]
    fn depth_weight_tiers() {
        assert_eq!(depth_weight(20), 5);
        assert_eq!(depth_weight(500), 25);
        assert_eq!(depth_weight(1000), 50);
        assert_eq!(depth_weight(5000), 250);
    }
}
