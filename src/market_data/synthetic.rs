// =============================================================================
// Synthetic candles — placeholder series when the exchange is unreachable
// =============================================================================
//
// Geometric random walk from a fixed starting price. The structure is
// deterministic (count, spacing, alignment, OHLC ordering); only the values
// are random.
// =============================================================================

use rand::Rng;

use super::candle::Candle;

/// Price the walk starts from.
pub const START_PRICE: f64 = 30_000.0;

/// Largest per-candle move, as a fraction of the open.
const MAX_STEP: f64 = 0.02;
/// Largest wick beyond the body, as a fraction of the body edge.
const MAX_WICK: f64 = 0.01;

/// Generate `count` candles spaced `step_ms` apart, the last one opening at
/// the start of the interval containing `now_ms`.
pub fn generate(count: usize, step_ms: i64, now_ms: i64) -> Vec<Candle> {
    generate_with_rng(&mut rand::thread_rng(), count, step_ms, now_ms)
}

pub fn generate_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    step_ms: i64,
    now_ms: i64,
) -> Vec<Candle> {
    if count == 0 {
        return Vec::new();
    }
    let step_ms = step_ms.max(1);
    let last_open = now_ms - now_ms.rem_euclid(step_ms);
    let first_open = last_open - (count as i64 - 1) * step_ms;

    let mut price = START_PRICE;
    let mut candles = Vec::with_capacity(count);

    for i in 0..count {
        let open = price;
        let close = open * (1.0 + rng.gen_range(-MAX_STEP..=MAX_STEP));
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..=MAX_WICK));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..=MAX_WICK));
        let volume = rng.gen_range(10.0..1_000.0);

        candles.push(Candle {
            timestamp: first_open + i as i64 * step_ms,
            open,
            high,
            low,
            close,
            volume,
            turnover: volume * close,
        });
        price = close;
    }

    candles
}
