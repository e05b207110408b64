use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;

/// Granularity at which cancellable sleeps re-check their token.
pub const SLICE: Duration = Duration::from_millis(25);

pub fn sleep_secs(secs: f64) {
    if let Ok(d) = Duration::try_from_secs_f64(secs.max(0.0)) {
        thread::sleep(d);
    }
}

/// Uniform draw from `[lo, hi]`; a degenerate range returns `lo`.
pub fn uniform(lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rand::thread_rng().gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Sleep a uniformly drawn number of seconds from `range`.
pub fn sleep_between(range: [f64; 2]) {
    sleep_secs(uniform(range[0], range[1]));
}

/// Sleep up to `secs`, waking early once `token` is cancelled.
/// Returns false if the sleep was cut short. An unbounded `secs` waits
/// for the token.
pub fn sleep_cancellable(secs: f64, token: &CancellationToken) -> bool {
    let deadline = Duration::try_from_secs_f64(secs.max(0.0))
        .ok()
        .and_then(|d| Instant::now().checked_add(d));
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        let slice = match deadline {
            Some(d) if now >= d => return true,
            Some(d) => SLICE.min(d - now),
            None => SLICE,
        };
        thread::sleep(slice);
    }
}
