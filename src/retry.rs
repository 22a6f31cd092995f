use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Poll a readiness check at a fixed interval, up to a bounded attempt count.
///
/// Returns `Ok(true)` as soon as `f` reports ready, `Ok(false)` if all
/// attempts are exhausted without a positive confirmation. A check that
/// errors counts as "not ready" and polling continues; the absence of a
/// positive signal is the caller's timeout condition, not an error here.
pub fn poll_until<F>(interval: Duration, max_attempts: u32, label: &str, f: F) -> Result<bool>
where
    F: Fn() -> Result<bool>,
{
    for attempt in 1..=max_attempts {
        match f() {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "{} check failed", label);
            }
        }
        if attempt < max_attempts {
            thread::sleep(interval);
        }
    }
    Ok(false)
}
