//! Bounded polling waits used inside a single task step.

use ecto_proto::{Clock, Result, StopSignal};
use std::time::Duration;

/// Interval between condition checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Polls `condition` until it holds or `timeout` elapses.
///
/// Returns `Ok(true)` when the condition held, `Ok(false)` on timeout. A hard
/// stop aborts the wait immediately with [`ecto_proto::Error::HardStop`]; any
/// error from the condition itself is propagated unchanged.
pub fn poll_until<F>(
    clock: &dyn Clock,
    stop: &StopSignal,
    timeout: Duration,
    interval: Duration,
    mut condition: F,
) -> Result<bool>
where
    F: FnMut() -> Result<bool>,
{
    let deadline = clock.now_millis() + timeout.as_millis() as u64;
    loop {
        stop.check()?;
        if condition()? {
            return Ok(true);
        }
        if clock.now_millis() >= deadline {
            return Ok(false);
        }
        clock.sleep(interval);
    }
}
