use anyhow::{Context, Result, bail};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::handle::Source;
use crate::record::{Clock, Timestamp};

/// A completed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polled {
    /// when the full record was read
    pub at: Timestamp,
    /// time spent waiting after empty reads
    pub idle: Duration,
    /// number of empty reads before the record arrived
    pub misses: u64,
}

/// Suspend the caller for `wait`, a zero wait only hints a spin loop.
pub fn pause(wait: Duration) {
    if wait.is_zero() {
        std::hint::spin_loop();
    } else {
        std::thread::sleep(wait);
    }
}

/// Read from `source` until `buf` is filled by a single read.
///
/// An empty read pauses for `wait` and retries. A read of any other size than `buf.len()` is a
/// fatal error. Returns `None` if `stop` was raised while waiting.
pub fn poll_full<S: Source + ?Sized, C: Clock + ?Sized>(
    source: &mut S,
    buf: &mut [u8],
    wait: Duration,
    clock: &C,
    stop: &AtomicBool,
) -> Result<Option<Polled>> {
    let want = buf.len();
    let mut idle = Duration::ZERO;
    let mut misses = 0;

    loop {
        let n = source
            .read_next(buf)
            .with_context(|| format!("read({want}) failed"))?;
        let at = clock.now()?;

        if n == want {
            return Ok(Some(Polled { at, idle, misses }));
        }
        if n != 0 {
            bail!("read({want}) = {n} : short read");
        }

        misses += 1;
        if stop.load(Ordering::Relaxed) {
            return Ok(None);
        }
        pause(wait);
        idle += at.until(&clock.now()?);
    }
}
