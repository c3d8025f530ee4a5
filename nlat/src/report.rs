use log::debug;
use std::sync::Mutex;
use std::time::Duration;

use crate::window::Window;

/// Formats one report line from the window size and the metric means in milliseconds.
pub type Format<const M: usize> = fn(usize, &[f64; M]) -> String;

/// `avg 1000 =   0.031234 ms`
pub fn latency_line(cnt: usize, means: &[f64; 1]) -> String {
    format!("avg {cnt} = {:8.6} ms", means[0])
}

/// `avg 100 : end-to-end ... ms, read-after-write ... ms, sleep ... ms`
pub fn tailing_line(cnt: usize, means: &[f64; 3]) -> String {
    format!(
        "avg {cnt} : end-to-end {:8.4} ms, read-after-write {:8.4} ms, sleep {:8.4} ms",
        means[0], means[1], means[2]
    )
}

/// Accumulates samples into a window and prints a line every time it fills up.
///
/// Safe to share between threads, a report never interleaves with another one.
pub struct Reporter<const M: usize> {
    window: Mutex<Window<M>>,
    history: Mutex<Vec<[f64; M]>>,
    format: Format<M>,
    limit: Option<usize>,
}

impl<const M: usize> Reporter<M> {
    /// Report every `size` samples, stop after `limit` reports if given.
    pub fn new(size: usize, limit: Option<usize>, format: Format<M>) -> Self {
        Reporter {
            window: Mutex::new(Window::new(size)),
            history: Mutex::new(Vec::new()),
            format,
            limit,
        }
    }

    /// Record one sample, returns `true` once the report limit was reached.
    pub fn record(&self, sample: [Duration; M]) -> bool {
        let mut window = self.window.lock().expect("window lock poisoned");
        let Some(means) = window.push(sample) else {
            return false;
        };

        println!("{}", (self.format)(window.size(), &means));
        debug!("window of {} samples reset", window.size());

        // unbounded runs never summarize, so they keep no history
        let Some(limit) = self.limit else {
            return false;
        };
        let mut history = self.history.lock().expect("history lock poisoned");
        history.push(means);
        history.len() >= limit
    }

    /// Means of every completed window so far, always empty without a report limit.
    pub fn history(&self) -> Vec<[f64; M]> {
        self.history.lock().expect("history lock poisoned").clone()
    }

    /// Samples in the current, not yet reported window.
    pub fn pending(&self) -> usize {
        self.window.lock().expect("window lock poisoned").count()
    }
}
