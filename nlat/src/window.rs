use std::time::Duration;

/// Running sums of `M` latency metrics over a fixed number of samples.
///
/// Once `size` samples were pushed the window yields their means and starts over.
#[derive(Debug, Clone)]
pub struct Window<const M: usize> {
    size: usize,
    count: usize,
    sums: [Duration; M],
}

impl<const M: usize> Window<M> {
    pub fn new(size: usize) -> Self {
        Window {
            size: size.max(1),
            count: 0,
            sums: [Duration::ZERO; M],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sums(&self) -> &[Duration; M] {
        &self.sums
    }

    /// Add one sample, returns the means in milliseconds if the window just filled up.
    pub fn push(&mut self, sample: [Duration; M]) -> Option<[f64; M]> {
        for (sum, elapsed) in self.sums.iter_mut().zip(sample) {
            *sum = sum.saturating_add(elapsed);
        }
        self.count += 1;

        if self.count < self.size {
            return None;
        }

        let means = self
            .sums
            .map(|sum| sum.as_nanos() as f64 / self.size as f64 / 1e6);
        self.reset();
        Some(means)
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.sums = [Duration::ZERO; M];
    }
}
