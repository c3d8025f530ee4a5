//! The fixed-size block written by the writer and tailed by the reader.
//!
//! Layout: a `CLOCK_MONOTONIC` timestamp (seconds, nanoseconds; native-endian i64 each) followed
//! by zero padding up to the record size.
use anyhow::{Context, Result, ensure};
use nix::time::{ClockId, clock_gettime};
use std::time::Duration;

/// Largest record, also the alignment of the record buffer so it can be used with `O_DIRECT`.
pub const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: i64,
}

impl Timestamp {
    /// Encoded size of a timestamp, the smallest possible record.
    pub const SIZE: usize = 16;

    pub fn now() -> Result<Self> {
        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC).context("clock_gettime failed")?;
        Ok(Timestamp {
            secs: ts.tv_sec() as i64,
            nanos: ts.tv_nsec() as i64,
        })
    }

    /// Time elapsed from `self` until `later`, zero if `later` is not after `self`.
    pub fn until(&self, later: &Timestamp) -> Duration {
        // timestamps decoded from a foreign file can be arbitrary
        let ns = (later.secs as i128 - self.secs as i128) * 1_000_000_000
            + (later.nanos as i128 - self.nanos as i128);
        if ns <= 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(u64::try_from(ns).unwrap_or(u64::MAX))
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.secs.to_ne_bytes());
        out[8..Self::SIZE].copy_from_slice(&self.nanos.to_ne_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut secs = [0u8; 8];
        let mut nanos = [0u8; 8];
        secs.copy_from_slice(&bytes[..8]);
        nanos.copy_from_slice(&bytes[8..Self::SIZE]);
        Timestamp {
            secs: i64::from_ne_bytes(secs),
            nanos: i64::from_ne_bytes(nanos),
        }
    }
}

/// Source of timestamps, the samplers take one so runs can be replayed against a scripted clock.
pub trait Clock {
    fn now(&self) -> Result<Timestamp>;
}

/// The system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Monotonic;

impl Clock for Monotonic {
    fn now(&self) -> Result<Timestamp> {
        Timestamp::now()
    }
}

#[repr(C, align(4096))]
struct Page([u8; PAGE_SIZE]);

/// A page-aligned record buffer of which the first `len` bytes are transferred.
pub struct Record {
    page: Box<Page>,
    len: usize,
}

impl Record {
    /// Create a zeroed record of `len` bytes, `len` must fit a timestamp and a page.
    pub fn new(len: usize) -> Result<Self> {
        ensure!(
            (Timestamp::SIZE..=PAGE_SIZE).contains(&len),
            "record size {len} is outside [{}, {PAGE_SIZE}]",
            Timestamp::SIZE
        );
        Ok(Record {
            page: Box::new(Page([0u8; PAGE_SIZE])),
            len,
        })
    }

    /// Clamp a requested size into the valid record range.
    pub fn clamp_len(len: usize) -> usize {
        len.clamp(Timestamp::SIZE, PAGE_SIZE)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stamp(&mut self, ts: &Timestamp) {
        ts.encode(&mut self.page.0);
    }

    pub fn timestamp(&self) -> Timestamp {
        Timestamp::decode(&self.page.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.page.0[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.page.0[..self.len]
    }
}
