//! Write-to-read latency sampling loops.
//!
//! Every sample follows `write -> poll read -> (empty -> wait -> poll read) | full -> record`.
//! Short reads and read errors end the run.
use anyhow::{Context, Result, anyhow, ensure};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use crate::fs::SyncMode;
use crate::handle::{Sink, Source};
use crate::poll::{pause, poll_full};
use crate::record::{Clock, Record, Timestamp};
use crate::report::Reporter;

/// Write `record` stamped with the current time and make it durable according to `sync`.
fn write_stamped<W: Sink + ?Sized, C: Clock + ?Sized>(
    writer: &mut W,
    record: &mut Record,
    sync: SyncMode,
    clock: &C,
) -> Result<Timestamp> {
    let ts = clock.now()?;
    record.stamp(&ts);
    let want = record.len();
    let n = writer
        .write_record(record.as_bytes())
        .with_context(|| format!("write({want}) failed"))?;
    ensure!(n == want, "write({want}) = {n} : short write");
    writer.sync(sync).context("failed to sync")?;
    Ok(ts)
}

/// Single threaded sampler: write one timestamp record, then poll `reader` until it shows up.
///
/// A sample is the time from the end of the write (and sync) until the full record was read.
/// Runs until `reporter` reaches its report limit or an I/O error occurs.
pub fn write_then_read<W, S, C>(
    writer: &mut W,
    reader: &mut S,
    clock: &C,
    sync: SyncMode,
    wait: Duration,
    reporter: &Reporter<1>,
) -> Result<()>
where
    W: Sink + ?Sized,
    S: Source + ?Sized,
    C: Clock + ?Sized,
{
    let mut wrecord = Record::new(Timestamp::SIZE)?;
    let mut rrecord = Record::new(Timestamp::SIZE)?;
    let never = AtomicBool::new(false);

    loop {
        write_stamped(writer, &mut wrecord, sync, clock)?;
        let written = clock.now()?;

        let polled = poll_full(reader, rrecord.as_bytes_mut(), wait, clock, &never)?
            .ok_or_else(|| anyhow!("poll stopped without a stop request"))?;

        if reporter.record([written.until(&polled.at)]) {
            return Ok(());
        }
    }
}

/// Writer half of the tailing benchmark: append a stamped record every `pace` until `stop`.
///
/// Returns the number of records written.
pub fn paced_writer<W, C>(
    writer: &mut W,
    clock: &C,
    len: usize,
    sync: SyncMode,
    pace: Duration,
    stop: &AtomicBool,
) -> Result<u64>
where
    W: Sink + ?Sized,
    C: Clock + ?Sized,
{
    let mut record = Record::new(len)?;
    let mut written = 0;

    while !stop.load(Ordering::Relaxed) {
        write_stamped(writer, &mut record, sync, clock)?;
        written += 1;
        if !pace.is_zero() {
            pause(pace);
        }
    }

    Ok(written)
}

/// Reader half of the tailing benchmark.
///
/// Each sample holds the end-to-end time since polling started, the time since the embedded
/// write timestamp, and the time spent waiting after empty reads. Raises `stop` when done.
pub fn tail_reader<S, C>(
    reader: &mut S,
    clock: &C,
    len: usize,
    wait: Duration,
    reporter: &Reporter<3>,
    stop: &AtomicBool,
) -> Result<()>
where
    S: Source + ?Sized,
    C: Clock + ?Sized,
{
    let result = (|| -> Result<()> {
        let mut record = Record::new(len)?;
        loop {
            let started = clock.now()?;
            let polled = poll_full(reader, record.as_bytes_mut(), wait, clock, stop)?;
            let Some(polled) = polled else {
                return Ok(());
            };
            let sample = [
                started.until(&polled.at),
                record.timestamp().until(&polled.at),
                polled.idle,
            ];
            if reporter.record(sample) {
                return Ok(());
            }
        }
    })();

    stop.store(true, Ordering::Relaxed);
    result
}

/// Run [`paced_writer`] on the calling thread against [`tail_reader`] on a reader thread.
///
/// The reader is opened on its own thread by `open_reader`, writing starts once it is open.
pub fn tail_concurrently<W, S, C, F>(
    writer: &mut W,
    open_reader: F,
    clock: &C,
    len: usize,
    sync: SyncMode,
    pace: Duration,
    reporter: &Reporter<3>,
) -> Result<u64>
where
    W: Sink + ?Sized,
    S: Source,
    C: Clock + Sync + ?Sized,
    F: FnOnce() -> Result<S> + Send,
{
    let stop = AtomicBool::new(false);

    std::thread::scope(|scope| -> Result<u64> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let stop = &stop;

        let handle = std::thread::Builder::new()
            .name("reader".into())
            .spawn_scoped(scope, move || -> Result<()> {
                let mut reader = match open_reader() {
                    Ok(reader) => reader,
                    Err(err) => {
                        stop.store(true, Ordering::Relaxed);
                        let _ = ready_tx.send(Err(err));
                        return Ok(());
                    }
                };
                let _ = ready_tx.send(Ok(()));
                tail_reader(&mut reader, clock, len, pace, reporter, stop)
            })
            .context("failed to spawn the reader thread")?;

        ready_rx
            .recv()
            .context("reader thread exited before opening the reader")??;
        debug!("reader is ready, writing every {pace:?}");

        let written = paced_writer(writer, clock, len, sync, pace, stop);
        stop.store(true, Ordering::Relaxed);

        handle
            .join()
            .map_err(|_| anyhow!("reader thread panicked"))?
            .context("reader failed")?;
        written
    })
}

#[cfg(test)]
mod test {
    use super::{paced_writer, tail_concurrently, tail_reader, write_then_read};
    use crate::fs::SyncMode;
    use crate::handle::{Sink, Source};
    use crate::poll::test::{Scripted, StepClock};
    use crate::record::{Monotonic, Timestamp};
    use crate::report::{Reporter, latency_line, tailing_line};
    use anyhow::{Result, anyhow};
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records every write and sync it sees.
    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        syncs: Vec<SyncMode>,
        fail_after: Option<usize>,
    }

    impl Sink for Recorder {
        fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_after.is_some_and(|n| self.writes.len() >= n) {
                return Ok(buf.len() - 1);
            }
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn sync(&mut self, mode: SyncMode) -> io::Result<()> {
            self.syncs.push(mode);
            Ok(())
        }
    }

    /// An in-memory file: a writer appends records, a reader tails them.
    #[derive(Clone, Default)]
    struct Pipe(Arc<Mutex<VecDeque<Vec<u8>>>>);

    impl Sink for Pipe {
        fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().push_back(buf.to_vec());
            Ok(buf.len())
        }

        fn sync(&mut self, _mode: SyncMode) -> io::Result<()> {
            Ok(())
        }
    }

    impl Source for Pipe {
        fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.lock().unwrap().pop_front() {
                Some(record) => {
                    buf[..record.len()].copy_from_slice(&record);
                    Ok(record.len())
                }
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_write_then_read_one_sample_per_write() {
        // write stamp, end of write, one clock read per poll
        let clock = StepClock::new(Duration::from_millis(1));
        let mut writer = Recorder::default();
        let mut reader = Scripted::new((0..6).map(|_| Ok(Timestamp::SIZE)));
        let reporter = Reporter::new(3, Some(2), latency_line);

        write_then_read(
            &mut writer,
            &mut reader,
            &clock,
            SyncMode::Data,
            Duration::ZERO,
            &reporter,
        )
        .unwrap();

        assert_eq!(writer.writes.len(), 6);
        assert!(writer.writes.iter().all(|w| w.len() == Timestamp::SIZE));
        assert_eq!(writer.syncs, vec![SyncMode::Data; 6]);
        // every read completes 1ms after the write finished
        assert_eq!(reporter.history(), vec![[1.0], [1.0]]);
    }

    #[test]
    fn test_write_then_read_counts_empty_polls() {
        let clock = StepClock::new(Duration::from_millis(1));
        let mut writer = Recorder::default();
        // two misses: each costs a clock read after the read and one after the pause
        let mut reader = Scripted::new([Ok(0), Ok(0), Ok(Timestamp::SIZE)]);
        let reporter = Reporter::new(1, Some(1), latency_line);

        write_then_read(
            &mut writer,
            &mut reader,
            &clock,
            SyncMode::None,
            Duration::ZERO,
            &reporter,
        )
        .unwrap();
        assert_eq!(reporter.history(), vec![[5.0]]);
    }

    #[test]
    fn test_write_then_read_short_read_aborts_window() {
        let clock = StepClock::new(Duration::from_millis(1));
        let mut writer = Recorder::default();
        let mut reader = Scripted::new([Ok(Timestamp::SIZE), Ok(0), Ok(Timestamp::SIZE - 1)]);
        let reporter = Reporter::new(3, None, latency_line);

        let err = write_then_read(
            &mut writer,
            &mut reader,
            &clock,
            SyncMode::None,
            Duration::ZERO,
            &reporter,
        )
        .unwrap_err();
        assert!(err.to_string().contains("short read"));
        assert_eq!(reporter.pending(), 1);
        assert!(reporter.history().is_empty());
    }

    #[test]
    fn test_short_write_is_fatal() {
        let clock = StepClock::new(Duration::from_millis(1));
        let mut writer = Recorder {
            fail_after: Some(2),
            ..Default::default()
        };

        let err = paced_writer(
            &mut writer,
            &clock,
            64,
            SyncMode::None,
            Duration::ZERO,
            &AtomicBool::new(false),
        )
        .unwrap_err();
        assert!(err.to_string().contains("write(64) = 63"));
        assert_eq!(writer.writes.len(), 2);
    }

    #[test]
    fn test_tail_reader_metrics() {
        let clock = StepClock::new(Duration::from_millis(1));
        let mut pipe = Pipe::default();
        let stop = AtomicBool::new(false);

        // stamped at 1ms, 2ms
        paced_writer_n(&mut pipe, &clock, 2);

        let reporter = Reporter::new(2, Some(1), tailing_line);
        tail_reader(
            &mut pipe,
            &clock,
            32,
            Duration::ZERO,
            &reporter,
            &stop,
        )
        .unwrap();

        // reads: start 3ms / read 4ms, start 5ms / read 6ms
        assert_eq!(reporter.history(), vec![[1.0, 3.5, 0.0]]);
        assert!(stop.load(Ordering::Relaxed));
    }

    fn paced_writer_n(pipe: &mut Pipe, clock: &StepClock, n: usize) {
        let stop = AtomicBool::new(false);
        let mut sink = Limited {
            inner: pipe.clone(),
            left: n,
            stop: &stop,
        };
        paced_writer(&mut sink, clock, 32, SyncMode::None, Duration::ZERO, &stop).unwrap();
    }

    /// Raises `stop` after `left` writes.
    struct Limited<'a> {
        inner: Pipe,
        left: usize,
        stop: &'a AtomicBool,
    }

    impl Sink for Limited<'_> {
        fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.left -= 1;
            if self.left == 0 {
                self.stop.store(true, Ordering::Relaxed);
            }
            self.inner.write_record(buf)
        }

        fn sync(&mut self, mode: SyncMode) -> io::Result<()> {
            self.inner.sync(mode)
        }
    }

    #[test]
    fn test_tail_reader_short_read_raises_stop() {
        let clock = StepClock::new(Duration::from_millis(1));
        let mut reader = Scripted::new([Ok(0), Ok(3)]);
        let stop = AtomicBool::new(false);
        let reporter = Reporter::new(2, None, tailing_line);

        assert!(tail_reader(&mut reader, &clock, 32, Duration::ZERO, &reporter, &stop).is_err());
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn test_tail_concurrently() {
        let pipe = Pipe::default();
        let mut writer = pipe.clone();
        let reporter = Reporter::new(5, Some(2), tailing_line);

        let written = tail_concurrently(
            &mut writer,
            move || Ok(pipe),
            &Monotonic,
            64,
            SyncMode::None,
            Duration::from_micros(50),
            &reporter,
        )
        .unwrap();

        assert!(written >= 10);
        let history = reporter.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().flatten().all(|ms| *ms >= 0.0));
    }

    #[test]
    fn test_tail_concurrently_open_failure() {
        let mut writer = Recorder::default();
        let reporter = Reporter::new(5, Some(1), tailing_line);

        let err = tail_concurrently(
            &mut writer,
            || -> Result<Pipe> { Err(anyhow!("failed to nfs_open(file)")) },
            &Monotonic,
            64,
            SyncMode::None,
            Duration::ZERO,
            &reporter,
        )
        .unwrap_err();
        assert!(err.to_string().contains("nfs_open"));
        assert!(writer.writes.is_empty());
    }
}
