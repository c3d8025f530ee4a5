//! Benchmark how long a write to a file takes to become readable through libnfs.
//!
//! `WriterFile` and `NfsReaderFile` should be the same file seen through two filesystems: the
//! writer may be local or an NFS mount, the reader is always read with libnfs.
//!
//! # Examples
//! nlat-bench-latency /srv/nfs/log nfs://127.0.0.1/srv/log # benchmark a `write`
//! nlat-bench-latency /srv/nfs/log nfs://127.0.0.1/srv/log dsync # `write` followed by `fdatasync`
//! nlat-bench-latency /srv/nfs/log nfs://127.0.0.1/srv/log sync # `write` followed by `fsync`
//! cnt=100 nlat-bench-latency /srv/nfs/log nfs://127.0.0.1/srv/log --reports 10
use anyhow::Result;
use clap::Parser;
use log::debug;
use nlat::{
    args::parse_micros,
    error::{EXIT_FAILURE, exit_code},
    fs::{OpenFlags, SyncMode, open_writer},
    handle::ReadHandle,
    init_logger,
    record::Monotonic,
    report::{Reporter, latency_line},
    sampler::write_then_read,
    summary,
    url::NfsUrl,
};
use std::{path::PathBuf, process::ExitCode, time::Duration};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logger(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(args: Args) -> Result<()> {
    // parse before touching any file
    let url = NfsUrl::parse(&args.reader)?;

    if args.pin {
        if let Some(cores) = core_affinity::get_core_ids() {
            core_affinity::set_for_current(cores[0]);
        }
    }

    let mut writer = open_writer(&args.writer, OpenFlags::empty())?;
    let mut reader = ReadHandle::open_nfs(&url)?;

    let sync: SyncMode = args.sync.unwrap_or(Flush::None).into();
    debug!("sync mode: {sync:?}, window: {}, poll wait: {:?}", args.cnt, args.wait);

    let reporter = Reporter::new(args.cnt, args.reports, latency_line);
    write_then_read(
        &mut writer,
        &mut reader,
        &Monotonic,
        sync,
        args.wait,
        &reporter,
    )?;

    summary(
        "write-to-read",
        reporter.history().iter().map(|means| means[0]).collect(),
    );
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// file to write timestamps to
    writer: PathBuf,
    /// the same file as nfs://server/export/path
    reader: String,
    /// flush after every write
    #[arg(value_enum)]
    sync: Option<Flush>,
    /// samples per reported average
    #[arg(long, env = "cnt", default_value_t = 1000)]
    cnt: usize,
    /// microseconds to wait after an empty read, 0 spins
    #[arg(long = "wait-us", default_value = "0", value_parser = parse_micros)]
    wait: Duration,
    /// stop after this many reports and print a summary
    #[arg(long)]
    reports: Option<usize>,
    /// pin to the first CPU
    #[arg(long, default_value_t = false)]
    pin: bool,
    /// verbose output
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Flush {
    #[value(name = "nosync")]
    None,
    #[value(name = "dsync")]
    Data,
    #[value(name = "sync")]
    All,
}

impl From<Flush> for SyncMode {
    fn from(value: Flush) -> Self {
        match value {
            Flush::None => SyncMode::None,
            Flush::Data => SyncMode::Data,
            Flush::All => SyncMode::All,
        }
    }
}
