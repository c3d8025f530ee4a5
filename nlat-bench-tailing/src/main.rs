//! Benchmark tailing read latency while a writer keeps appending.
//!
//! The writer appends a timestamped record every `sleepms` milliseconds. A reader thread tails
//! the same file, either through libnfs (`nfs://server/export/path`) or as a local path, and
//! reports the end-to-end, read-after-write and sleep time averaged over `cnt` records.
//!
//! Every option can also be set from the environment, with `atoi` semantics for the switches.
//!
//! # Examples
//! nlat-bench-tailing /srv/nfs/log nfs://10.0.0.2/srv/log # read through libnfs
//! sleepms=0 nlat-bench-tailing /srv/nfs/log nfs://10.0.0.2/srv/log # spin instead of sleeping
//! O_DIRECTR=0 nlat-bench-tailing /srv/nfs/log /mnt/nfs/log # read through the kernel NFS client
//! rwsize=512 dsync=1 O_DSYNC=0 nlat-bench-tailing /srv/nfs/log /mnt/nfs/log # fdatasync per write
use anyhow::Result;
use clap::{ArgAction, Parser};
use log::info;
use nix::fcntl::OFlag;
use nlat::{
    args::{parse_millis, parse_switch},
    error::{EXIT_FAILURE, exit_code},
    fs::{OpenFlags, SyncMode, create_writer},
    handle::ReadHandle,
    init_logger,
    record::{Monotonic, Record},
    report::{Reporter, tailing_line},
    sampler::tail_concurrently,
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
    // a bad URL must not leave a writer file behind
    if NfsUrl::is_nfs(&args.reader) {
        NfsUrl::parse(&args.reader)?;
    }

    let rwsize = Record::clamp_len(args.rwsize);
    println!("=> rwsize: {rwsize}");

    let write_flags = OpenFlags::empty()
        .with(OFlag::O_DSYNC, args.o_dsync)
        .with(OFlag::O_DIRECT, args.o_direct || args.o_directw);
    println!("=> write flags: {write_flags}");
    let mut writer = create_writer(&args.writer, write_flags)?;

    let read_flags = OpenFlags::empty()
        .with(OFlag::O_RSYNC, args.o_rsync)
        .with(OFlag::O_DIRECT, args.o_direct || args.o_directr);
    if !NfsUrl::is_nfs(&args.reader) {
        println!("=> read  flags: {read_flags}");
    }

    let sync = if args.dsync {
        SyncMode::Data
    } else {
        SyncMode::None
    };

    let reporter = Reporter::new(args.cnt, args.reports, tailing_line);
    let location = args.reader.clone();
    let written = tail_concurrently(
        &mut writer,
        move || ReadHandle::open(&location, read_flags),
        &Monotonic,
        rwsize,
        sync,
        args.sleepms,
        &reporter,
    )?;
    info!("wrote {written} records to {}", args.writer.display());

    let history = reporter.history();
    for (i, metric) in ["end-to-end", "read-after-write", "sleep"].iter().enumerate() {
        summary(metric, history.iter().map(|means| means[i]).collect());
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// file to create and append timestamps to, must not exist
    writer: PathBuf,
    /// the same file as nfs://server/export/path or as a local path
    reader: String,
    /// records per reported average
    #[arg(long, env = "cnt", default_value_t = 100)]
    cnt: usize,
    /// milliseconds between writes and after an empty read, 0 spins
    #[arg(long, env = "sleepms", default_value = "10", value_parser = parse_millis)]
    sleepms: Duration,
    /// bytes per record, clamped to [16, 4096]
    #[arg(long, env = "rwsize", default_value_t = 4096)]
    rwsize: usize,
    /// fdatasync after every write
    #[arg(long, env = "dsync", default_value = "0", value_parser = parse_switch, action = ArgAction::Set)]
    dsync: bool,
    /// open the writer with O_DSYNC
    #[arg(long = "o-dsync", env = "O_DSYNC", default_value = "1", value_parser = parse_switch, action = ArgAction::Set)]
    o_dsync: bool,
    /// open both the writer and a local reader with O_DIRECT
    #[arg(long = "o-direct", env = "O_DIRECT", default_value = "0", value_parser = parse_switch, action = ArgAction::Set)]
    o_direct: bool,
    /// open the writer with O_DIRECT
    #[arg(long = "o-directw", env = "O_DIRECTW", default_value = "1", value_parser = parse_switch, action = ArgAction::Set)]
    o_directw: bool,
    /// open a local reader with O_DIRECT
    #[arg(long = "o-directr", env = "O_DIRECTR", default_value = "1", value_parser = parse_switch, action = ArgAction::Set)]
    o_directr: bool,
    /// open a local reader with O_RSYNC
    #[arg(long = "o-rsync", env = "O_RSYNC", default_value = "0", value_parser = parse_switch, action = ArgAction::Set)]
    o_rsync: bool,
    /// stop after this many reports and print a summary
    #[arg(long)]
    reports: Option<usize>,
    /// verbose output
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}
