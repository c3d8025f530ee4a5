use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::{
    path::{Path, PathBuf},
    process::Command,
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// A fresh path in the target directory, removed on drop.
pub struct TestPath(PathBuf);

impl TestPath {
    pub fn new() -> Self {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        Self(Path::new(env!("CARGO_TARGET_TMPDIR")).join(format!("latency-{nanos}-{seq}.log")))
    }

    pub fn path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Drop for TestPath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.0.as_path());
    }
}

#[test]
fn test_missing_args() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("nlat-bench-latency")?;
    cmd.assert().failure().code(1);
    Ok(())
}

#[test]
fn test_invalid_url() -> Result<(), Box<dyn std::error::Error>> {
    for url in ["/mnt/nfs/file", "nfs://server", "nfs:///export/file", "nfs://server/export"] {
        let writer = TestPath::new();
        let mut cmd = Command::cargo_bin("nlat-bench-latency")?;
        cmd.arg(writer.path()).arg(url);
        cmd.assert().failure().code(1);

        // nothing is opened for a bad URL
        assert!(!writer.path().exists());
    }
    Ok(())
}

#[test]
fn test_unknown_sync_mode() -> Result<(), Box<dyn std::error::Error>> {
    let writer = TestPath::new();
    let mut cmd = Command::cargo_bin("nlat-bench-latency")?;
    cmd.arg(writer.path())
        .arg("nfs://127.0.0.1/export/file")
        .arg("fsync");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid value 'fsync'"));

    assert!(!writer.path().exists());
    Ok(())
}

#[test]
fn test_setup_failure() -> Result<(), Box<dyn std::error::Error>> {
    let writer = TestPath::new();
    let mut cmd = Command::cargo_bin("nlat-bench-latency")?;
    // either built without NFS support or the export does not exist
    cmd.arg(writer.path())
        .arg("nfs://127.0.0.1/nlat-missing-export/file")
        .arg("dsync");
    cmd.assert()
        .failure()
        .code(10)
        .stdout(predicate::str::contains("server: 127.0.0.1"))
        .stdout(predicate::str::contains("export: /nlat-missing-export"))
        .stdout(predicate::str::contains("path  : file"));

    assert!(writer.path().exists());
    Ok(())
}
