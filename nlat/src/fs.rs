use anyhow::{Context, Result};
use nix::fcntl::OFlag;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// How the writer makes a record durable after writing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// plain `write`
    #[default]
    None,
    /// `write` followed by `fdatasync`
    Data,
    /// `write` followed by `fsync`
    All,
}

/// Extra `open(2)` flags on top of the access mode, displayed as `0|O_DIRECT|O_DSYNC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags(pub OFlag);

impl OpenFlags {
    pub fn empty() -> Self {
        OpenFlags(OFlag::empty())
    }

    /// Set `flag` when `on`.
    pub fn with(mut self, flag: OFlag, on: bool) -> Self {
        self.0.set(flag, on);
        self
    }

    pub fn bits(&self) -> i32 {
        self.0.bits()
    }
}

impl fmt::Display for OpenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0")?;
        for (flag, name) in [
            (OFlag::O_DIRECT, "O_DIRECT"),
            (OFlag::O_DSYNC, "O_DSYNC"),
            (OFlag::O_RSYNC, "O_RSYNC"),
        ] {
            // O_RSYNC aliases O_SYNC which contains O_DSYNC on linux
            if self.0.contains(flag) && !(flag == OFlag::O_DSYNC && self.0.contains(OFlag::O_RSYNC))
            {
                write!(f, "|{name}")?;
            }
        }
        Ok(())
    }
}

/// Create the writer file, failing if it already exists.
pub fn create_writer<P: AsRef<Path>>(path: P, flags: OpenFlags) -> Result<File> {
    let path = path.as_ref();
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o777)
        .custom_flags(flags.bits())
        .open(path)
        .map_err(|err| match err.kind() {
            ErrorKind::AlreadyExists => anyhow::anyhow!("file {} exists", path.display()),
            _ => anyhow::Error::new(err).context(format!(
                "open({}, O_CREAT|O_EXCL|O_WRONLY{}) failed",
                path.display(),
                &flags.to_string()[1..]
            )),
        })
}

/// Open the writer file, creating it if needed and keeping existing content.
pub fn open_writer<P: AsRef<Path>>(path: P, flags: OpenFlags) -> Result<File> {
    let path = path.as_ref();
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .mode(0o777)
        .custom_flags(flags.bits())
        .open(path)
        .context(format!("open({}, O_CREAT|O_RDWR, 0777) failed", path.display()))
}

pub fn open_reader<P: AsRef<Path>>(path: P, flags: OpenFlags) -> Result<File> {
    let path = path.as_ref();
    OpenOptions::new()
        .read(true)
        .custom_flags(flags.bits())
        .open(path)
        .context(format!(
            "open({}, O_RDONLY{}) failed",
            path.display(),
            &flags.to_string()[1..]
        ))
}
