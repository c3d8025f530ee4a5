//! Tailing reads through libnfs, bypassing the kernel NFS client.
use anyhow::{Context, Result};
use libnfs::{Nfs, NfsFile};
use log::debug;
use nix025::fcntl::OFlag;
use std::io;
use std::path::Path;

use crate::error::Setup;
use crate::handle::ReadAt;
use crate::url::NfsUrl;

/// An NFS file opened read-only on its own mounted context, tailed through [`crate::handle::Tail`].
pub struct NfsReader {
    file: NfsFile,
    // keeps the mount alive for as long as the file is open
    _nfs: Nfs,
}

impl NfsReader {
    pub fn open(url: &NfsUrl) -> Result<Self> {
        let mut nfs = Nfs::new().context(Setup("failed to init context".into()))?;
        debug!("mounting {}:{}", url.server, url.export);
        nfs.mount(&url.server, &url.export).with_context(|| {
            Setup(format!(
                "failed to mount nfs share {}:{}",
                url.server, url.export
            ))
        })?;
        let file = nfs
            .open(Path::new(&url.path), OFlag::O_RDONLY)
            .with_context(|| Setup(format!("failed to nfs_open({})", url.path)))?;

        Ok(NfsReader { file, _nfs: nfs })
    }
}

// `NfsFile::read` always reads from offset 0, so tailing goes through `pread`
impl ReadAt for NfsReader {
    fn read_at(&mut self, count: usize, offset: u64) -> io::Result<Vec<u8>> {
        self.file.pread(count as u64, offset)
    }
}
