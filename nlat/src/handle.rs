//! Read and write sides of a benchmark run.
use anyhow::Result;
use log::debug;
use std::fs::File;
use std::io::{self, Read, Write};

use crate::fs::{OpenFlags, SyncMode, open_reader};
use crate::url::NfsUrl;

/// The tailing side: returns whatever new bytes are available.
pub trait Source {
    /// Read up to `buf.len()` new bytes, `Ok(0)` means nothing new arrived yet.
    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// The writing side.
pub trait Sink {
    fn write_record(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn sync(&mut self, mode: SyncMode) -> io::Result<()>;
}

impl Source for File {
    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

/// Reads at an explicit offset without moving any file position.
pub trait ReadAt {
    fn read_at(&mut self, count: usize, offset: u64) -> io::Result<Vec<u8>>;
}

/// Tails a [`ReadAt`] handle by tracking the offset of the next unread byte.
pub struct Tail<R> {
    inner: R,
    offset: u64,
}

impl<R: ReadAt> Tail<R> {
    pub fn new(inner: R) -> Self {
        Tail { inner, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: ReadAt> Source for Tail<R> {
    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.inner.read_at(buf.len(), self.offset)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.offset += n as u64;
        Ok(n)
    }
}

impl Sink for File {
    fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }

    fn sync(&mut self, mode: SyncMode) -> io::Result<()> {
        match mode {
            SyncMode::None => Ok(()),
            SyncMode::Data => self.sync_data(),
            SyncMode::All => self.sync_all(),
        }
    }
}

/// A reader attached either directly to a local file or through the NFS client.
pub enum ReadHandle {
    Local(File),
    #[cfg(feature = "nfs")]
    Remote(Tail<crate::nfs::NfsReader>),
}

impl ReadHandle {
    /// Open `location`, `nfs://` URLs go through the NFS client, anything else is a local path.
    ///
    /// `local_flags` only apply to local paths.
    pub fn open(location: &str, local_flags: OpenFlags) -> Result<Self> {
        if NfsUrl::is_nfs(location) {
            let url = NfsUrl::parse(location)?;
            return Self::open_nfs(&url);
        }

        debug!("opening {location} with {local_flags}");
        let file = open_reader(location, local_flags)?;
        println!("=> native open for read success");
        Ok(ReadHandle::Local(file))
    }

    /// Mount the export of `url` and open its file for reading through the NFS client.
    pub fn open_nfs(url: &NfsUrl) -> Result<Self> {
        println!("=> server: {}", url.server);
        println!("=> export: {}", url.export);
        println!("=> path  : {}", url.path);

        let handle = Self::connect(url)?;
        println!("=> libnfs open for read success");
        Ok(handle)
    }

    #[cfg(feature = "nfs")]
    fn connect(url: &NfsUrl) -> Result<Self> {
        Ok(ReadHandle::Remote(Tail::new(crate::nfs::NfsReader::open(url)?)))
    }

    #[cfg(not(feature = "nfs"))]
    fn connect(url: &NfsUrl) -> Result<Self> {
        use anyhow::Context;
        Err(anyhow::anyhow!("cannot read {url}")).context(crate::error::Setup(
            "built without NFS support, rebuild with `--features nfs`".into(),
        ))
    }
}

impl Source for ReadHandle {
    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ReadHandle::Local(file) => file.read_next(buf),
            #[cfg(feature = "nfs")]
            ReadHandle::Remote(reader) => reader.read_next(buf),
        }
    }
}
