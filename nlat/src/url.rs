use anyhow::{Result, bail, ensure};
use std::fmt;

pub const SCHEME: &str = "nfs://";

/// An `nfs://server/export/path` location. Ports are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsUrl {
    pub server: String,
    /// export name, always starts with `/`
    pub export: String,
    /// file path relative to the export
    pub path: String,
}

impl NfsUrl {
    /// Split `url` into server, export and in-export path.
    ///
    /// The export is the first path component after the server, everything after it is the file
    /// path.
    ///
    /// # Examples
    /// ```rust
    /// use nlat::url::NfsUrl;
    ///
    /// let url = NfsUrl::parse("nfs://10.0.0.1/srv/logs/app.log").unwrap();
    /// assert_eq!(url.server, "10.0.0.1");
    /// assert_eq!(url.export, "/srv");
    /// assert_eq!(url.path, "logs/app.log");
    /// ```
    pub fn parse<S: AsRef<str>>(url: S) -> Result<Self> {
        let url = url.as_ref();
        let Some(rest) = url.strip_prefix(SCHEME) else {
            bail!("invalid URL `{url}`, expected {SCHEME}server/export/path");
        };
        ensure!(
            !rest.is_empty() && !rest.starts_with('/'),
            "invalid server string in `{url}`"
        );

        let Some((server, tail)) = rest.split_once('/') else {
            bail!("invalid URL `{url}`, missing export after the server");
        };
        let (export, path) = tail.split_once('/').unwrap_or((tail, ""));
        ensure!(!export.is_empty(), "invalid URL `{url}`, empty export");
        ensure!(!path.is_empty(), "bad path in `{url}`, no file inside the export");

        Ok(NfsUrl {
            server: server.to_string(),
            export: format!("/{export}"),
            path: path.to_string(),
        })
    }

    /// Whether `s` names an NFS location at all.
    pub fn is_nfs<S: AsRef<str>>(s: S) -> bool {
        s.as_ref().starts_with(SCHEME)
    }
}

impl fmt::Display for NfsUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}{}/{}", self.server, self.export, self.path)
    }
}
