use std::fmt;

/// Exit code for usage, configuration and I/O errors.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code when the benchmark could not be set up (NFS context, mount, open).
pub const EXIT_SETUP: u8 = 10;

/// Context marker for errors raised while setting the benchmark up.
///
/// ```rust
/// use anyhow::{Context, anyhow};
/// use nlat::error::{Setup, exit_code, EXIT_SETUP};
///
/// let err = Err::<(), _>(anyhow!("connection refused"))
///     .context(Setup("failed to mount nfs share".into()))
///     .unwrap_err();
/// assert_eq!(exit_code(&err), EXIT_SETUP);
/// ```
#[derive(Debug)]
pub struct Setup(pub String);

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map an error to the process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<Setup>().is_some() {
        EXIT_SETUP
    } else {
        EXIT_FAILURE
    }
}
