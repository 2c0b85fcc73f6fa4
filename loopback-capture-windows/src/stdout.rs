//! Binary writer over the process's standard output handle.
//!
//! `std::io::Stdout` rejects bytes that are not valid UTF-8 when attached to a
//! console. The stream header and PCM are arbitrary bytes, so this writes the
//! handle directly, the same way for consoles, pipes and files.

use std::fs::File;
use std::io::{self, Write};
use std::mem::ManuallyDrop;
use std::os::windows::io::{AsRawHandle, FromRawHandle, RawHandle};

/// Unbuffered writer on a borrowed handle. Never closes it.
pub struct RawStdout {
    file: ManuallyDrop<File>,
}

impl RawStdout {
    pub fn new() -> Self {
        // The standard output handle lives as long as the process.
        unsafe { Self::from_handle(io::stdout().as_raw_handle()) }
    }

    /// # Safety
    /// `handle` must be a writable handle that stays open while the writer
    /// is in use.
    pub unsafe fn from_handle(handle: RawHandle) -> Self {
        Self {
            file: ManuallyDrop::new(File::from_raw_handle(handle)),
        }
    }
}

impl Default for RawStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for RawStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
