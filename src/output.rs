//! Per-thread dump destinations
//!
//! Every thread owns one summary file, created eagerly at initialization so
//! that overflow markers can be written as they happen. Names carry the
//! process and thread ids plus a suffix that is bumped until an exclusive
//! create succeeds; stale files from a recycled pid/tid pair are never
//! clobbered.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{getpid, gettid};

use crate::call_site::CallSite;
use crate::fork::in_recovery;

/// Process and kernel thread id of the calling thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadIds {
    pub pid: i32,
    pub tid: i32,
}

impl ThreadIds {
    pub fn current() -> Self {
        ThreadIds {
            pid: getpid().as_raw(),
            tid: gettid().as_raw(),
        }
    }

    /// PRNG seed derived from the ids
    pub fn seed(&self) -> u64 {
        (self.pid as u64).wrapping_mul(self.tid as u64)
    }
}

/// Summary file name for a given suffix
pub fn summary_file_name(ids: ThreadIds, suffix: u64) -> String {
    format!("{}.{}.{}.im.out", ids.pid, ids.tid, suffix)
}

/// Latency file name for one `from -> to` transition
pub fn latency_file_name(from: CallSite, to: CallSite, ids: ThreadIds) -> String {
    format!(
        "event-flat-{}:{}-{}:{}-{}-{}-im",
        from.file, from.line, to.file, to.line, ids.pid, ids.tid
    )
}

/// An open summary file
#[derive(Debug)]
pub struct SummarySink {
    file: File,
    path: PathBuf,
    write_error_logged: bool,
}

impl SummarySink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `text`, logging the first failure and ignoring the rest
    pub fn write_str(&mut self, text: &str) {
        if let Err(e) = self.file.write_all(text.as_bytes()) {
            if !self.write_error_logged {
                tracing::warn!("could not write to {}: {}", self.path.display(), e);
                self.write_error_logged = true;
            }
        }
    }

    pub(crate) fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

/// Lifecycle of a thread's dump destination
#[derive(Debug, Default)]
pub enum OutputHandle {
    /// Never opened, or invalidated after fork
    #[default]
    Unopened,
    Open(SummarySink),
    /// Open was attempted and failed with something other than a collision
    Failed,
    /// Dump written; further dumps are no-ops
    Finalized,
}

impl OutputHandle {
    /// Create `<dir>/<pid>.<tid>.<n>.im.out` with the first free `n`
    pub fn open(dir: &Path, ids: ThreadIds) -> Self {
        for suffix in 0u64.. {
            let path = dir.join(summary_file_name(ids, suffix));
            match create_exclusive(&path) {
                Ok(file) => {
                    if !in_recovery() {
                        tracing::debug!("tracing thread {} to {}", ids.tid, path.display());
                    }
                    return OutputHandle::Open(SummarySink {
                        file,
                        path,
                        write_error_logged: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    // the failure resurfaces at dump time as a missing summary
                    if !in_recovery() {
                        tracing::warn!("could not open trace file {}: {}", path.display(), e);
                    }
                    return OutputHandle::Failed;
                }
            }
        }
        OutputHandle::Failed
    }

    pub fn is_open(&self) -> bool {
        matches!(self, OutputHandle::Open(_))
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, OutputHandle::Finalized)
    }

    /// Path of the open summary file
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputHandle::Open(sink) => Some(sink.path()),
            _ => None,
        }
    }

    pub fn sink_mut(&mut self) -> Option<&mut SummarySink> {
        match self {
            OutputHandle::Open(sink) => Some(sink),
            _ => None,
        }
    }

    /// Mark finalized, handing back the open sink (if any) for the last write
    pub fn finalize(&mut self) -> Option<SummarySink> {
        match std::mem::replace(self, OutputHandle::Finalized) {
            OutputHandle::Open(sink) => Some(sink),
            _ => None,
        }
    }
}

fn create_exclusive(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

/// Create (or truncate) a latency file
pub fn create_latency_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}
