//! Line capture for stdout, stderr and in-process writers.
//!
//! A [`Capture`] starts redirecting on construction and restores the original
//! destination exactly once: on the first read, or on drop.
//!
//! ```no_run
//! use std::io::Write;
//! use trial_capture::{Capture, Stream};
//!
//! let mut capture = Capture::start(Stream::Stdout)?;
//! writeln!(std::io::stdout(), "hello")?;
//! assert_eq!(capture.read_lines()?, ["hello"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[allow(unsafe_code)]
mod fd;

use std::cell::Cell;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use crate::fd::FdRedirect;

/// Process-wide output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Destination that can be swapped out while a capture is active.
pub trait Redirect {
    /// Install `writer` and return the writer it replaces.
    fn redirect(&self, writer: Box<dyn Write + Send>) -> Box<dyn Write + Send>;
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("pipe: {0}")]
    Pipe(io::Error),
    #[error("dup: {0}")]
    Dup(io::Error),
    #[error("capture reader: {0}")]
    Reader(io::Error),
    #[error("capture reader thread panicked")]
    ReaderPanicked,
    #[error("{0:?} is already captured on this thread")]
    AlreadyCapturing(Stream),
}

// One descriptor capture per stream at a time; tests run on many threads.
static STDOUT_LOCK: Mutex<()> = parking_lot::const_mutex(());
static STDERR_LOCK: Mutex<()> = parking_lot::const_mutex(());

thread_local! {
    // Streams whose lock this thread holds; re-locking would deadlock.
    static HELD: Cell<[bool; 2]> = const { Cell::new([false; 2]) };
}

impl Stream {
    const fn slot(self) -> usize {
        match self {
            Self::Stdout => 0,
            Self::Stderr => 1,
        }
    }
}

/// Exclusive use of one process stream by the current thread.
struct StreamLock {
    stream: Stream,
    _guard: MutexGuard<'static, ()>,
}

impl StreamLock {
    fn acquire(stream: Stream) -> Result<Self, CaptureError> {
        if HELD.get()[stream.slot()] {
            return Err(CaptureError::AlreadyCapturing(stream));
        }
        let guard = match stream {
            Stream::Stdout => STDOUT_LOCK.lock(),
            Stream::Stderr => STDERR_LOCK.lock(),
        };
        set_held(stream, true);
        Ok(Self {
            stream,
            _guard: guard,
        })
    }
}

impl Drop for StreamLock {
    fn drop(&mut self) {
        set_held(self.stream, false);
    }
}

fn set_held(stream: Stream, held: bool) {
    let mut slots = HELD.get();
    slots[stream.slot()] = held;
    HELD.set(slots);
}

/// In-memory sink shared between the capture and the redirected target.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum Active {
    Fd {
        redirect: FdRedirect,
        lock: StreamLock,
    },
    Writer {
        target: Box<dyn Redirect + Send>,
        previous: Box<dyn Write + Send>,
        buffer: SharedBuffer,
    },
}

/// An active (or finished) capture.
pub struct Capture {
    active: Option<Active>,
    lines: Option<Vec<String>>,
}

impl Capture {
    /// Redirect a process stream into the capture.
    ///
    /// Waits while another thread captures the same stream; fails with
    /// [`CaptureError::AlreadyCapturing`] if this thread already does.
    pub fn start(stream: Stream) -> Result<Self, CaptureError> {
        let lock = StreamLock::acquire(stream)?;
        let redirect = FdRedirect::start(stream)?;
        Ok(Self {
            active: Some(Active::Fd { redirect, lock }),
            lines: None,
        })
    }

    /// Redirect an in-process writer (for example a trial log handle).
    pub fn redirect<R>(target: &R) -> Self
    where
        R: Redirect + Clone + Send + 'static,
    {
        let buffer = SharedBuffer::default();
        let previous = target.redirect(Box::new(buffer.clone()));
        Self {
            active: Some(Active::Writer {
                target: Box::new(target.clone()),
                previous,
                buffer,
            }),
            lines: None,
        }
    }

    /// Whether the original destination is still redirected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Stop capturing (first call only) and return the text, lines joined
    /// with `\n` and no trailing newline.
    pub fn read_all(&mut self) -> Result<String, CaptureError> {
        Ok(self.read_lines()?.join("\n"))
    }

    /// Stop capturing (first call only) and return the captured lines.
    pub fn read_lines(&mut self) -> Result<Vec<String>, CaptureError> {
        if let Some(lines) = &self.lines {
            return Ok(lines.clone());
        }
        let bytes = self.restore()?;
        let lines: Vec<String> = String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect();
        self.lines = Some(lines.clone());
        Ok(lines)
    }

    fn restore(&mut self) -> Result<Vec<u8>, CaptureError> {
        match self.active.take() {
            None => Ok(Vec::new()),
            Some(Active::Fd { redirect, lock }) => redirect.finish(lock.stream),
            Some(Active::Writer {
                target,
                previous,
                buffer,
            }) => {
                drop(target.redirect(previous));
                Ok(buffer.take())
            }
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        // Nothing left to report to; restoring is what matters.
        let _ = self.restore();
    }
}
