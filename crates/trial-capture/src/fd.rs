//! Standard-stream redirection through a pipe.
//!
//! The target descriptor is duplicated, replaced by the write end of a pipe
//! and drained by a reader thread until restore closes the last write end.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{FromRawFd, RawFd};
use std::thread::{self, JoinHandle};

use crate::{CaptureError, Stream};

pub(crate) struct FdRedirect {
    target: RawFd,
    saved: RawFd,
    reader: JoinHandle<io::Result<Vec<u8>>>,
}

fn target_fd(stream: Stream) -> RawFd {
    match stream {
        Stream::Stdout => libc::STDOUT_FILENO,
        Stream::Stderr => libc::STDERR_FILENO,
    }
}

pub(crate) fn flush(stream: Stream) {
    // Flush failures surface on the next write to the restored stream.
    let _ = match stream {
        Stream::Stdout => io::stdout().flush(),
        Stream::Stderr => io::stderr().flush(),
    };
}

fn close(fd: RawFd) {
    // SAFETY: callers only pass descriptors this module opened and still owns.
    unsafe {
        libc::close(fd);
    }
}

impl FdRedirect {
    pub(crate) fn start(stream: Stream) -> Result<Self, CaptureError> {
        let target = target_fd(stream);
        flush(stream);

        let mut fds: [libc::c_int; 2] = [0; 2];
        // SAFETY: `fds` is a valid two-element buffer for pipe(2).
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(CaptureError::Pipe(io::Error::last_os_error()));
        }
        let [read_end, write_end] = fds;

        // SAFETY: `target` is a standard descriptor open for the process lifetime.
        let saved = unsafe { libc::dup(target) };
        if saved < 0 {
            let err = io::Error::last_os_error();
            close(read_end);
            close(write_end);
            return Err(CaptureError::Dup(err));
        }

        // SAFETY: both descriptors are open; dup2 atomically replaces `target`.
        if unsafe { libc::dup2(write_end, target) } < 0 {
            let err = io::Error::last_os_error();
            close(read_end);
            close(write_end);
            close(saved);
            return Err(CaptureError::Dup(err));
        }
        close(write_end);

        // SAFETY: `read_end` came from pipe(2) above and is owned only by this File.
        let mut pipe = unsafe { File::from_raw_fd(read_end) };
        let reader = thread::Builder::new()
            .name("trial-capture".to_string())
            .spawn(move || {
                let mut captured = Vec::new();
                pipe.read_to_end(&mut captured).map(|_| captured)
            });

        match reader {
            Ok(reader) => Ok(Self {
                target,
                saved,
                reader,
            }),
            Err(err) => {
                restore_target(target, saved);
                Err(CaptureError::Reader(err))
            }
        }
    }

    /// Put the original descriptor back and collect everything written.
    pub(crate) fn finish(self, stream: Stream) -> Result<Vec<u8>, CaptureError> {
        flush(stream);
        restore_target(self.target, self.saved);
        self.reader
            .join()
            .map_err(|_| CaptureError::ReaderPanicked)?
            .map_err(CaptureError::Reader)
    }
}

fn restore_target(target: RawFd, saved: RawFd) {
    // SAFETY: `saved` is the duplicate taken in `start`; replacing `target`
    // drops the last write end of the pipe so the reader sees EOF.
    unsafe {
        libc::dup2(saved, target);
    }
    close(saved);
}
