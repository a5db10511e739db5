//! Stream capabilities and the generic protocol built on them.
//!
//! [`RawStream`] is the whole surface a higher layer needs: unbuffered
//! `read`/`write` plus `close` and `fileno`. The functions below implement
//! the usual stream verbs (`read(size)`, `readall`, `readline`, line
//! iteration) once, for any implementer, without knowing what sits behind
//! it. Nothing here buffers: `readline` pulls one byte per call so no data
//! past the newline is consumed from the descriptor.

use std::os::fd::RawFd;

use crate::error::StreamError;

/// Chunk size used by [`readall`].
pub const READ_CHUNK: usize = 8192;

/// Minimal byte-stream capability.
pub trait RawStream {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write(&self, buf: &[u8]) -> Result<usize, StreamError>;

    fn close(&self) -> Result<(), StreamError>;

    fn fileno(&self) -> RawFd;
}

impl<S: RawStream + ?Sized> RawStream for &S {
    fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        (**self).write(buf)
    }

    fn close(&self) -> Result<(), StreamError> {
        (**self).close()
    }

    fn fileno(&self) -> RawFd {
        (**self).fileno()
    }
}

/// One read of at most `size` bytes; `None` reads to end of stream.
pub fn read<S: RawStream + ?Sized>(
    stream: &S,
    size: Option<usize>,
) -> Result<Vec<u8>, StreamError> {
    let Some(size) = size else {
        return readall(stream);
    };
    let mut buf = vec![0u8; size];
    let n = stream.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Read until a zero-length read.
pub fn readall<S: RawStream + ?Sized>(stream: &S) -> Result<Vec<u8>, StreamError> {
    let mut out = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&chunk[..n]);
    }
}

/// Read one line, including its `\n`.
///
/// Stops early at end of stream or after `limit` bytes. An empty result
/// means the stream was already exhausted.
pub fn readline<S: RawStream + ?Sized>(
    stream: &S,
    limit: Option<usize>,
) -> Result<Vec<u8>, StreamError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while limit.is_none_or(|max| line.len() < max) {
        if stream.read(&mut byte)? == 0 {
            break;
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    Ok(line)
}

/// One write call; returns the number of bytes accepted.
pub fn write<S: RawStream + ?Sized>(stream: &S, data: &[u8]) -> Result<usize, StreamError> {
    stream.write(data)
}

/// Lazy, forward-only iterator over the lines of a stream.
///
/// Ends at the first empty read. After an error is yielded the iterator
/// is finished; it never restarts.
#[derive(Debug)]
pub struct Lines<S> {
    stream: S,
    done: bool,
}

impl<S: RawStream> Iterator for Lines<S> {
    type Item = Result<Vec<u8>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match readline(&self.stream, None) {
            Ok(line) if line.is_empty() => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<S: RawStream> std::iter::FusedIterator for Lines<S> {}

pub fn lines<S: RawStream>(stream: S) -> Lines<S> {
    Lines {
        stream,
        done: false,
    }
}
