use std::io::{self, Write};

use crate::error::{short_write, PartialWrite};

pub type WriteResult = std::result::Result<usize, PartialWrite>;

/// Something bytes can be written to and that must be closed when done.
///
/// `write` may take fewer bytes than offered. A short count in `Ok` is
/// taken at face value; a short count that comes with an error is reported
/// as `Err(PartialWrite)`. A sink never reports more bytes than it was given.
pub trait Sink {
    fn write(&mut self, buf: &[u8]) -> WriteResult;
    fn close(&mut self) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        (**self).write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        (**self).write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Adapts any `io::Write` into a `Sink`. Closing flushes the inner writer.
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for IoSink<W> {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        let mut written = 0;
        while written < buf.len() {
            match self.inner.write(&buf[written..]) {
                Ok(0) => return Err(PartialWrite::new(written, short_write())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(PartialWrite::new(written, e)),
            }
        }
        Ok(written)
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Caps every write at `max` bytes and reports a short write whenever it had
/// to cut one. Handy for exercising partial-write recovery.
#[derive(Debug)]
pub struct ShortSink<S> {
    inner: S,
    max: usize,
}

impl<S: Sink> ShortSink<S> {
    pub fn new(inner: S, max: usize) -> Self {
        Self { inner, max }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sink> Sink for ShortSink<S> {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        if buf.len() <= self.max {
            return self.inner.write(buf);
        }
        let n = self.inner.write(&buf[..self.max])?;
        Err(PartialWrite::new(n, short_write()))
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}
