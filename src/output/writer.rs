use std::io;

use tracing::{debug, warn};

use super::sink::{Sink, WriteResult};
use crate::error::{closed, Error, PartialWrite, Result};

const LF: u8 = b'\n';

/// Buffers output so that the underlying sink only ever receives whole lines.
///
/// Bytes accumulate in memory until the buffer grows past `flush_threshold`
/// and holds at least one line feed. Everything up to and including the final
/// line feed is then handed to the sink; the trailing partial line stays
/// buffered. `close` writes whatever is left, partial line included, and
/// closes the sink.
///
/// ```
/// use lfw::output::{IoSink, LineFlushingWriter};
///
/// let mut lfw = LineFlushingWriter::new(IoSink::new(Vec::new()), 8)?;
/// lfw.write(b"line 1\n")?;
/// lfw.write(b"line 2\nline")?;
/// lfw.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct LineFlushingWriter<S: Sink> {
    buf: Vec<u8>,
    sink: Option<S>,
    flush_threshold: usize,
    final_newline: Option<usize>,
}

impl<S: Sink> LineFlushingWriter<S> {
    pub fn new(sink: S, flush_threshold: usize) -> Result<Self> {
        if flush_threshold == 0 {
            return Err(Error::invalid_configuration(format!(
                "cannot create line-flushing writer when flush threshold less than or equal to 0: {}",
                flush_threshold
            )));
        }
        Ok(Self {
            buf: Vec::new(),
            sink: Some(sink),
            flush_threshold,
            final_newline: None,
        })
    }

    #[inline]
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Bytes accepted but not yet handed to the sink.
    #[inline]
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Offset of the last line feed in `buffered()`.
    #[inline]
    pub fn final_newline(&self) -> Option<usize> {
        self.final_newline
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    pub fn get_ref(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Appends `data`, flushing through the final line feed once the buffer
    /// is over the threshold.
    ///
    /// On success the whole of `data` is accounted for. On error the returned
    /// `PartialWrite` says how many bytes of `data` the sink took; the rest of
    /// `data` is not kept and may be offered again.
    pub fn write(&mut self, data: &[u8]) -> WriteResult {
        if self.sink.is_none() {
            return Err(PartialWrite::new(0, closed()));
        }

        let olen = self.buf.len();
        self.buf.extend_from_slice(data);

        if let Some(i) = data.iter().rposition(|&b| b == LF) {
            self.final_newline = Some(olen + i);
        }

        match self.final_newline {
            Some(i) if self.buf.len() > self.flush_threshold => {
                self.flush_lines(olen, data.len(), i + 1)
            }
            _ => Ok(data.len()),
        }
    }

    fn flush_lines(&mut self, olen: usize, dlen: usize, index: usize) -> WriteResult {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            None => return Err(PartialWrite::new(0, closed())),
        };

        let (nw, err) = match sink.write(&self.buf[..index]) {
            Ok(nw) => (nw, None),
            Err(err) => (err.written(), Some(err)),
        };
        self.buf.drain(..nw.min(self.buf.len()));

        let err = match err {
            None => {
                debug!(flushed = nw, buffered = self.buf.len(), "flushed lines");
                self.final_newline = self.final_newline.and_then(|i| i.checked_sub(nw));
                return Ok(dlen);
            }
            Some(err) => err,
        };

        // Only the part of `data` that made it out counts as written. Whatever
        // of `data` did not is dropped so the caller can resubmit it.
        let nb = match nw.checked_sub(olen) {
            Some(nb) => {
                self.buf.clear();
                nb
            }
            None => {
                self.buf.truncate(olen - nw);
                0
            }
        };
        self.final_newline = self.buf.iter().rposition(|&b| b == LF);

        warn!(
            requested = index,
            flushed = nw,
            accepted = nb,
            error = %err,
            "sink write stopped early"
        );
        Err(err.with_written(nb))
    }

    /// Writes everything still buffered, including a trailing partial line,
    /// then closes the sink.
    ///
    /// A failed write wins over a failed close. The writer is unusable
    /// afterwards either way.
    pub fn close(&mut self) -> io::Result<()> {
        let mut sink = self.sink.take().ok_or_else(closed)?;

        let buf = std::mem::take(&mut self.buf);
        self.final_newline = None;

        let we = if buf.is_empty() {
            Ok(0)
        } else {
            debug!(flushed = buf.len(), "flushing remainder on close");
            sink.write(&buf)
        };
        let ce = sink.close();

        we?;
        ce
    }
}

impl<S: Sink> Sink for LineFlushingWriter<S> {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        LineFlushingWriter::write(self, buf)
    }

    fn close(&mut self) -> io::Result<()> {
        LineFlushingWriter::close(self)
    }
}

impl<S: Sink> io::Write for LineFlushingWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match LineFlushingWriter::write(self, buf) {
            Ok(n) => Ok(n),
            Err(err) if err.written() > 0 => Ok(err.written()),
            Err(err) => Err(err.into_error()),
        }
    }

    /// Partial lines are never flushed, so there is nothing to do here.
    fn flush(&mut self) -> io::Result<()> {
        if self.is_closed() {
            return Err(closed());
        }
        Ok(())
    }
}

impl<S: Sink> Drop for LineFlushingWriter<S> {
    fn drop(&mut self) {
        if self.sink.is_none() || std::thread::panicking() {
            return;
        }
        if let Err(err) = self.close() {
            warn!(error = %err, "closing line-flushing writer on drop failed");
        }
    }
}
