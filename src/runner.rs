use std::io::{self, Read};

use tracing::{debug, info};

use crate::cliopt::CliOpt;
use crate::error::{Error, Result};
use crate::output::{IoSink, LineFlushingWriter, RotatingFile, Sink};

// reader --(copy buffer)--> LineFlushingWriter --(whole lines)--> sink
//
// sink == stdout | RotatingFile

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Bytes read from the input.
    pub read: u64,
    /// Bytes the writer took responsibility for.
    pub written: u64,
}

pub struct Runner<R, S: Sink> {
    reader: R,
    writer: LineFlushingWriter<S>,
    copy_buffer: usize,
}

impl<R: Read, S: Sink> Runner<R, S> {
    pub fn new(reader: R, writer: LineFlushingWriter<S>, copy_buffer: usize) -> Result<Self> {
        if copy_buffer == 0 {
            return Err(Error::invalid_configuration(
                "copy buffer size must be greater than 0",
            ));
        }
        Ok(Self {
            reader,
            writer,
            copy_buffer,
        })
    }

    /// Copies the reader into the writer until EOF or the first error, then
    /// closes the writer. A copy error is reported in favor of a close error.
    pub fn run(mut self) -> Result<Stats> {
        let mut stats = Stats::default();
        let copied = self.copy(&mut stats);
        let closed = self.writer.close();

        info!(read = stats.read, written = stats.written, "copy finished");

        copied?;
        closed?;
        Ok(stats)
    }

    fn copy(&mut self, stats: &mut Stats) -> Result<()> {
        let mut buf = vec![0; self.copy_buffer];
        loop {
            let n = match self.reader.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            stats.read += n as u64;

            match self.writer.write(&buf[..n]) {
                Ok(nw) => stats.written += nw as u64,
                Err(e) => {
                    stats.written += e.written() as u64;
                    debug!(read = n, written = e.written(), "copy interrupted by sink error");
                    return Err(e.into());
                }
            }
        }
    }
}

/// The sink `opt` asks for: a rotating log file, or standard output.
pub fn open_sink(opt: &CliOpt) -> Result<Box<dyn Sink>> {
    match &opt.output {
        Some(path) => Ok(Box::new(RotatingFile::open(
            path,
            opt.max_size,
            opt.max_backups,
        )?)),
        None => Ok(Box::new(IoSink::new(io::stdout()))),
    }
}
