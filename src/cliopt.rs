use std::path::PathBuf;

use structopt::StructOpt;

use crate::utils::size::parse_size;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "lfw",
    about = "Copies standard input to standard output or a rotating log file, one whole line at a time"
)]
pub struct CliOpt {
    /// Flush completed lines once this many bytes are buffered.
    #[structopt(long = "threshold", short = "t", default_value = "16KiB", parse(try_from_str = parse_size))]
    pub threshold: usize,

    /// Size of the buffer standard input is read with.
    #[structopt(long = "copy-buffer", short = "b", default_value = "32KiB", parse(try_from_str = parse_size))]
    pub copy_buffer: usize,

    /// Write to this log file instead of standard output.
    #[structopt(long = "output", short = "o", parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// Rotate the log file before it grows past this size.
    #[structopt(long = "max-size", default_value = "100MiB", parse(try_from_str = parse_size))]
    pub max_size: usize,

    /// Rotated log files to keep; 0 keeps all of them.
    #[structopt(long = "max-backups", default_value = "0")]
    pub max_backups: usize,

    /// More output on standard error (-v, -vv, -vvv).
    #[structopt(long = "verbose", short = "v", parse(from_occurrences))]
    pub verbose: u8,
}

impl CliOpt {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
