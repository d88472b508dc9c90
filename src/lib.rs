//! Buffered writing that hands only whole lines to the underlying sink.
//!
//! [`LineFlushingWriter`](output::LineFlushingWriter) sits in front of any
//! [`Sink`](output::Sink) (standard output, a [`RotatingFile`](output::RotatingFile),
//! another writer) and defers output until it can flush complete lines.

pub mod cliopt;
pub mod error;
pub mod output;
pub mod runner;
pub mod utils;
