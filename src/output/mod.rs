mod rotate;
mod sink;
mod writer;

pub use rotate::RotatingFile;
pub use sink::{IoSink, ShortSink, Sink, WriteResult};
pub use writer::LineFlushingWriter;
