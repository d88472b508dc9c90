//! Property tests for `LineFlushingWriter`: the cached newline position, the
//! byte accounting, and recovery from sinks that stop early.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use proptest::prelude::*;

use lfw::output::{LineFlushingWriter, ShortSink, Sink, WriteResult};

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Vec<u8>>>>);

impl Recorder {
    fn output(&self) -> Vec<u8> {
        self.0.borrow().concat()
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.0.borrow().clone()
    }
}

impl Sink for Recorder {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        self.0.borrow_mut().push(buf.to_vec());
        Ok(buf.len())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn rescan(buf: &[u8]) -> Option<usize> {
    buf.iter().rposition(|&b| b == b'\n')
}

fn chunk() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![b'a', b'b', b'\n']), 0..24)
}

fn chunks() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(chunk(), 0..32)
}

proptest! {
    #[test]
    fn prop_newline_tracking_matches_rescan(
        chunks in chunks(),
        threshold in 1usize..64,
        cap in prop::option::of(1usize..16),
    ) {
        let out = Recorder::default();
        let sink: Box<dyn Sink> = match cap {
            Some(cap) => Box::new(ShortSink::new(out.clone(), cap)),
            None => Box::new(out.clone()),
        };
        let mut lfw = LineFlushingWriter::new(sink, threshold).unwrap();

        for chunk in &chunks {
            let _ = lfw.write(chunk);
            prop_assert_eq!(rescan(lfw.buffered()), lfw.final_newline());
        }
    }

    #[test]
    fn prop_whole_stream_reaches_sink(chunks in chunks(), threshold in 1usize..64) {
        let out = Recorder::default();
        let mut lfw = LineFlushingWriter::new(out.clone(), threshold).unwrap();

        let mut accepted = 0;
        for chunk in &chunks {
            accepted += lfw.write(chunk).unwrap();

            let mut seen = out.output();
            seen.extend_from_slice(lfw.buffered());
            prop_assert_eq!(chunks.concat()[..seen.len()].to_vec(), seen);
        }

        let expected = chunks.concat();
        prop_assert_eq!(expected.len(), accepted);

        let flushes = out.writes();
        for write in &flushes {
            prop_assert_eq!(Some(&b'\n'), write.last());
        }

        lfw.close().unwrap();
        prop_assert_eq!(expected, out.output());
    }

    #[test]
    fn prop_buffers_until_threshold_without_newline(
        chunks in prop::collection::vec(prop::collection::vec(b'a'..=b'z', 0..8), 0..8),
    ) {
        let expected = chunks.concat();
        let out = Recorder::default();
        let mut lfw = LineFlushingWriter::new(out.clone(), expected.len().max(1)).unwrap();

        for chunk in &chunks {
            prop_assert_eq!(chunk.len(), lfw.write(chunk).unwrap());
        }
        prop_assert!(out.writes().is_empty());
        prop_assert_eq!(expected.as_slice(), lfw.buffered());
        prop_assert_eq!(None, lfw.final_newline());
    }

    #[test]
    fn prop_short_write_keeps_buffer_consistent(
        prefix in chunk(),
        data in chunk(),
        threshold in 1usize..32,
        cap in 1usize..16,
    ) {
        let out = Recorder::default();
        let mut lfw = LineFlushingWriter::new(ShortSink::new(out.clone(), cap), threshold).unwrap();

        if lfw.write(&prefix).is_err() {
            // The prefix alone already tripped the short sink.
            return Ok(());
        }
        let flushed_before = out.output().len();
        let buffered_before = lfw.buffered().to_vec();
        let olen = buffered_before.len();

        let mut combined = buffered_before.clone();
        combined.extend_from_slice(&data);

        match lfw.write(&data) {
            Ok(n) => {
                prop_assert_eq!(data.len(), n);
            }
            Err(err) => {
                prop_assert!(err.is_short_write());

                let output = out.output();
                let written = output.len() - flushed_before;
                prop_assert_eq!(&combined[..written], &output[flushed_before..]);
                prop_assert_eq!(written.saturating_sub(olen), err.written());

                if written < olen {
                    prop_assert_eq!(&combined[written..olen], lfw.buffered());
                } else {
                    prop_assert!(lfw.buffered().is_empty());
                }
                prop_assert_eq!(rescan(lfw.buffered()), lfw.final_newline());
            }
        }
    }
}
