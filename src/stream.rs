//! Double-buffered handoff channels connecting pipeline stages.
//!
//! Each channel moves fixed-capacity batches of samples between exactly one
//! producer and one consumer, with a single batch in flight: the writer fills
//! its buffer and `commit`s, the reader `take`s the batch and `release`s the
//! buffer back when done. A slow consumer therefore stalls its producer
//! instead of queueing without bound, and no batch is ever read twice or
//! dropped silently.
//!
//! The two buffers exchange ownership through `Option` slots under a single
//! mutex, so the writer and reader sides are never aliased.

use std::sync::{Arc, Condvar, Mutex};

/// Default per-side buffer capacity, in elements.
pub const DEFAULT_CAPACITY: usize = 1_000_000;

/// Lifecycle operations independent of the element type, so heterogeneous
/// channels can be stopped and reset through one control path.
///
/// Stop flags are sticky and idempotent: once set, the affected call returns
/// its failure sentinel immediately (waking any blocked caller) until the flag
/// is cleared again.
pub trait StreamControl {
    /// Make `commit` fail immediately.
    fn stop_writer(&self);
    /// Allow `commit` to proceed again.
    fn clear_write_stop(&self);
    /// Make `take` fail immediately.
    fn stop_reader(&self);
    /// Allow `take` to proceed again.
    fn clear_read_stop(&self);
}

struct State<T> {
    /// Committed batch waiting for the reader, with its length.
    data: Option<(Vec<T>, usize)>,
    /// Released buffer waiting for the writer.
    spare: Option<Vec<T>>,
    writer_stop: bool,
    reader_stop: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    /// Signaled when `spare` becomes available or the writer is stopped.
    swap: Condvar,
    /// Signaled when `data` becomes available or the reader is stopped.
    ready: Condvar,
}

/// Create a channel whose buffers hold up to `capacity` elements.
pub fn channel<T: Copy + Default>(capacity: usize) -> (StreamWriter<T>, StreamReader<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            data: None,
            spare: Some(vec![T::default(); capacity]),
            writer_stop: false,
            reader_stop: false,
        }),
        swap: Condvar::new(),
        ready: Condvar::new(),
    });

    (
        StreamWriter {
            buf: vec![T::default(); capacity],
            shared: shared.clone(),
        },
        StreamReader {
            batch: None,
            shared,
        },
    )
}

/// Producer side of a channel.
pub struct StreamWriter<T> {
    buf: Vec<T>,
    shared: Arc<Shared<T>>,
}

impl<T: Copy> StreamWriter<T> {
    /// Buffer to fill with the next batch.
    pub fn buf(&mut self) -> &mut [T] {
        &mut self.buf[..]
    }

    /// Publish the first `len` elements of the write buffer, blocking until
    /// the reader has released the previous batch.
    ///
    /// Returns `false` if the writer was stopped while waiting, in which case
    /// the batch is abandoned.
    pub fn commit(&mut self, len: usize) -> bool {
        assert!(len <= self.buf.len());

        let mut state = self.shared.state.lock().unwrap();

        while state.spare.is_none() && !state.writer_stop {
            state = self.shared.swap.wait(state).unwrap();
        }

        if state.writer_stop {
            return false;
        }

        let spare = state.spare.take().unwrap();
        let full = std::mem::replace(&mut self.buf, spare);
        state.data = Some((full, len));
        drop(state);

        self.shared.ready.notify_all();

        true
    }

    /// Control handle for this channel.
    pub fn control(&self) -> StreamHandle<T> {
        StreamHandle {
            shared: self.shared.clone(),
        }
    }
}

/// Consumer side of a channel.
pub struct StreamReader<T> {
    batch: Option<(Vec<T>, usize)>,
    shared: Arc<Shared<T>>,
}

impl<T: Copy> StreamReader<T> {
    /// Block until a batch is committed and return its length, or `None` if
    /// the reader was stopped while waiting. Any batch still held from a
    /// previous `take` is released first.
    pub fn take(&mut self) -> Option<usize> {
        if self.batch.is_some() {
            self.release();
        }

        let mut state = self.shared.state.lock().unwrap();

        while state.data.is_none() && !state.reader_stop {
            state = self.shared.ready.wait(state).unwrap();
        }

        if state.reader_stop {
            return None;
        }

        let batch = state.data.take().unwrap();
        let len = batch.1;
        self.batch = Some(batch);

        Some(len)
    }

    /// Elements of the batch returned by the most recent `take`.
    pub fn buf(&self) -> &[T] {
        match self.batch {
            Some((ref buf, len)) => &buf[..len],
            None => &[],
        }
    }

    /// Hand the batch buffer back to the writer.
    pub fn release(&mut self) {
        if let Some((buf, _)) = self.batch.take() {
            let mut state = self.shared.state.lock().unwrap();
            state.spare = Some(buf);
            drop(state);

            self.shared.swap.notify_all();
        }
    }

    /// Control handle for this channel.
    pub fn control(&self) -> StreamHandle<T> {
        StreamHandle {
            shared: self.shared.clone(),
        }
    }
}

/// Cloneable control handle for a channel.
pub struct StreamHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for StreamHandle<T> {
    fn clone(&self) -> Self {
        StreamHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<T> StreamControl for StreamHandle<T> {
    fn stop_writer(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.writer_stop = true;
        drop(state);

        self.shared.swap.notify_all();
    }

    fn clear_write_stop(&self) {
        self.shared.state.lock().unwrap().writer_stop = false;
    }

    fn stop_reader(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.reader_stop = true;
        drop(state);

        self.shared.ready.notify_all();
    }

    fn clear_read_stop(&self) {
        self.shared.state.lock().unwrap().reader_stop = false;
    }
}
