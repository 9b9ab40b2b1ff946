//! The full receive pipeline, from soft 4FSK symbols to stereo audio.
//!
//! Each processing stage runs on its own thread and exchanges batches with
//! its neighbors over double-buffered channels, so a stalled consumer
//! backpressures the whole chain instead of dropping data. The caller feeds
//! symbols into the writer side of the input channel and reads audio (and a
//! pass-through symbol tap for diagnostics) from the readers returned by
//! [`Pipeline::new`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use crate::baseband;
use crate::consts::{CUT_FRAME_BITS, LICH_BITS, PAYLOAD_BYTES, STREAM_PAYLOAD_BITS};
use crate::fec;
use crate::lich::{self, LichAssembler};
use crate::lsf::Lsf;
use crate::receiver::{FrameEvent, FrameReceiver};
use crate::stream::{self, StreamControl, StreamReader, StreamWriter};
use crate::voice::{SharedLiveness, Stereo, VoiceDecoder};

/// Callback invoked with every link setup frame that passes its CRC, whether
/// received standalone or reassembled from LICH chunks.
pub type LsfHandler = Arc<dyn Fn(&Lsf) + Send + Sync>;

trait Stage: Send + 'static {
    /// Process one batch. Returns `false` when a channel was stopped and the
    /// stage should exit.
    fn run(&mut self) -> bool;

    /// Stop downstream channels, so a shutdown observed on the input cascades
    /// through the graph without deadlock.
    fn shutdown(&mut self) {}
}

fn spawn<S: Stage>(mut stage: S) -> JoinHandle<S> {
    thread::spawn(move || {
        while stage.run() {}
        stage.shutdown();
        stage
    })
}

/// Duplicates the symbol stream to the slicer and a diagnostic tap.
struct DoublerStage {
    input: StreamReader<f32>,
    tap: StreamWriter<f32>,
    out: StreamWriter<f32>,
}

impl Stage for DoublerStage {
    fn run(&mut self) -> bool {
        let count = match self.input.take() {
            Some(n) => n,
            None => return false,
        };

        self.tap.buf()[..count].copy_from_slice(self.input.buf());
        self.out.buf()[..count].copy_from_slice(self.input.buf());
        self.input.release();

        self.tap.commit(count) && self.out.commit(count)
    }

    fn shutdown(&mut self) {
        self.tap.control().stop_reader();
        self.out.control().stop_reader();
    }
}

/// Slices each soft symbol into its two hard bits.
struct SlicerStage {
    input: StreamReader<f32>,
    out: StreamWriter<u8>,
}

impl Stage for SlicerStage {
    fn run(&mut self) -> bool {
        let count = match self.input.take() {
            Some(n) => n,
            None => return false,
        };

        let bits = baseband::slice_symbols(&self.input.buf()[..count], self.out.buf());
        self.input.release();

        self.out.commit(bits)
    }

    fn shutdown(&mut self) {
        self.out.control().stop_reader();
    }
}

/// Hunts for frames in the bit stream and routes their sub-fields.
struct DemuxStage {
    input: StreamReader<u8>,
    recv: FrameReceiver,
    lsf_out: StreamWriter<u8>,
    lich_out: StreamWriter<u8>,
    stream_out: StreamWriter<u8>,
    packet_out: StreamWriter<u8>,
}

impl Stage for DemuxStage {
    fn run(&mut self) -> bool {
        let count = match self.input.take() {
            Some(n) => n,
            None => return false,
        };

        for i in 0..count {
            let bit = self.input.buf()[i];

            match self.recv.feed(bit) {
                Some(FrameEvent::LinkSetup(frame)) => {
                    self.lsf_out.buf()[..CUT_FRAME_BITS].copy_from_slice(frame);

                    if !self.lsf_out.commit(CUT_FRAME_BITS) {
                        return false;
                    }
                }
                Some(FrameEvent::Stream { lich, payload }) => {
                    self.lich_out.buf()[..LICH_BITS].copy_from_slice(lich);
                    self.stream_out.buf()[..STREAM_PAYLOAD_BITS].copy_from_slice(payload);

                    if !self.lich_out.commit(LICH_BITS) {
                        return false;
                    }

                    if !self.stream_out.commit(STREAM_PAYLOAD_BITS) {
                        return false;
                    }
                }
                Some(FrameEvent::Packet { lich, payload }) => {
                    self.lich_out.buf()[..LICH_BITS].copy_from_slice(lich);
                    self.packet_out.buf()[..STREAM_PAYLOAD_BITS].copy_from_slice(payload);

                    if !self.lich_out.commit(LICH_BITS) {
                        return false;
                    }

                    if !self.packet_out.commit(STREAM_PAYLOAD_BITS) {
                        return false;
                    }
                }
                None => {}
            }
        }

        true
    }

    fn shutdown(&mut self) {
        self.lsf_out.control().stop_reader();
        self.lich_out.control().stop_reader();
        self.stream_out.control().stop_reader();
        self.packet_out.control().stop_reader();
    }
}

/// Decodes standalone link setup frames and hands them to the callback.
struct LsfStage {
    input: StreamReader<u8>,
    handler: LsfHandler,
}

impl Stage for LsfStage {
    fn run(&mut self) -> bool {
        match self.input.take() {
            Some(n) => assert_eq!(n, CUT_FRAME_BITS),
            None => return false,
        }

        let mut coded = [0; CUT_FRAME_BITS];
        coded.copy_from_slice(self.input.buf());
        self.input.release();

        let bytes = fec::decode_link_setup(&coded);

        match Lsf::decode(&bytes) {
            Ok(lsf) => (self.handler)(&lsf),
            Err(e) => debug!("link setup frame rejected: {}", e),
        }

        true
    }
}

/// Reassembles link setup frames spread over LICH chunks.
struct LichStage {
    input: StreamReader<u8>,
    assembler: LichAssembler,
    handler: LsfHandler,
}

impl Stage for LichStage {
    fn run(&mut self) -> bool {
        match self.input.take() {
            Some(n) => assert_eq!(n, LICH_BITS),
            None => return false,
        }

        let mut coded = [0; LICH_BITS];
        coded.copy_from_slice(self.input.buf());
        self.input.release();

        let chunk = match lich::decode_chunk(&coded) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("lich chunk rejected: {}", e);
                return true;
            }
        };

        if let Some(bytes) = self.assembler.feed(chunk) {
            match Lsf::decode(&bytes) {
                Ok(lsf) => (self.handler)(&lsf),
                Err(e) => debug!("reassembled link setup rejected: {}", e),
            }
        }

        true
    }
}

/// Decodes the coded payload channel of stream frames.
struct PayloadFecStage {
    input: StreamReader<u8>,
    out: StreamWriter<u8>,
}

impl Stage for PayloadFecStage {
    fn run(&mut self) -> bool {
        match self.input.take() {
            Some(n) => assert_eq!(n, STREAM_PAYLOAD_BITS),
            None => return false,
        }

        let mut coded = [0; STREAM_PAYLOAD_BITS];
        coded.copy_from_slice(self.input.buf());
        self.input.release();

        let bytes = fec::decode_stream_payload(&coded);
        self.out.buf()[..PAYLOAD_BYTES].copy_from_slice(&bytes);

        self.out.commit(PAYLOAD_BYTES)
    }

    fn shutdown(&mut self) {
        self.out.control().stop_reader();
    }
}

/// Synthesizes audio from live payload frames.
struct VoiceStage {
    input: StreamReader<u8>,
    decoder: VoiceDecoder,
    out: StreamWriter<Stereo>,
}

impl Stage for VoiceStage {
    fn run(&mut self) -> bool {
        match self.input.take() {
            Some(n) => assert_eq!(n, PAYLOAD_BYTES),
            None => return false,
        }

        let mut frame = [0; PAYLOAD_BYTES];
        frame.copy_from_slice(self.input.buf());
        self.input.release();

        let count = self.decoder.feed(&frame, self.out.buf());

        if count > 0 {
            self.out.commit(count)
        } else {
            true
        }
    }

    fn shutdown(&mut self) {
        self.out.control().stop_reader();
    }
}

/// Consumes and discards a channel with no downstream consumer.
struct NullStage<T: Copy + Send + 'static> {
    input: StreamReader<T>,
}

impl<T: Copy + Send + 'static> Stage for NullStage<T> {
    fn run(&mut self) -> bool {
        self.input.take().is_some()
    }
}

struct Stages {
    doubler: DoublerStage,
    slicer: SlicerStage,
    demux: DemuxStage,
    lsf: LsfStage,
    lich: LichStage,
    payload: PayloadFecStage,
    voice: VoiceStage,
    packet: NullStage<u8>,
}

struct Threads {
    doubler: JoinHandle<DoublerStage>,
    slicer: JoinHandle<SlicerStage>,
    demux: JoinHandle<DemuxStage>,
    lsf: JoinHandle<LsfStage>,
    lich: JoinHandle<LichStage>,
    payload: JoinHandle<PayloadFecStage>,
    voice: JoinHandle<VoiceStage>,
    packet: JoinHandle<NullStage<u8>>,
}

enum Inner {
    Stopped(Box<Stages>),
    Running(Threads),
}

/// A threaded receive pipeline.
pub struct Pipeline {
    inner: Option<Inner>,
    controls: Vec<Box<dyn StreamControl + Send>>,
    liveness: SharedLiveness,
}

impl Pipeline {
    /// Wire up a pipeline reading soft symbols from `input`, with per-side
    /// channel buffers of `capacity` symbols.
    ///
    /// Returns the pipeline along with a pass-through symbol tap and the
    /// stereo audio output. Both returned readers must be drained while the
    /// pipeline runs. `handler` is called for every validated link setup
    /// frame.
    pub fn new(
        input: StreamReader<f32>,
        handler: LsfHandler,
        capacity: usize,
    ) -> (Pipeline, StreamReader<f32>, StreamReader<Stereo>) {
        let liveness = SharedLiveness::new();
        let decoder = VoiceDecoder::new(liveness.clone());
        let samples = decoder.samples_per_payload();

        let (tap_tx, tap_rx) = stream::channel(capacity);
        let (sym_tx, sym_rx) = stream::channel(capacity);
        let (bit_tx, bit_rx) = stream::channel(capacity * 2);
        let (lsf_tx, lsf_rx) = stream::channel(CUT_FRAME_BITS);
        let (lich_tx, lich_rx) = stream::channel(LICH_BITS);
        let (stream_tx, stream_rx) = stream::channel(STREAM_PAYLOAD_BITS);
        let (packet_tx, packet_rx) = stream::channel(STREAM_PAYLOAD_BITS);
        let (frame_tx, frame_rx) = stream::channel(PAYLOAD_BYTES);
        let (audio_tx, audio_rx) = stream::channel(samples);

        let controls: Vec<Box<dyn StreamControl + Send>> = vec![
            Box::new(input.control()),
            Box::new(tap_tx.control()),
            Box::new(sym_tx.control()),
            Box::new(bit_tx.control()),
            Box::new(lsf_tx.control()),
            Box::new(lich_tx.control()),
            Box::new(stream_tx.control()),
            Box::new(packet_tx.control()),
            Box::new(frame_tx.control()),
            Box::new(audio_tx.control()),
        ];

        let stages = Stages {
            doubler: DoublerStage {
                input,
                tap: tap_tx,
                out: sym_tx,
            },
            slicer: SlicerStage {
                input: sym_rx,
                out: bit_tx,
            },
            demux: DemuxStage {
                input: bit_rx,
                recv: FrameReceiver::new(),
                lsf_out: lsf_tx,
                lich_out: lich_tx,
                stream_out: stream_tx,
                packet_out: packet_tx,
            },
            lsf: LsfStage {
                input: lsf_rx,
                handler: handler.clone(),
            },
            lich: LichStage {
                input: lich_rx,
                assembler: LichAssembler::new(),
                handler,
            },
            payload: PayloadFecStage {
                input: stream_rx,
                out: frame_tx,
            },
            voice: VoiceStage {
                input: frame_rx,
                decoder,
                out: audio_tx,
            },
            packet: NullStage { input: packet_rx },
        };

        let pipeline = Pipeline {
            inner: Some(Inner::Stopped(Box::new(stages))),
            controls,
            liveness,
        };

        (pipeline, tap_rx, audio_rx)
    }

    /// Start the stage threads. Does nothing if already running.
    pub fn start(&mut self) {
        match self.inner.take() {
            Some(Inner::Stopped(stages)) => {
                for control in &self.controls {
                    control.clear_write_stop();
                    control.clear_read_stop();
                }

                let s = *stages;

                self.inner = Some(Inner::Running(Threads {
                    doubler: spawn(s.doubler),
                    slicer: spawn(s.slicer),
                    demux: spawn(s.demux),
                    lsf: spawn(s.lsf),
                    lich: spawn(s.lich),
                    payload: spawn(s.payload),
                    voice: spawn(s.voice),
                    packet: spawn(s.packet),
                }));
            }
            other => self.inner = other,
        }
    }

    /// Stop and join the stage threads, leaving the pipeline restartable.
    /// Does nothing if already stopped.
    ///
    /// The stop flags stay set until the next `start`, so outside readers and
    /// writers observe the shutdown instead of blocking.
    pub fn stop(&mut self) {
        match self.inner.take() {
            Some(Inner::Running(threads)) => {
                for control in &self.controls {
                    control.stop_writer();
                    control.stop_reader();
                }

                let stages = Stages {
                    doubler: threads.doubler.join().unwrap(),
                    slicer: threads.slicer.join().unwrap(),
                    demux: threads.demux.join().unwrap(),
                    lsf: threads.lsf.join().unwrap(),
                    lich: threads.lich.join().unwrap(),
                    payload: threads.payload.join().unwrap(),
                    voice: threads.voice.join().unwrap(),
                    packet: threads.packet.join().unwrap(),
                };

                self.inner = Some(Inner::Stopped(Box::new(stages)));
            }
            other => self.inner = other,
        }
    }

    /// Whether a voice stream is currently live.
    pub fn is_receiving(&self) -> bool {
        self.liveness.is_receiving()
    }
}
