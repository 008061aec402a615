//! Real-time render driver.
//!
//! [`LiveRenderer`] runs inside the audio callback. It owns the processing
//! graph and pulls the source through it in [`CONTROL_FRAME`] blocks, so
//! parameter updates land on block boundaries and the output is identical
//! to an offline render of the same source and parameters. In steady state
//! it never allocates, locks or frees:
//!
//! - updates arrive fully prepared from [`LiveController`], which owns an
//!   [`UpdatePlanner`] mirroring the graph
//! - whatever an update displaces goes back to the controller to be dropped
//! - metering frames come from a fixed pool (see [`crate::metering`])

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use remaster_analysis::spectrum::FFT_SIZE;
use remaster_config::MasteringParams;
use remaster_core::AudioBuffer;
use remaster_effects::{CONTROL_FRAME, GraphUpdate, ProcessingGraph, UpdatePlanner};

use crate::metering::{MeterReader, TAP_RATE_HZ, TapSender, tap_channel};
use crate::{Error, Result};

const COMMAND_CAPACITY: usize = 64;

/// Room for every update in the command queue plus one sent right after a
/// collection, so handing a displaced update back never fails while the
/// controller is alive. [`LiveController::update`] collects before sending,
/// which keeps the uncollected count within this bound.
const RETIRED_CAPACITY: usize = COMMAND_CAPACITY + 1;

enum Command {
    Update(Box<GraphUpdate>),
    Play,
    Pause,
    Restart,
}

/// State shared between the renderer and its controller.
#[derive(Debug, Default)]
struct Transport {
    position: AtomicUsize,
    playing: AtomicBool,
    finished: AtomicBool,
}

/// Wire a graph and its source into a renderer, its controller and a meter
/// reader.
pub fn connect(
    graph: ProcessingGraph,
    source: Arc<AudioBuffer>,
) -> Result<(LiveRenderer, LiveController, MeterReader)> {
    if graph.num_channels() != source.num_channels() {
        return Err(remaster_effects::GraphError::ChannelMismatch {
            expected: graph.num_channels(),
            actual: source.num_channels(),
        }
        .into());
    }
    let sample_rate = graph.sample_rate();
    let planner = graph.planner();
    let (command_tx, command_rx) = bounded(COMMAND_CAPACITY);
    let (retired_tx, retired_rx) = bounded(RETIRED_CAPACITY);
    let (taps, meter) = tap_channel(sample_rate as f32);
    let transport = Arc::new(Transport::default());

    let block = AudioBuffer::new(source.num_channels(), CONTROL_FRAME, sample_rate)
        .map_err(|e| Error::Stream(e.to_string()))?;

    let renderer = LiveRenderer {
        graph,
        source,
        block,
        cursor: CONTROL_FRAME,
        position: 0,
        playing: false,
        restarted: true,
        commands: command_rx,
        retired: retired_tx,
        taps,
        pre_ring: vec![0.0; FFT_SIZE],
        post_ring: vec![0.0; FFT_SIZE],
        ring_pos: 0,
        tap_interval: (sample_rate / TAP_RATE_HZ).max(1) as usize,
        since_tap: 0,
        transport: Arc::clone(&transport),
    };
    let controller = LiveController {
        commands: command_tx,
        retired: retired_rx,
        planner,
        transport,
        sample_rate,
    };
    Ok((renderer, controller, meter))
}

/// Audio-thread side of live playback.
pub struct LiveRenderer {
    graph: ProcessingGraph,
    source: Arc<AudioBuffer>,
    block: AudioBuffer,
    cursor: usize,
    position: usize,
    playing: bool,
    restarted: bool,
    commands: Receiver<Command>,
    retired: Sender<Box<GraphUpdate>>,
    taps: TapSender,
    pre_ring: Vec<f32>,
    post_ring: Vec<f32>,
    ring_pos: usize,
    tap_interval: usize,
    since_tap: usize,
    transport: Arc<Transport>,
}

impl std::fmt::Debug for LiveRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveRenderer")
            .field("position", &self.position)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}

impl LiveRenderer {
    /// Fill an interleaved output buffer of `out_channels` channels.
    ///
    /// Output channel `c` carries graph channel `c % num_channels`. Silence
    /// is written while paused or after the end of the source.
    pub fn render(&mut self, out: &mut [f32], out_channels: usize) {
        self.drain_commands();
        let n = self.block.num_channels();
        for frame in out.chunks_mut(out_channels.max(1)) {
            if self.cursor == CONTROL_FRAME {
                if !self.playing {
                    frame.fill(0.0);
                    continue;
                }
                self.next_block();
            }
            for (c, s) in frame.iter_mut().enumerate() {
                *s = self.block.channel(c % n)[self.cursor];
            }
            self.cursor += 1;
        }
    }

    /// Source position in frames.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The graph being rendered.
    pub fn graph(&self) -> &ProcessingGraph {
        &self.graph
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Update(mut update) => {
                    let incoming = std::mem::take(&mut *update);
                    *update = self.graph.apply_update(incoming);
                    let _ = self.retired.try_send(update);
                }
                Command::Play => {
                    if self.position >= self.source.frames() {
                        self.restart();
                    }
                    self.playing = true;
                }
                Command::Pause => self.playing = false,
                Command::Restart => self.restart(),
            }
        }
        self.transport.playing.store(self.playing, Ordering::Release);
    }

    fn restart(&mut self) {
        self.position = 0;
        self.cursor = CONTROL_FRAME;
        self.graph.reset();
        self.pre_ring.fill(0.0);
        self.post_ring.fill(0.0);
        self.since_tap = 0;
        self.restarted = true;
        self.transport.position.store(0, Ordering::Release);
        self.transport.finished.store(false, Ordering::Release);
    }

    fn next_block(&mut self) {
        self.block.copy_from(&self.source, self.position, CONTROL_FRAME);
        let count = self.block.frames();
        self.block.set_frames(CONTROL_FRAME);

        push_mono(&self.block, &mut self.pre_ring, self.ring_pos);
        if self.graph.process(&mut self.block).is_err() {
            for channel in self.block.channels_mut() {
                channel.fill(0.0);
            }
        }
        push_mono(&self.block, &mut self.post_ring, self.ring_pos);
        self.ring_pos = (self.ring_pos + CONTROL_FRAME) % FFT_SIZE;

        self.cursor = 0;
        self.position += count;
        self.transport.position.store(self.position, Ordering::Release);
        if count < CONTROL_FRAME {
            self.playing = false;
            self.transport.playing.store(false, Ordering::Release);
            self.transport.finished.store(true, Ordering::Release);
        }

        self.since_tap += CONTROL_FRAME;
        if self.since_tap >= self.tap_interval {
            self.since_tap -= self.tap_interval;
            self.publish_tap();
        }
    }

    fn publish_tap(&mut self) {
        let Some(mut frame) = self.taps.acquire() else {
            return;
        };
        frame.position = self.position;
        frame.restarted = self.restarted;
        frame.gain_reduction = self.graph.gain_reduction();
        unroll(&self.pre_ring, self.ring_pos, &mut frame.pre_eq);
        unroll(&self.post_ring, self.ring_pos, &mut frame.post_chain);
        self.taps.publish(frame);
        self.restarted = false;
    }
}

/// Mix `block` to mono into `ring` starting at `start`.
fn push_mono(block: &AudioBuffer, ring: &mut [f32], start: usize) {
    let scale = 1.0 / block.num_channels() as f32;
    for i in 0..block.frames() {
        let sum: f32 = block.channels().iter().map(|c| c[i]).sum();
        ring[(start + i) % ring.len()] = sum * scale;
    }
}

/// Copy `ring` into `out` oldest first; `head` is the oldest sample.
fn unroll(ring: &[f32], head: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend_from_slice(&ring[head..]);
    out.extend_from_slice(&ring[..head]);
}

/// Control side of live playback.
pub struct LiveController {
    commands: Sender<Command>,
    retired: Receiver<Box<GraphUpdate>>,
    planner: UpdatePlanner,
    transport: Arc<Transport>,
    sample_rate: u32,
}

impl std::fmt::Debug for LiveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveController")
            .field("planner", &self.planner)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl LiveController {
    /// Validate and prepare `params`, then queue them for the next block.
    pub fn update(&mut self, params: &MasteringParams) -> Result<()> {
        self.collect_garbage();
        let before = self.planner.clone();
        let update = self.planner.prepare(params)?;
        if let Err(e) = self.send(Command::Update(Box::new(update))) {
            self.planner = before;
            return Err(e);
        }
        Ok(())
    }

    /// Start or continue playback. Restarts from the top once finished.
    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    /// Hold the current position and output silence.
    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// Jump back to the start, clear signal state and reset the meters.
    pub fn restart(&self) -> Result<()> {
        self.send(Command::Restart)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .try_send(command)
            .map_err(|e| Error::Stream(format!("live command not delivered: {e}")))
    }

    /// Drop everything the renderer has handed back. Returns the count.
    pub fn collect_garbage(&self) -> usize {
        self.retired.try_iter().count()
    }

    /// Playback position in seconds, as last published by the renderer.
    pub fn position_secs(&self) -> f32 {
        self.transport.position.load(Ordering::Acquire) as f32 / self.sample_rate as f32
    }

    /// Whether the renderer is producing audio.
    pub fn is_playing(&self) -> bool {
        self.transport.playing.load(Ordering::Acquire)
    }

    /// Whether playback ran off the end of the source.
    pub fn is_finished(&self) -> bool {
        self.transport.finished.load(Ordering::Acquire)
    }
}
