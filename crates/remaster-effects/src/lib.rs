//! Remaster Effects - the mastering chain
//!
//! Every stage implements [`Stage`] and processes an [`AudioBuffer`] in place:
//!
//! - [`Equalizer`] - five fixed bands, gain ramps per control frame
//! - [`MultibandCompressor`] - Linkwitz-Riley three-way split, per-band dynamics
//! - [`Compressor`] - linked soft-knee compressor
//! - [`Saturator`] - 4× oversampled tape curve
//! - [`StereoExpander`] - mid/side width
//! - [`Reverb`] - partitioned convolution with a synthesized impulse response
//! - [`Limiter`] - 20:1 hard-knee ceiling
//! - [`MasterGain`] - final volume
//!
//! [`GraphBuilder`] wires them into a [`ProcessingGraph`].
//!
//! ## Example
//!
//! ```rust
//! use remaster_config::MasteringParams;
//! use remaster_core::AudioBuffer;
//! use remaster_effects::GraphBuilder;
//!
//! let mut buffer = AudioBuffer::new(2, 4800, 48000).unwrap();
//! let mut graph = GraphBuilder::for_buffer(&buffer)
//!     .build(&MasteringParams::default())
//!     .unwrap();
//! graph.process(&mut buffer).unwrap();
//! let gr = graph.gain_reduction();
//! assert!(gr.limiter <= 0.0);
//! ```
//!
//! [`AudioBuffer`]: remaster_core::AudioBuffer

pub mod compressor;
pub mod convolver;
pub mod dynamics;
pub mod equalizer;
pub mod error;
pub mod graph;
pub mod impulse;
pub mod limiter;
pub mod master_gain;
pub mod multiband;
pub mod reverb;
pub mod saturator;
pub mod stage;
pub mod stereo;

pub use compressor::Compressor;
pub use convolver::{ConvolutionKernel, DirectConvolver, PARTITION, PartitionedConvolver};
pub use dynamics::{Dynamics, GainComputer};
pub use equalizer::Equalizer;
pub use error::{GraphError, StageError};
pub use graph::{
    DEFAULT_IR_SEED, GainReduction, GraphBuilder, GraphUpdate, ProcessingGraph, UpdatePlanner,
};
pub use impulse::{ImpulseResponse, synthesize};
pub use limiter::Limiter;
pub use master_gain::MasterGain;
pub use multiband::{CrossoverSplitter, MultibandCompressor};
pub use reverb::Reverb;
pub use saturator::{Saturator, TapeCurve};
pub use stage::{CONTROL_FRAME, Route, Routed, Stage};
pub use stereo::StereoExpander;
