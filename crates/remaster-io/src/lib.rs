//! Remaster I/O - render drivers, export and the session
//!
//! - [`session`] - One open source and the graph bound to it
//! - [`offline`] - Whole-file render at the export rate
//! - [`live`] - Real-time render driver and its controller
//! - [`stream`] - cpal output stream around the live renderer
//! - [`metering`] - Tap frames from the audio thread to the meters
//! - [`wav`] - WAV decoding and byte-exact PCM export
//!
//! ## Example
//!
//! ```rust
//! use remaster_config::MasteringParams;
//! use remaster_core::AudioBuffer;
//! use remaster_io::{BitDepth, Session, encode_wav};
//!
//! let source = AudioBuffer::new(2, 4410, 44100).unwrap();
//! let mut session = Session::new(MasteringParams::default());
//! session.open(source, "demo").unwrap();
//!
//! let rendered = session.render_offline().unwrap();
//! assert_eq!(rendered.sample_rate(), 48000);
//! assert_eq!(rendered.frames(), 4800);
//!
//! let bytes = encode_wav(&rendered, BitDepth::TwentyFour).unwrap();
//! assert_eq!(bytes.len(), 44 + 4800 * 2 * 3);
//! assert_eq!(session.export_file_name(), "demo_48kHz_24bit.wav");
//! ```

mod error;
pub mod live;
pub mod metering;
pub mod offline;
pub mod session;
pub mod stream;
pub mod wav;

pub use error::{Error, Result};
pub use live::{LiveController, LiveRenderer, connect};
pub use metering::{MeterReader, MeterSnapshot, TapFrame};
pub use offline::{EXPORT_SAMPLE_RATE, OfflineRenderer, RenderOptions};
pub use session::Session;
pub use stream::{AudioDevice, PlaybackStream, StreamConfig, list_devices, output_sample_rate};
pub use wav::{
    BitDepth, DEFAULT_STEM, WAV_HEADER_LEN, WavInfo, encode_wav, export_file_name, read_wav,
    read_wav_info, source_stem, write_wav,
};
