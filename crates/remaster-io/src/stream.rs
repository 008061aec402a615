//! Output device playback via cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream};

use crate::live::LiveRenderer;
use crate::{Error, Result};

fn name_of(device: &Device) -> Option<String> {
    device.description().ok().map(|d| d.name().to_string())
}

fn backend<E: std::fmt::Display>(err: E) -> Error {
    Error::Stream(err.to_string())
}

/// Output device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub default_channels: u16,
}

/// Playback stream configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfig {
    /// Output device: index, exact name or case-insensitive substring.
    /// The default device when `None`.
    pub device: Option<String>,
    /// Frames per callback; the device default when `None`.
    pub buffer_size: Option<u32>,
}

/// List output devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let outputs = cpal::default_host().output_devices().map_err(backend)?;
    Ok(outputs
        .filter_map(|device| {
            let config = device.default_output_config().ok();
            Some(AudioDevice {
                name: name_of(&device)?,
                default_sample_rate: config.as_ref().map_or(48000, |c| c.sample_rate()),
                default_channels: config.as_ref().map_or(2, |c| c.channels()),
            })
        })
        .collect())
}

/// Default sample rate of the output device `config` selects.
pub fn output_sample_rate(config: &StreamConfig) -> Result<u32> {
    let host = cpal::default_host();
    let device = find_output_device(&host, config.device.as_deref())?;
    let default = device.default_output_config().map_err(backend)?;
    Ok(default.sample_rate())
}

/// Resolve a device by index, exact name, then case-insensitive substring.
fn find_output_device(host: &Host, query: Option<&str>) -> Result<Device> {
    let Some(query) = query else {
        return host.default_output_device().ok_or(Error::NoDevice);
    };
    let devices: Vec<Device> = host.output_devices().map_err(backend)?.collect();

    if let Ok(index) = query.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "output device index {index} (only {count} devices available)"
            ))
        });
    }

    let named: Vec<(String, Device)> = devices
        .into_iter()
        .filter_map(|d| Some((name_of(&d)?, d)))
        .collect();
    let needle = query.to_lowercase();
    let pick = named
        .iter()
        .position(|(name, _)| name == query)
        .or_else(|| {
            named
                .iter()
                .position(|(name, _)| name.to_lowercase().contains(&needle))
        });
    pick.and_then(|i| named.into_iter().nth(i))
        .map(|(_, device)| device)
        .ok_or_else(|| Error::DeviceNotFound(format!("no output device matching '{query}'")))
}

/// A running output stream driving a [`LiveRenderer`].
///
/// Dropping it stops playback and drops the renderer with the graph it owns.
pub struct PlaybackStream {
    stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl std::fmt::Debug for PlaybackStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackStream")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl PlaybackStream {
    /// Open the output device at the renderer's sample rate and start it.
    ///
    /// The renderer should already run at the device rate, see
    /// [`output_sample_rate`]; a device that refuses it fails here.
    pub fn start(mut renderer: LiveRenderer, config: &StreamConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_output_device(&host, config.device.as_deref())?;
        let default = device.default_output_config().map_err(backend)?;

        let sample_rate = renderer.graph().sample_rate();
        let channels = default.channels();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate,
            buffer_size: config
                .buffer_size
                .map_or(cpal::BufferSize::Default, cpal::BufferSize::Fixed),
        };

        let out_channels = usize::from(channels);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.render(data, out_channels);
                },
                |err| tracing::warn!(error = %err, "output stream error"),
                None,
            )
            .map_err(backend)?;
        stream.play().map_err(backend)?;

        tracing::info!(channels, sample_rate, "output stream started");
        Ok(Self {
            stream,
            sample_rate,
            channels,
        })
    }

    /// Suspend the device callback.
    pub fn suspend(&self) -> Result<()> {
        self.stream.pause().map_err(backend)
    }

    /// Resume the device callback. Failures are recoverable.
    pub fn resume(&self) -> Result<()> {
        self.stream.play().map_err(|e| Error::Resume(e.to_string()))
    }

    /// Stream sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Device channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}
