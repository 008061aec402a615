//! Run-to-completion renderer for export.
//!
//! The source is converted to the export rate, a graph is built by the same
//! [`GraphBuilder`] the live driver uses, and the whole buffer is pushed
//! through it in fixed blocks. The output has exactly as many frames as the
//! converted source; the reverb tail past the end is not rendered.

use remaster_analysis::resample_buffer;
use remaster_config::MasteringParams;
use remaster_core::AudioBuffer;
use remaster_effects::{CONTROL_FRAME, DEFAULT_IR_SEED, GraphBuilder};

use crate::wav::BitDepth;
use crate::{Error, Result};

/// Default export sample rate.
pub const EXPORT_SAMPLE_RATE: u32 = 48000;

/// Export format and render settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Rate the source is converted to before rendering.
    pub sample_rate: u32,
    /// Bit depth of the written file.
    pub bit_depth: BitDepth,
    /// Frames per processing block.
    pub block_size: usize,
    /// Impulse response seed; keep it equal to the live driver's for
    /// bit-identical previews.
    pub ir_seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            sample_rate: EXPORT_SAMPLE_RATE,
            bit_depth: BitDepth::TwentyFour,
            block_size: CONTROL_FRAME * 8,
            ir_seed: DEFAULT_IR_SEED,
        }
    }
}

/// Offline render driver.
#[derive(Debug, Clone, Default)]
pub struct OfflineRenderer {
    options: RenderOptions,
}

impl OfflineRenderer {
    /// Renderer with the given options.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `source` through a fresh graph built from `params`.
    pub fn render(&self, source: &AudioBuffer, params: &MasteringParams) -> Result<AudioBuffer> {
        self.render_with_progress(source, params, |_, _| {})
    }

    /// Render, reporting `(frames_done, frames_total)` after every block.
    pub fn render_with_progress<F>(
        &self,
        source: &AudioBuffer,
        params: &MasteringParams,
        mut progress: F,
    ) -> Result<AudioBuffer>
    where
        F: FnMut(usize, usize),
    {
        let input = resample_buffer(source, self.options.sample_rate)
            .map_err(|e| Error::Render(e.to_string()))?;
        let mut graph = GraphBuilder::for_buffer(&input)
            .with_ir_seed(self.options.ir_seed)
            .build(params)?;

        let total = input.frames();
        let block_size = self.options.block_size.max(1);
        let channels = input.num_channels();
        let mut block = AudioBuffer::new(channels, block_size, input.sample_rate())
            .map_err(|e| Error::Render(e.to_string()))?;
        let mut output = AudioBuffer::new(channels, 0, input.sample_rate())
            .map_err(|e| Error::Render(e.to_string()))?;

        let mut offset = 0;
        while offset < total {
            block.copy_from(&input, offset, block_size);
            graph.process(&mut block)?;
            output.extend_from(&block);
            offset += block.frames();
            progress(offset, total);
        }

        if let Some((channel, frame)) = first_non_finite(&output) {
            return Err(Error::Render(format!(
                "non-finite sample at frame {frame} of channel {channel}"
            )));
        }

        tracing::debug!(
            frames = total,
            sample_rate = input.sample_rate(),
            channels,
            "offline render complete"
        );
        Ok(output)
    }
}

fn first_non_finite(buffer: &AudioBuffer) -> Option<(usize, usize)> {
    buffer.channels().iter().enumerate().find_map(|(c, samples)| {
        samples
            .iter()
            .position(|s| !s.is_finite())
            .map(|frame| (c, frame))
    })
}
