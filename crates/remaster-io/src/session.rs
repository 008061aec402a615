//! One open source and the engine bound to it.
//!
//! A [`Session`] owns the source buffer and exactly one processing graph.
//! While idle the graph lives in the session; once live playback is
//! attached it moves into the [`LiveRenderer`] and the session keeps the
//! controller and meter reader instead. Opening a new source or closing
//! the session releases the previous graph, stream and meters before
//! anything new is built.
//!
//! The graph never runs at the decoded rate. Opening converts the source to
//! the export rate; starting playback converts it again to the output
//! device's rate when that differs. Exports always render from the decoded
//! original.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use remaster_analysis::resample_buffer;
use remaster_config::MasteringParams;
use remaster_core::AudioBuffer;
use remaster_effects::{GraphBuilder, GraphError, ProcessingGraph};

use crate::live::{LiveController, LiveRenderer, connect};
use crate::metering::MeterReader;
use crate::offline::{OfflineRenderer, RenderOptions};
use crate::stream::{PlaybackStream, StreamConfig, output_sample_rate};
use crate::wav::{DEFAULT_STEM, export_file_name, read_wav, source_stem, write_wav};
use crate::{Error, Result};

struct Live {
    controller: LiveController,
    meter: MeterReader,
    stream: Option<PlaybackStream>,
}

struct Loaded {
    decoded: AudioBuffer,
    /// `decoded` at the graph's sample rate.
    source: Arc<AudioBuffer>,
    stem: String,
    graph: Option<ProcessingGraph>,
    live: Option<Live>,
}

/// The mastering engine for one source at a time.
pub struct Session {
    params: MasteringParams,
    options: RenderOptions,
    loaded: Option<Loaded>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("params", &self.params)
            .field("options", &self.options)
            .field("open", &self.is_open())
            .field("live", &self.is_live())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MasteringParams::default())
    }
}

impl Session {
    /// Empty session that will build graphs from `params`.
    pub fn new(params: MasteringParams) -> Self {
        Self::with_options(params, RenderOptions::default())
    }

    /// Empty session with explicit export options.
    pub fn with_options(params: MasteringParams, options: RenderOptions) -> Self {
        Self {
            params,
            options,
            loaded: None,
        }
    }

    /// Open a decoded source. Any previous source is closed first; on error
    /// the session stays closed.
    ///
    /// The graph is built at the export rate, so sources at rates too low
    /// to host the chain still open.
    pub fn open(&mut self, decoded: AudioBuffer, stem: impl Into<String>) -> Result<()> {
        self.close();
        let (source, graph) = self.prepare(&decoded, self.options.sample_rate)?;
        let stem = stem.into();
        tracing::info!(
            stem = %stem,
            sample_rate = decoded.sample_rate(),
            processing_rate = source.sample_rate(),
            channels = decoded.num_channels(),
            frames = decoded.frames(),
            "session opened"
        );
        self.loaded = Some(Loaded {
            decoded,
            source,
            stem,
            graph: Some(graph),
            live: None,
        });
        Ok(())
    }

    fn prepare(
        &self,
        decoded: &AudioBuffer,
        sample_rate: u32,
    ) -> Result<(Arc<AudioBuffer>, ProcessingGraph)> {
        let source = resample_buffer(decoded, sample_rate)
            .map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
        let graph = builder(&source, &self.options).build(&self.params)?;
        Ok((Arc::new(source), graph))
    }

    /// Move the idle graph to another sample rate, converting the source
    /// again from the decoded original.
    fn set_processing_rate(&mut self, sample_rate: u32) -> Result<()> {
        let loaded = self.loaded.as_ref().ok_or(Error::NoSession)?;
        if loaded.source.sample_rate() == sample_rate {
            return Ok(());
        }
        let (source, graph) = self.prepare(&loaded.decoded, sample_rate)?;
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.source = source;
            loaded.graph = Some(graph);
        }
        tracing::debug!(sample_rate, "processing rate changed");
        Ok(())
    }

    /// Decode a WAV file and open it.
    ///
    /// A decode failure leaves the session closed and is recoverable.
    pub fn open_file(&mut self, path: &Path) -> Result<()> {
        self.close();
        let source = read_wav(path).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "cannot open source");
        })?;
        self.open(source, source_stem(path))
    }

    /// Release the graph, stream, meters and source.
    pub fn close(&mut self) {
        if let Some(mut loaded) = self.loaded.take() {
            // stream first, so the callback stops before its renderer is freed
            if let Some(live) = loaded.live.as_mut() {
                live.stream = None;
            }
            drop(loaded);
            tracing::info!("session closed");
        }
    }

    /// Whether a source is open.
    pub fn is_open(&self) -> bool {
        self.loaded.is_some()
    }

    /// Whether live playback is attached.
    pub fn is_live(&self) -> bool {
        self.loaded.as_ref().is_some_and(|l| l.live.is_some())
    }

    /// Current parameters.
    pub fn params(&self) -> &MasteringParams {
        &self.params
    }

    /// Export options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The open source as decoded.
    pub fn source(&self) -> Option<&AudioBuffer> {
        self.loaded.as_ref().map(|l| &l.decoded)
    }

    /// Rate the graph runs at while a source is open.
    pub fn processing_rate(&self) -> Option<u32> {
        self.loaded.as_ref().map(|l| l.source.sample_rate())
    }

    /// The idle graph; `None` while closed or live.
    pub fn graph(&self) -> Option<&ProcessingGraph> {
        self.loaded.as_ref().and_then(|l| l.graph.as_ref())
    }

    /// Validate `params` and apply them to whichever graph is running.
    ///
    /// Invalid parameters are rejected and nothing changes. With no source
    /// open they are only stored.
    pub fn update_params(&mut self, params: MasteringParams) -> Result<()> {
        params.validate().map_err(GraphError::from)?;
        if let Some(loaded) = self.loaded.as_mut() {
            if let Some(live) = loaded.live.as_mut() {
                live.controller.update(&params)?;
            } else if let Some(graph) = loaded.graph.as_mut() {
                graph.update(&params)?;
            }
        }
        self.params = params;
        Ok(())
    }

    /// Load a parameter file and apply it like [`Session::update_params`].
    pub fn load_params(&mut self, path: &Path) -> Result<()> {
        let params = remaster_config::load_params(path)?;
        self.update_params(params)
    }

    /// Render the whole source at the export rate with the current
    /// parameters.
    pub fn render_offline(&self) -> Result<AudioBuffer> {
        let loaded = self.loaded.as_ref().ok_or(Error::NoSession)?;
        OfflineRenderer::new(self.options).render(&loaded.decoded, &self.params)
    }

    /// Render with progress reporting as `(frames_done, frames_total)`.
    pub fn render_offline_with_progress<F>(&self, progress: F) -> Result<AudioBuffer>
    where
        F: FnMut(usize, usize),
    {
        let loaded = self.loaded.as_ref().ok_or(Error::NoSession)?;
        OfflineRenderer::new(self.options).render_with_progress(
            &loaded.decoded,
            &self.params,
            progress,
        )
    }

    /// File name an export of the open source gets.
    pub fn export_file_name(&self) -> String {
        let stem = self.loaded.as_ref().map_or(DEFAULT_STEM, |l| l.stem.as_str());
        export_file_name(stem, self.options.sample_rate, self.options.bit_depth)
    }

    /// Render and write the export into `dir`. Returns the written path.
    ///
    /// Nothing is written unless the whole render succeeds.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        let rendered = self.render_offline()?;
        self.write_export(&rendered, dir)
    }

    /// Write an already rendered buffer as this session's export.
    pub fn write_export(&self, rendered: &AudioBuffer, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.export_file_name());
        write_wav(&path, rendered, self.options.bit_depth)?;
        tracing::info!(
            path = %path.display(),
            frames = rendered.frames(),
            sample_rate = rendered.sample_rate(),
            "export complete"
        );
        Ok(path)
    }

    /// Hand the graph to a new live renderer for any audio sink.
    ///
    /// Replaces previous live playback. The caller drives the returned
    /// renderer; [`Session::start_live`] does so with the output device.
    pub fn attach_live(&mut self) -> Result<LiveRenderer> {
        self.detach_live()?;
        let loaded = self.loaded.as_mut().ok_or(Error::NoSession)?;
        let graph = loaded.graph.take().ok_or(Error::NoSession)?;
        let (renderer, controller, meter) = connect(graph, Arc::clone(&loaded.source))?;
        loaded.live = Some(Live {
            controller,
            meter,
            stream: None,
        });
        Ok(renderer)
    }

    /// Start playback on an output device, at the device's own rate.
    pub fn start_live(&mut self, config: &StreamConfig) -> Result<()> {
        self.detach_live()?;
        self.set_processing_rate(output_sample_rate(config)?)?;
        let renderer = self.attach_live()?;
        match PlaybackStream::start(renderer, config) {
            Ok(stream) => {
                if let Some(live) = self.loaded.as_mut().and_then(|l| l.live.as_mut()) {
                    live.controller.play()?;
                    live.stream = Some(stream);
                }
                Ok(())
            }
            Err(e) => {
                self.detach_live()?;
                Err(e)
            }
        }
    }

    /// Stop live playback and return the session to idle.
    ///
    /// The graph went with the renderer, so an idle one is rebuilt from the
    /// current parameters.
    pub fn detach_live(&mut self) -> Result<()> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Ok(());
        };
        if let Some(mut live) = loaded.live.take() {
            live.stream = None;
            drop(live);
            loaded.graph = Some(builder(&loaded.source, &self.options).build(&self.params)?);
            tracing::debug!("live playback detached");
        }
        Ok(())
    }

    fn live(&self) -> Result<&Live> {
        let loaded = self.loaded.as_ref().ok_or(Error::NoSession)?;
        loaded
            .live
            .as_ref()
            .ok_or_else(|| Error::Resume("live playback is not running".into()))
    }

    /// Pause live playback.
    pub fn pause(&self) -> Result<()> {
        let live = self.live()?;
        live.controller.pause()?;
        if let Some(stream) = &live.stream {
            stream.suspend()?;
        }
        Ok(())
    }

    /// Resume live playback.
    ///
    /// Errors are recoverable: the caller may report them and retry.
    pub fn resume(&self) -> Result<()> {
        let live = self.live()?;
        if let Some(stream) = &live.stream {
            stream.resume().inspect_err(|e| {
                tracing::warn!(error = %e, "resume failed");
            })?;
        }
        live.controller
            .play()
            .map_err(|e| Error::Resume(e.to_string()))
    }

    /// Jump back to the start. Only position 0 is supported; the graph
    /// state and the meters are reset.
    pub fn seek_to_start(&self) -> Result<()> {
        self.live()?.controller.restart()
    }

    /// Live controller, while attached.
    pub fn controller(&self) -> Option<&LiveController> {
        self.loaded.as_ref()?.live.as_ref().map(|l| &l.controller)
    }

    /// Drain pending meter frames and return the meter reader.
    pub fn poll_meters(&mut self) -> Option<&MeterReader> {
        let live = self.loaded.as_mut()?.live.as_mut()?;
        live.controller.collect_garbage();
        live.meter.poll();
        Some(&live.meter)
    }
}

fn builder(source: &AudioBuffer, options: &RenderOptions) -> GraphBuilder {
    GraphBuilder::for_buffer(source).with_ir_seed(options.ir_seed)
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
