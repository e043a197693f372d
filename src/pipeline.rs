//! Capture loop and its lifecycle.
//!
//! A [`PipelineDriver`] owns one background worker at a time. The worker is
//! the only owner of the frame source, detector and sink; it pulls frames,
//! runs the [`FrameProcessor`] and hands results to the sink. The presentation
//! layer sees only the [`FrameMailbox`] and a channel of [`PipelineEvent`]s.
//!
//! State machine: `Idle -> Running -> Idle` on start/stop or end of stream,
//! `Running -> Stopping -> Idle` when a run is cancelled.

use crate::constants::{
    DEFAULT_FOURCC, DEFAULT_FPS, DEFAULT_MAX_CONSECUTIVE_READ_FAILURES, PROGRESS_CAP_KNOWN_TOTAL,
    PROGRESS_CAP_UNKNOWN_TOTAL, PROGRESS_TIME_CONSTANT_SECS,
};
use crate::detector::{DetectorConfig, HandDetector, OnnxHandDetector};
use crate::processor::{FrameProcessor, ProcessorConfig};
use crate::sink::{DisplaySink, FrameMailbox, FrameSink, VideoFileSink};
use crate::source::{CaptureSource, FrameRead, FrameSource, VideoSource};
use crate::{Error, ErrorKind, Result};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lifecycle of a [`PipelineDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    /// No worker running
    Idle = 0,
    /// Worker is acquiring and processing frames
    Running = 1,
    /// Cancellation requested, worker finishing its current frame
    Stopping = 2,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// State flag shared between the driver and its worker
#[derive(Debug, Clone)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(PipelineState::Idle as u8)))
    }

    fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: PipelineState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: PipelineState, to: PipelineState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Cancels the active run of a [`PipelineDriver`] from another thread.
///
/// Has no effect while the driver is idle or already stopping.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: SharedState,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.state.transition(PipelineState::Running, PipelineState::Stopping) {
            info!("Cancellation requested");
        }
    }
}

/// Where processed frames go
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /// Publish to the live display mailbox
    Display,
    /// Re-encode an annotated copy to a file
    File {
        path: PathBuf,
        fourcc: String,
        /// Used when the source reports no frame rate
        default_fps: f64,
    },
}

impl OutputMode {
    /// File output with the default codec and frame rate
    #[must_use]
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Self::File {
            path: path.into(),
            fourcc: DEFAULT_FOURCC.to_string(),
            default_fps: DEFAULT_FPS,
        }
    }
}

/// Capture loop tolerances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Consecutive failed reads before the run is abandoned (0 = never)
    pub max_consecutive_read_failures: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_consecutive_read_failures: DEFAULT_MAX_CONSECUTIVE_READ_FAILURES,
        }
    }
}

/// Everything a run needs, fixed at start
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub source: VideoSource,
    pub detector: DetectorConfig,
    pub processor: ProcessorConfig,
    pub capture: CaptureConfig,
    pub output: OutputMode,
}

impl PipelineConfig {
    /// Live display of `source` with default settings
    #[must_use]
    pub fn new(source: VideoSource) -> Self {
        Self {
            source,
            detector: DetectorConfig::default(),
            processor: ProcessorConfig::default(),
            capture: CaptureConfig::default(),
            output: OutputMode::Display,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

/// Notifications from the worker to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Coarse completion estimate in percent (file output only)
    Progress(f32),
    /// The run failed; always followed by `Finished`
    Error { kind: ErrorKind, message: String },
    /// The worker has exited and the driver is idle again
    Finished { frames: u64, cancelled: bool },
}

/// Best-effort progress for file output.
///
/// Uses the source's frame count when known, capped at 99% until
/// [`complete`](Self::complete). Otherwise an estimate that approaches but
/// never reaches 90%. Only reports whole-percent increases.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    total_frames: Option<u64>,
    fps: f64,
    current: f32,
}

impl ProgressEstimator {
    #[must_use]
    pub fn new(total_frames: Option<u64>, fps: Option<f64>) -> Self {
        Self {
            total_frames: total_frames.filter(|&n| n > 0),
            fps: fps.filter(|f| f.is_finite() && *f > 0.0).unwrap_or(DEFAULT_FPS),
            current: 0.0,
        }
    }

    /// Update after `frames_done` frames; returns the new percentage if it rose
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn advance(&mut self, frames_done: u64) -> Option<f32> {
        let estimate = match self.total_frames {
            Some(total) => {
                (frames_done as f64 / total as f64 * 100.0).min(f64::from(PROGRESS_CAP_KNOWN_TOTAL))
            }
            None => {
                let seconds = frames_done as f64 / self.fps;
                let cap = f64::from(PROGRESS_CAP_UNKNOWN_TOTAL);
                // The curve rounds to the cap in floating point after long runs
                (cap * (1.0 - (-seconds / PROGRESS_TIME_CONSTANT_SECS).exp())).min(cap - 1.0)
            }
        };
        let estimate = estimate.floor() as f32;
        if estimate > self.current {
            self.current = estimate;
            Some(estimate)
        } else {
            None
        }
    }

    /// Snap to 100% once the output is finalised
    pub fn complete(&mut self) -> f32 {
        self.current = 100.0;
        self.current
    }
}

/// Why the capture loop stopped without an error
enum LoopEnd {
    EndOfStream,
    Cancelled,
}

/// The background half of a run
struct Worker {
    source: Box<dyn FrameSource>,
    detector: Box<dyn HandDetector>,
    sink: Box<dyn FrameSink>,
    processor: FrameProcessor,
    capture: CaptureConfig,
    state: SharedState,
    events: Sender<PipelineEvent>,
    progress: Option<ProgressEstimator>,
    frames: u64,
}

impl Worker {
    fn run(mut self) {
        debug!("Capture worker started");
        let outcome = self.capture_loop();

        if let Err(e) = self.source.release() {
            warn!("Source release failed: {e}");
        }
        let finished = self.sink.finish();

        let cancelled = match (outcome, finished) {
            (Ok(LoopEnd::EndOfStream), Ok(())) => {
                info!("End of stream after {} frame(s)", self.frames);
                if let Some(progress) = self.progress.as_mut() {
                    self.events.send(PipelineEvent::Progress(progress.complete())).ok();
                }
                false
            }
            (Ok(LoopEnd::Cancelled), Ok(())) => {
                info!("Capture stopped after {} frame(s)", self.frames);
                true
            }
            (Err(e), _) | (Ok(_), Err(e)) => {
                error!("Pipeline aborted: {e}");
                self.events
                    .send(PipelineEvent::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                    .ok();
                false
            }
        };

        self.state.set(PipelineState::Idle);
        self.events
            .send(PipelineEvent::Finished {
                frames: self.frames,
                cancelled,
            })
            .ok();
    }

    fn capture_loop(&mut self) -> Result<LoopEnd> {
        let mut consecutive_failures: u32 = 0;

        while self.state.get() == PipelineState::Running {
            let frame = match self.source.read() {
                Ok(FrameRead::Frame(frame)) => {
                    consecutive_failures = 0;
                    frame
                }
                Ok(FrameRead::EndOfStream) => return Ok(LoopEnd::EndOfStream),
                Err(Error::TransientRead(msg)) => {
                    consecutive_failures += 1;
                    debug!("Skipping frame: {msg}");
                    let limit = self.capture.max_consecutive_read_failures;
                    if limit > 0 && consecutive_failures >= limit {
                        return Err(Error::TransientRead(format!(
                            "{consecutive_failures} consecutive reads failed, last: {msg}"
                        )));
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            let result = self.processor.process(frame, self.detector.as_mut())?;
            self.sink.write(result)?;
            self.frames += 1;

            if let Some(percent) = self.progress.as_mut().and_then(|p| p.advance(self.frames)) {
                self.events.send(PipelineEvent::Progress(percent)).ok();
            }
        }

        Ok(LoopEnd::Cancelled)
    }
}

/// Starts, stops and observes capture runs
pub struct PipelineDriver {
    config: PipelineConfig,
    state: SharedState,
    mailbox: FrameMailbox,
    events_tx: Sender<PipelineEvent>,
    events_rx: Receiver<PipelineEvent>,
    worker: Option<JoinHandle<()>>,
}

impl PipelineDriver {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            state: SharedState::new(),
            mailbox: FrameMailbox::new(),
            events_tx,
            events_rx,
            worker: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    /// Latest processed frame for display
    #[must_use]
    pub fn mailbox(&self) -> &FrameMailbox {
        &self.mailbox
    }

    /// Worker notifications
    #[must_use]
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events_rx
    }

    /// Open the configured source and start a run.
    ///
    /// The source is opened on the calling thread, so a bad camera index,
    /// path or URL fails here and the driver stays idle.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the source cannot be opened, a detector
    /// failure if the model cannot be loaded, or `InvalidState` if a run is
    /// already active
    pub fn start(&mut self) -> Result<()> {
        self.reap_finished()?;

        let source = CaptureSource::open(&self.config.source)?;
        let detector = OnnxHandDetector::new(&self.config.detector).map_err(Error::into_detector_failure)?;
        let sink: Box<dyn FrameSink> = match &self.config.output {
            OutputMode::Display => Box::new(DisplaySink::new(self.mailbox.clone())),
            OutputMode::File {
                path,
                fourcc,
                default_fps,
            } => Box::new(VideoFileSink::new(
                path,
                fourcc,
                source.fps().unwrap_or(*default_fps),
            )?),
        };

        self.start_with(Box::new(source), Box::new(detector), sink)
    }

    /// Start a run over already opened components.
    ///
    /// Progress events are produced when the configured output is a file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if a run is already active, or an I/O error if
    /// the worker thread cannot be spawned
    pub fn start_with(
        &mut self,
        source: Box<dyn FrameSource>,
        detector: Box<dyn HandDetector>,
        sink: Box<dyn FrameSink>,
    ) -> Result<()> {
        self.reap_finished()?;

        let progress = match self.config.output {
            OutputMode::File { .. } => Some(ProgressEstimator::new(source.frame_count(), source.fps())),
            OutputMode::Display => None,
        };

        self.mailbox.clear();
        if !self.state.transition(PipelineState::Idle, PipelineState::Running) {
            return Err(Error::InvalidState("Pipeline is already running".to_string()));
        }

        let worker = Worker {
            source,
            detector,
            sink,
            processor: FrameProcessor::new(self.config.processor.clone()),
            capture: self.config.capture.clone(),
            state: self.state.clone(),
            events: self.events_tx.clone(),
            progress,
            frames: 0,
        };

        let handle = thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || worker.run());
        match handle {
            Ok(handle) => {
                info!("Pipeline started on {}", self.config.source);
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.set(PipelineState::Idle);
                Err(e.into())
            }
        }
    }

    /// Ask the worker to stop after its current frame, without waiting
    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    /// A handle that can cancel runs of this driver from any thread
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            state: self.state.clone(),
        }
    }

    /// Stop the run, wait for the worker to release the source, and drop any
    /// undisplayed frame. Does nothing when no run is active.
    pub fn stop(&mut self) {
        self.cancel();
        self.join_worker();
        self.mailbox.clear();
        self.state.set(PipelineState::Idle);
    }

    /// Block until the current run ends on its own
    pub fn wait(&mut self) {
        self.join_worker();
    }

    /// Switch between camera 0 and 1, restarting an active run
    ///
    /// # Errors
    ///
    /// Returns an error if the restarted run fails to start
    pub fn switch_camera(&mut self) -> Result<()> {
        let next = self.config.source.next_camera();
        if next == self.config.source {
            return Ok(());
        }
        info!("Switching to {next}");
        self.restart_with_source(next)
    }

    /// Replace the source; an active run is stopped and started on the new one
    ///
    /// # Errors
    ///
    /// Returns an error if the restarted run fails to start
    pub fn restart_with_source(&mut self, source: VideoSource) -> Result<()> {
        let was_running = self.is_running();
        self.stop();
        self.config.source = source;
        if was_running {
            self.start()
        } else {
            Ok(())
        }
    }

    /// Join a worker that already finished; refuse if one is still active
    fn reap_finished(&mut self) -> Result<()> {
        match self.state.get() {
            PipelineState::Idle => {
                self.join_worker();
                Ok(())
            }
            PipelineState::Running | PipelineState::Stopping => {
                Err(Error::InvalidState("Pipeline is already running".to_string()))
            }
        }
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Capture worker panicked");
                self.state.set(PipelineState::Idle);
                self.events_tx
                    .send(PipelineEvent::Error {
                        kind: ErrorKind::Internal,
                        message: "Capture worker panicked".to_string(),
                    })
                    .ok();
            }
        }
    }
}

impl Drop for PipelineDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
