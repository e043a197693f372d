//! Destinations for processed frames: the live display mailbox or a video file.

use crate::constants::DEFAULT_FPS;
use crate::processor::FrameResult;
use crate::{Error, Result};
use log::{info, warn};
use opencv::{
    core::Size,
    prelude::*,
    videoio::VideoWriter,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Consumer of processed frames, driven by the capture worker
pub trait FrameSink: Send {
    /// Hand over one processed frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be delivered or encoded
    fn write(&mut self, result: FrameResult) -> Result<()>;

    /// Flush and close; called once when the run ends
    ///
    /// # Errors
    ///
    /// Returns an error if finalising the output fails
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Single-slot, latest-wins handoff of frames to the presentation layer.
///
/// Publishing replaces any frame not yet taken, so a slow reader only ever
/// sees the newest result and the worker never waits on it.
#[derive(Debug, Clone, Default)]
pub struct FrameMailbox {
    slot: Arc<Mutex<Option<FrameResult>>>,
}

impl FrameMailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<FrameResult>> {
        // A panicking holder cannot leave the slot half-written
        self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Store `result`, returning the unread frame it replaced
    pub fn publish(&self, result: FrameResult) -> Option<FrameResult> {
        self.lock().replace(result)
    }

    /// Remove and return the pending frame
    #[must_use]
    pub fn take(&self) -> Option<FrameResult> {
        self.lock().take()
    }

    /// Drop the pending frame, if any
    pub fn clear(&self) {
        self.lock().take();
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock().is_some()
    }
}

/// Publishes every frame to a [`FrameMailbox`]
#[derive(Debug, Clone)]
pub struct DisplaySink {
    mailbox: FrameMailbox,
}

impl DisplaySink {
    #[must_use]
    pub fn new(mailbox: FrameMailbox) -> Self {
        Self { mailbox }
    }
}

impl FrameSink for DisplaySink {
    fn write(&mut self, result: FrameResult) -> Result<()> {
        self.mailbox.publish(result);
        Ok(())
    }
}

/// Encodes frames to a video file.
///
/// The writer is opened on the first frame, with that frame's size; a run
/// with no frames leaves no file behind.
///
/// Frames arrive already bounded by the processor, so an input larger than
/// 800x600 is written at exactly 800x600, stretched if its aspect ratio
/// differs.
pub struct VideoFileSink {
    path: PathBuf,
    fourcc: i32,
    fps: f64,
    writer: Option<VideoWriter>,
    frames_written: u64,
}

impl VideoFileSink {
    /// Prepare a writer for `path`
    ///
    /// # Errors
    ///
    /// Returns an error if `fourcc` is not four characters
    pub fn new<P: AsRef<Path>>(path: P, fourcc: &str, fps: f64) -> Result<Self> {
        let fourcc = parse_fourcc(fourcc)?;
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { DEFAULT_FPS };
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            fourcc,
            fps,
            writer: None,
            frames_written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn open_writer(&self, size: Size) -> Result<VideoWriter> {
        info!(
            "Writing {}x{} @ {:.2} fps to {}",
            size.width,
            size.height,
            self.fps,
            self.path.display()
        );
        let writer = VideoWriter::new(&self.path.to_string_lossy(), self.fourcc, self.fps, size, true)
            .map_err(|e| Error::Sink(format!("{}: {e}", self.path.display())))?;
        if !writer.is_opened()? {
            return Err(Error::Sink(format!("Cannot open {} for writing", self.path.display())));
        }
        Ok(writer)
    }
}

impl FrameSink for VideoFileSink {
    fn write(&mut self, result: FrameResult) -> Result<()> {
        if self.writer.is_none() {
            let size = Size::new(result.frame.cols(), result.frame.rows());
            self.writer = Some(self.open_writer(size)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer
                .write(&result.frame)
                .map_err(|e| Error::Sink(format!("{}: {e}", self.path.display())))?;
            self.frames_written += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(mut writer) => {
                writer
                    .release()
                    .map_err(|e| Error::Sink(format!("{}: {e}", self.path.display())))?;
                info!("Wrote {} frame(s) to {}", self.frames_written, self.path.display());
            }
            None => warn!("No frames processed, {} not created", self.path.display()),
        }
        Ok(())
    }
}

/// Pack a four character code such as `mp4v`
///
/// # Errors
///
/// Returns an error unless `code` is exactly four ASCII characters
pub fn parse_fourcc(code: &str) -> Result<i32> {
    let chars: Vec<char> = code.chars().collect();
    match chars.as_slice() {
        &[a, b, c, d] if code.is_ascii() => Ok(VideoWriter::fourcc(a, b, c, d)?),
        _ => Err(Error::InvalidInput(format!("Invalid fourcc code: {code:?}"))),
    }
}

/// `<dir>/<stem>_output<ext>` next to the input, `.mp4` if it has no extension
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned());
    let ext = input
        .extension()
        .map_or_else(|| "mp4".to_string(), |e| e.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}_output.{ext}"))
}
