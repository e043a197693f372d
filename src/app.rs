//! Presentation layer: the live `highgui` window and the file-processing run.
//!
//! Neither path touches the capture worker directly. Frames are taken from the
//! driver's mailbox and progress, errors and completion arrive as
//! [`PipelineEvent`]s.

use crate::config::DisplayConfig;
use crate::pipeline::{PipelineDriver, PipelineEvent, PipelineState};
use crate::processor::FrameResult;
use crate::{ErrorKind, Result};
use crossbeam_channel::RecvTimeoutError;
use log::{error, info, warn};
use opencv::{
    core::{Mat, Point, Scalar},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
};
use std::time::Duration;

/// How often a file run re-checks the worker while no events arrive
const EVENT_POLL: Duration = Duration::from_millis(100);

/// Keyboard controls of the live window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// `q` or Esc
    Quit,
    /// `s`
    Start,
    /// `x`
    Stop,
    /// `c`
    SwitchCamera,
}

impl KeyCommand {
    /// Decode a `highgui::wait_key` result; `-1` (no key) gives `None`
    #[must_use]
    pub fn from_key(key: i32) -> Option<Self> {
        if key < 0 {
            return None;
        }
        match u8::try_from(key & 0xFF).ok()? {
            27 | b'q' => Some(Self::Quit),
            b's' => Some(Self::Start),
            b'x' => Some(Self::Stop),
            b'c' => Some(Self::SwitchCamera),
            _ => None,
        }
    }
}

/// Write the hand and finger counters in the top-left corner
///
/// # Errors
///
/// Returns an error if text rendering fails
pub fn draw_counters(frame: &mut Mat, hand_count: usize, fingers_up: usize) -> Result<()> {
    let lines = [
        (format!("Fingers Up: {fingers_up}"), 30),
        (format!("Detected Hands: {hand_count}"), 60),
    ];
    for (text, y) in &lines {
        imgproc::put_text(
            frame,
            text,
            Point::new(10, *y),
            FONT_HERSHEY_SIMPLEX,
            0.8,
            Scalar::new(255.0, 255.0, 0.0, 0.0),
            2,
            LINE_8,
            false,
        )?;
    }
    Ok(())
}

/// Live camera or stream viewer
pub struct HandTrackingApp {
    driver: PipelineDriver,
    display: DisplayConfig,
}

impl HandTrackingApp {
    #[must_use]
    pub fn new(driver: PipelineDriver, display: DisplayConfig) -> Self {
        Self { driver, display }
    }

    /// Open the window, start capturing and run until the user quits
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created or drawn to
    pub fn run(&mut self) -> Result<()> {
        info!("Controls: s = start, x = stop, c = switch camera, q/Esc = quit");
        highgui::named_window(&self.display.window_title, WINDOW_NORMAL)?;
        self.start();

        loop {
            if let Some(result) = self.driver.mailbox().take() {
                self.show(result)?;
            }
            self.drain_events();

            let key = highgui::wait_key(self.display.poll_interval_ms)?;
            match KeyCommand::from_key(key) {
                Some(KeyCommand::Quit) => {
                    info!("Exit requested by user");
                    break;
                }
                Some(command) => self.handle(command),
                None => {}
            }
        }

        self.driver.stop();
        highgui::destroy_all_windows()?;
        info!("Application shutting down");
        Ok(())
    }

    fn handle(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::Start => self.start(),
            KeyCommand::Stop => {
                info!("Stopping capture");
                self.driver.stop();
            }
            KeyCommand::SwitchCamera => {
                if let Err(e) = self.driver.switch_camera() {
                    error!("Camera switch failed: {e}");
                }
            }
            KeyCommand::Quit => {}
        }
    }

    fn start(&mut self) {
        if self.driver.state() != PipelineState::Idle {
            return;
        }
        if let Err(e) = self.driver.start() {
            error!("Could not start capture: {e}");
        }
    }

    fn show(&self, result: FrameResult) -> Result<()> {
        let FrameResult {
            mut frame,
            hand_count,
            total_fingers_up,
        } = result;
        draw_counters(&mut frame, hand_count, total_fingers_up)?;
        highgui::imshow(&self.display.window_title, &frame)?;
        Ok(())
    }

    fn drain_events(&self) {
        for event in self.driver.events().try_iter() {
            match event {
                PipelineEvent::Error { kind, message } => error!("{kind:?}: {message}"),
                PipelineEvent::Finished { frames, cancelled } => {
                    info!("Capture ended after {frames} frame(s){}", if cancelled { " (stopped)" } else { "" });
                }
                PipelineEvent::Progress(_) => {}
            }
        }
    }
}

/// Outcome of a run followed to completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub cancelled: bool,
    /// Last reported progress
    pub progress: Option<f32>,
    pub error: Option<(ErrorKind, String)>,
}

/// Follow an already started run until it finishes, logging progress.
pub fn follow_run(driver: &mut PipelineDriver) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut finished = false;

    while !finished {
        match driver.events().recv_timeout(EVENT_POLL) {
            Ok(event) => finished = record(&mut summary, event),
            Err(RecvTimeoutError::Timeout) if driver.state() == PipelineState::Idle => {
                driver.wait();
                for event in driver.events().try_iter() {
                    finished |= record(&mut summary, event);
                }
                if !finished {
                    warn!("Worker exited without reporting completion");
                    finished = true;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => finished = true,
        }
    }

    driver.wait();
    summary
}

fn record(summary: &mut RunSummary, event: PipelineEvent) -> bool {
    match event {
        PipelineEvent::Progress(percent) => {
            info!("Progress: {percent:.0}%");
            summary.progress = Some(percent);
            false
        }
        PipelineEvent::Error { kind, message } => {
            error!("{kind:?}: {message}");
            summary.error = Some((kind, message));
            false
        }
        PipelineEvent::Finished { frames, cancelled } => {
            summary.frames = frames;
            summary.cancelled = cancelled;
            true
        }
    }
}
