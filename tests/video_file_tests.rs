//! Video file output and input through the real OpenCV encoder and decoder


use finger_count::{
    app::follow_run,
    pipeline::{OutputMode, PipelineConfig, PipelineDriver},
    processor::{FrameProcessor, FrameResult},
    sink::{FrameSink, VideoFileSink},
    source::{CaptureSource, FrameRead, FrameSource, VideoSource},
};
use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    prelude::*,
};
use std::path::{Path, PathBuf};
use test_helpers::{open_hand, ScriptedDetector};

const FRAMES: usize = 10;
const FPS: f64 = 25.0;

fn gray_frame(width: i32, height: i32, level: f64) -> Mat {
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(level)).unwrap()
}

/// Encode `FRAMES` frames of `width`x`height` as MJPG and return the writer's frame count
fn write_clip(path: &Path, width: i32, height: i32) -> u64 {
    let mut sink = VideoFileSink::new(path, "MJPG", FPS).unwrap();
    // Nothing touches the disk before the first frame
    assert!(!path.exists());
    for i in 0..FRAMES {
        sink.write(FrameResult {
            frame: gray_frame(width, height, (i * 20) as f64),
            hand_count: 0,
            total_fingers_up: 0,
        })
        .unwrap();
        assert!(path.exists());
    }
    let written = sink.frames_written();
    sink.finish().unwrap();
    written
}

/// Read every frame, returning their sizes; panics unless the file ends cleanly
fn read_all(path: &Path) -> Vec<(i32, i32)> {
    let mut source = CaptureSource::open(&VideoSource::File(PathBuf::from(path))).unwrap();
    let mut sizes = Vec::new();
    loop {
        match source.read().unwrap() {
            FrameRead::Frame(frame) => sizes.push((frame.cols(), frame.rows())),
            FrameRead::EndOfStream => break,
        }
        assert!(sizes.len() <= FRAMES * 2, "file never reported end of stream");
    }
    // Further reads stay at end of stream
    assert!(matches!(source.read().unwrap(), FrameRead::EndOfStream));
    source.release().unwrap();
    sizes
}

#[test]
fn test_written_clip_reads_back_to_end_of_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.avi");

    assert_eq!(write_clip(&path, 320, 240), FRAMES as u64);

    let source = CaptureSource::open(&VideoSource::File(path.clone())).unwrap();
    let fps = source.fps().unwrap();
    assert!((fps - FPS).abs() < 0.01, "fps {fps}");
    assert_eq!(source.frame_count(), Some(FRAMES as u64));

    assert_eq!(read_all(&path), vec![(320, 240); FRAMES]);
}

#[test]
fn test_writer_takes_size_from_first_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.avi");

    write_clip(&path, 160, 120);
    assert_eq!(read_all(&path), vec![(160, 120); FRAMES]);
}

#[test]
fn test_file_run_copies_source_frame_rate() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.avi");
    let output = dir.path().join("input_output.avi");
    write_clip(&input, 640, 480);

    let source = CaptureSource::open(&VideoSource::File(input.clone())).unwrap();
    let fps = source.fps().unwrap_or(30.0);
    let sink = VideoFileSink::new(&output, "MJPG", fps).unwrap();

    let config = PipelineConfig::new(VideoSource::File(input)).with_output(OutputMode::File {
        path: output.clone(),
        fourcc: "MJPG".to_string(),
        default_fps: 30.0,
    });
    let mut driver = PipelineDriver::new(config);
    driver
        .start_with(
            Box::new(source),
            Box::new(ScriptedDetector::new(vec![open_hand()])),
            Box::new(sink),
        )
        .unwrap();
    let summary = follow_run(&mut driver);

    assert!(summary.error.is_none());
    assert_eq!(summary.frames, FRAMES as u64);
    assert_eq!(summary.progress, Some(100.0));

    let annotated = CaptureSource::open(&VideoSource::File(output.clone())).unwrap();
    assert!((annotated.fps().unwrap() - FPS).abs() < 0.01);
    assert_eq!(read_all(&output), vec![(640, 480); FRAMES]);
}

#[test]
fn test_widescreen_input_is_written_at_bounded_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.avi");
    let processor = FrameProcessor::default();
    let mut detector = ScriptedDetector::new(vec![open_hand()]);
    let mut sink = VideoFileSink::new(&path, "MJPG", FPS).unwrap();

    for _ in 0..FRAMES {
        let result = processor.process(gray_frame(1280, 720, 90.0), &mut detector).unwrap();
        sink.write(result).unwrap();
    }
    sink.finish().unwrap();

    // 16:9 is stretched to 4:3 rather than letterboxed
    assert_eq!(read_all(&path), vec![(800, 600); FRAMES]);
}
