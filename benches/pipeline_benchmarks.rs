//! Performance benchmarks for the per-frame path: geometry, classification, drawing, processing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use finger_count::{
    detector::HandDetector,
    fingers::count_extended,
    landmarks::{to_pixel_joints, HandLandmarks, NormalizedLandmark},
    processor::FrameProcessor,
    skeleton::draw_skeleton,
    Result,
};
use opencv::{
    core::{Mat, CV_8UC3},
    prelude::*,
};
use std::time::Duration;

/// Detector returning a fixed set of hands, so only the core is measured
struct FixedDetector(Vec<HandLandmarks>);

impl HandDetector for FixedDetector {
    fn detect(&mut self, _rgb_frame: &Mat) -> Result<Vec<HandLandmarks>> {
        Ok(self.0.clone())
    }
}

#[allow(clippy::cast_precision_loss)]
fn synthetic_hand(shift: f32) -> HandLandmarks {
    let mut points = [NormalizedLandmark::new(0.0, 0.0, 0.0); 21];
    for (i, point) in points.iter_mut().enumerate() {
        let finger = i.saturating_sub(1) / 4;
        let joint = i.saturating_sub(1) % 4;
        point.x = 0.3 + shift + finger as f32 * 0.05;
        point.y = 0.9 - joint as f32 * 0.1;
    }
    HandLandmarks::new(points)
}

fn black_frame(width: i32, height: i32) -> Mat {
    Mat::zeros(height, width, CV_8UC3).unwrap().to_mat().unwrap()
}

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");
    let hand = synthetic_hand(0.0);

    group.bench_function("to_pixel_joints", |b| {
        b.iter(|| black_box(to_pixel_joints(black_box(&hand), 800, 600)));
    });

    let joints = to_pixel_joints(&hand, 800, 600);
    group.bench_function("count_extended", |b| {
        b.iter(|| black_box(count_extended(black_box(&joints))));
    });

    group.finish();
}

fn bench_draw_skeleton(c: &mut Criterion) {
    let joints = to_pixel_joints(&synthetic_hand(0.0), 800, 600);
    let mut frame = black_frame(800, 600);

    c.bench_function("draw_skeleton", |b| {
        b.iter(|| draw_skeleton(&mut frame, black_box(&joints)).unwrap());
    });
}

fn bench_process_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_frame");
    group.measurement_time(Duration::from_secs(10));

    let processor = FrameProcessor::default();
    let sizes = [(640, 480), (1280, 720), (1920, 1080)];

    for hands in [0usize, 2] {
        let mut detector = FixedDetector((0..hands).map(|h| synthetic_hand(h as f32 * 0.3)).collect());
        for &(width, height) in &sizes {
            let frame = black_frame(width, height);
            group.bench_with_input(
                BenchmarkId::new(format!("{hands}_hands"), format!("{width}x{height}")),
                &frame,
                |b, frame| {
                    b.iter(|| {
                        let input = frame.try_clone().unwrap();
                        black_box(processor.process(input, &mut detector).unwrap())
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_geometry, bench_draw_skeleton, bench_process_frame);
criterion_main!(benches);
