//! Benchmarks for the photoid pipeline.
//!
//! Run with: cargo bench -p photoid-core

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat};
use photoid_core::pipeline::transform::read_dimensions;
use photoid_core::{FilterCriteria, Pipeline, ResizeTransformer, TransformSpec, TransformStage};

fn benchmark_filter(c: &mut Criterion) {
    let criteria = FilterCriteria::new("jpe?g|png", Some("_raw|thumb"), 7).unwrap();
    let now = SystemTime::now();
    let modified = now - Duration::from_secs(3600);

    c.bench_function("filter_classify", |b| {
        b.iter(|| {
            let _ = criteria.classify(black_box("IMG_20240101_123456.jpg"), true, modified, now);
        })
    });
}

fn benchmark_read_dimensions(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header.png");
    DynamicImage::new_rgb8(1920, 1080)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();

    c.bench_function("read_dimensions_png", |b| {
        b.iter(|| {
            let _ = read_dimensions(black_box(&path));
        })
    });
}

fn benchmark_pipeline_copy(c: &mut Criterion) {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    for i in 0..64 {
        DynamicImage::new_rgb8(64, 64)
            .save_with_format(src.path().join(format!("{i}.png")), ImageFormat::Png)
            .unwrap();
    }
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("pipeline_copy_64_files", |b| {
        b.iter(|| {
            let criteria = FilterCriteria::new("png", None, 0).unwrap();
            let spec = TransformSpec::new(Some(500), None).unwrap();
            let stage = TransformStage::new(spec, Arc::new(ResizeTransformer::new()));
            let pipeline = Pipeline::new(src.path(), dst.path(), criteria, stage, 4).unwrap();
            rt.block_on(pipeline.run()).unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_filter,
    benchmark_read_dimensions,
    benchmark_pipeline_copy,
);
criterion_main!(benches);
