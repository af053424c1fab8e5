//! End-to-end runs of the resize-or-copy pipeline over temporary trees.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use image::{DynamicImage, ImageFormat};
use photoid_core::{
    Action, CancellationSignal, FilterCriteria, ImageTransformer, Pipeline, PipelineError,
    ResizeTransformer, TransformError, TransformSpec, TransformStage,
};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn write_image(path: &Path, width: u32, height: u32, format: ImageFormat) {
    DynamicImage::new_rgb8(width, height)
        .save_with_format(path, format)
        .unwrap();
}

fn set_age(path: &Path, now: SystemTime, age: Duration) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(now - age)
        .unwrap();
}

fn resize_pipeline(
    source: &Path,
    destination: &Path,
    criteria: FilterCriteria,
    max_height: Option<u32>,
    workers: usize,
) -> Pipeline {
    let spec = TransformSpec::new(max_height, None).unwrap();
    let stage = TransformStage::new(spec, Arc::new(ResizeTransformer::new()));
    Pipeline::new(source, destination, criteria, stage, workers).unwrap()
}

struct AlwaysFails;

impl ImageTransformer for AlwaysFails {
    fn transform(
        &self,
        _input: &mut dyn Read,
        output: &mut dyn Write,
        _spec: &TransformSpec,
    ) -> Result<(), TransformError> {
        output.write_all(b"half-written")?;
        Err(TransformError::Unsupported("refusing".to_string()))
    }
}

/// Holds every file long enough for a cancel to land mid-run.
struct Slow(Duration);

impl ImageTransformer for Slow {
    fn transform(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _spec: &TransformSpec,
    ) -> Result<(), TransformError> {
        std::thread::sleep(self.0);
        std::io::copy(input, output)?;
        Ok(())
    }
}

#[tokio::test]
async fn resizes_large_copies_small_and_skips_unmatched() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_image(&src.path().join("a.jpg"), 200, 300, ImageFormat::Jpeg);
    write_image(&src.path().join("b.jpg"), 400, 800, ImageFormat::Jpeg);
    fs::write(src.path().join("c.txt"), b"notes").unwrap();

    let criteria = FilterCriteria::new("jpg|png", None, 0).unwrap();
    let summary = resize_pipeline(src.path(), dst.path(), criteria, Some(500), 4)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.copied, 1);
    assert_eq!(summary.transformed, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(
        fs::read(src.path().join("a.jpg")).unwrap(),
        fs::read(dst.path().join("a.jpg")).unwrap()
    );

    let resized = image::open(dst.path().join("b.jpg")).unwrap();
    assert_eq!((resized.width(), resized.height()), (250, 500));
    assert_ne!(
        fs::read(src.path().join("b.jpg")).unwrap(),
        fs::read(dst.path().join("b.jpg")).unwrap()
    );

    assert!(!dst.path().join("c.txt").exists());
}

#[tokio::test]
async fn excluded_names_never_reach_destination() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_image(&src.path().join("photo_raw.jpg"), 10, 10, ImageFormat::Jpeg);
    write_image(&src.path().join("photo.jpg"), 10, 10, ImageFormat::Jpeg);

    let criteria = FilterCriteria::new("jpg", Some("_raw"), 0).unwrap();
    let summary = resize_pipeline(src.path(), dst.path(), criteria, Some(500), 2)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert!(dst.path().join("photo.jpg").exists());
    assert!(!dst.path().join("photo_raw.jpg").exists());
}

#[tokio::test]
async fn max_age_skips_old_files() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let now = SystemTime::now();
    let old = src.path().join("old.png");
    let fresh = src.path().join("fresh.png");
    write_image(&old, 10, 10, ImageFormat::Png);
    write_image(&fresh, 10, 10, ImageFormat::Png);
    set_age(&old, now, DAY * 10);
    set_age(&fresh, now, DAY);

    let criteria = FilterCriteria::new("png", None, 7).unwrap();
    let summary = resize_pipeline(src.path(), dst.path(), criteria, Some(500), 2)
        .with_reference_time(now)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert!(dst.path().join("fresh.png").exists());
    assert!(!dst.path().join("old.png").exists());
}

#[tokio::test]
async fn failed_transform_delivers_verbatim_copy() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_image(&src.path().join("big.png"), 50, 900, ImageFormat::Png);

    let criteria = FilterCriteria::new("png", None, 0).unwrap();
    let spec = TransformSpec::new(Some(100), None).unwrap();
    let stage = TransformStage::new(spec, Arc::new(AlwaysFails));
    let pipeline = Pipeline::new(src.path(), dst.path(), criteria, stage, 1).unwrap();

    let actions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&actions);
    let summary = pipeline
        .run_with(move |outcome| sink.lock().unwrap().push(outcome.action))
        .await
        .unwrap();

    assert_eq!(*actions.lock().unwrap(), vec![Action::FellBack]);
    assert_eq!(summary.fell_back, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        fs::read(src.path().join("big.png")).unwrap(),
        fs::read(dst.path().join("big.png")).unwrap()
    );
}

#[tokio::test]
async fn nested_files_land_flat_in_destination() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    fs::create_dir_all(src.path().join("2024/summer")).unwrap();
    write_image(&src.path().join("top.png"), 8, 8, ImageFormat::Png);
    write_image(
        &src.path().join("2024/summer/beach.png"),
        8,
        8,
        ImageFormat::Png,
    );

    let criteria = FilterCriteria::new("png", None, 0).unwrap();
    let summary = resize_pipeline(src.path(), dst.path(), criteria, Some(500), 3)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert!(dst.path().join("top.png").exists());
    assert!(dst.path().join("beach.png").exists());
    assert!(!dst.path().join("2024").exists());
}

#[tokio::test]
async fn second_run_delivers_the_same_set() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_image(&src.path().join("a.png"), 10, 10, ImageFormat::Png);
    write_image(&src.path().join("b.png"), 10, 900, ImageFormat::Png);
    fs::write(src.path().join("skip.txt"), b"x").unwrap();

    let mut listings = Vec::new();
    for _ in 0..2 {
        let criteria = FilterCriteria::new("png", None, 0).unwrap();
        let summary = resize_pipeline(src.path(), dst.path(), criteria, Some(100), 2)
            .run()
            .await
            .unwrap();
        assert_eq!(summary.processed, 2);

        let mut names: Vec<_> = fs::read_dir(dst.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        listings.push(names);
    }

    assert_eq!(listings[0], listings[1]);
    assert_eq!(listings[0].len(), 2);
}

#[tokio::test]
async fn cancel_mid_run_returns_promptly() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    for i in 0..40 {
        write_image(&src.path().join(format!("{i:02}.png")), 4, 400, ImageFormat::Png);
    }

    let criteria = FilterCriteria::new("png", None, 0).unwrap();
    let spec = TransformSpec::new(Some(100), None).unwrap();
    let stage = TransformStage::new(spec, Arc::new(Slow(Duration::from_millis(100))));
    let cancel = CancellationSignal::new();
    let pipeline = Pipeline::new(src.path(), dst.path(), criteria, stage, 2)
        .unwrap()
        .with_buffer_size(2)
        .with_cancellation(cancel.clone());

    let run = tokio::spawn(pipeline.run());
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("pipeline should stop shortly after cancel")
        .unwrap();
    assert!(result.unwrap_err().is_canceled());

    let delivered = fs::read_dir(dst.path()).unwrap().count();
    assert!(delivered < 40, "cancel should stop before the whole tree");
}

#[cfg(unix)]
#[tokio::test]
async fn traversal_error_keeps_earlier_deliveries() {
    use std::os::unix::fs::PermissionsExt;

    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let locked = src.path().join("b_locked");
    write_image(&src.path().join("a.png"), 8, 8, ImageFormat::Png);
    fs::create_dir(&locked).unwrap();
    write_image(&locked.join("inner.png"), 8, 8, ImageFormat::Png);
    write_image(&src.path().join("c.png"), 8, 8, ImageFormat::Png);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Permission bits are not enforced for root.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let criteria = FilterCriteria::new("png", None, 0).unwrap();
    let result = resize_pipeline(src.path(), dst.path(), criteria, Some(500), 2)
        .run()
        .await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(PipelineError::Walk { .. })));
    assert!(dst.path().join("a.png").exists());
    assert!(!dst.path().join("c.png").exists());
    assert!(!dst.path().join("inner.png").exists());
}
