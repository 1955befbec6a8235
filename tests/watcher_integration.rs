//! Integration tests for the watch supervisor against a real filesystem.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage};
use imgwatch::error::{TransformError, WatcherError};
use imgwatch::transform::{ImageTransform, OverlayResize};
use imgwatch::watcher::{DirectoryPair, TransformParams, WatchSupervisor};
use imgwatch::Error;
use tempfile::TempDir;

/// Copies the source unchanged so tests do not depend on image fixtures.
struct CopyTransform;

impl ImageTransform for CopyTransform {
    fn apply(
        &self,
        source: &Path,
        output_dir: &Path,
        _params: &TransformParams,
    ) -> Result<PathBuf, TransformError> {
        let out = output_dir.join(source.file_name().unwrap());
        fs::copy(source, &out).map_err(|e| TransformError::Open {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(out)
    }
}

/// Poll until `condition` holds or ten seconds pass.
fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

/// Write through a staging directory so the watcher sees one complete file.
fn drop_file(staging: &Path, dest_dir: &Path, name: &str, bytes: &[u8]) {
    fs::create_dir_all(staging).unwrap();
    let staged = staging.join(name);
    fs::write(&staged, bytes).unwrap();
    fs::rename(&staged, dest_dir.join(name)).unwrap();
}

/// A 600x400 JPEG carrying an EXIF `DateTime` of 2024:09:04 07:54:27.
fn jpeg_with_exif_date() -> Vec<u8> {
    let img = RgbImage::from_pixel(600, 400, image::Rgb([40, 90, 160]));
    let mut encoded = Vec::new();
    img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
        .unwrap();

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x0132u16.to_be_bytes());
    tiff.extend_from_slice(&2u16.to_be_bytes());
    tiff.extend_from_slice(&20u32.to_be_bytes());
    tiff.extend_from_slice(&26u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(b"2024:09:04 07:54:27\x00");

    let mut app1 = vec![0xFF, 0xE1];
    let len = u16::try_from(2 + 6 + tiff.len()).unwrap();
    app1.extend_from_slice(&len.to_be_bytes());
    app1.extend_from_slice(b"Exif\x00\x00");
    app1.extend_from_slice(&tiff);

    let mut out = encoded[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&encoded[2..]);
    out
}

/// Files created after start are processed and deletions remove the artifact.
#[test]
fn test_live_create_and_delete() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let src = root.join("src");
    let out = root.join("out");
    fs::create_dir_all(&src).unwrap();

    let supervisor =
        WatchSupervisor::start(vec![DirectoryPair::new(&src, &out)], Arc::new(CopyTransform))
            .unwrap();
    assert!(out.is_dir(), "output directory should be created");

    drop_file(&root.join("staging"), &src, "a.jpg", b"alpha");
    drop_file(&root.join("staging"), &src, "notes.txt", b"ignored");

    let derived = out.join("a.jpg");
    assert!(wait_for(|| fs::read(&derived).ok().as_deref() == Some(b"alpha".as_slice())));
    assert!(!out.join("notes.txt").exists());

    let handler = supervisor.handler(0).unwrap();
    assert_eq!(handler.artifact_for(&src.join("a.jpg")), Some(derived.clone()));

    fs::remove_file(src.join("a.jpg")).unwrap();
    assert!(wait_for(|| !derived.exists()));
    assert!(wait_for(|| !handler.is_tracked(&src.join("a.jpg"))));

    supervisor.stop();
}

/// A rename inside the source directory keeps the old artifact by default.
#[test]
fn test_rename_keeps_old_artifact() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let src = root.join("src");
    let out = root.join("out");
    fs::create_dir_all(&src).unwrap();

    let supervisor =
        WatchSupervisor::start(vec![DirectoryPair::new(&src, &out)], Arc::new(CopyTransform))
            .unwrap();

    drop_file(&root.join("staging"), &src, "old.jpg", b"pic");
    assert!(wait_for(|| out.join("old.jpg").exists()));

    fs::rename(src.join("old.jpg"), src.join("new.jpg")).unwrap();
    assert!(wait_for(|| out.join("new.jpg").exists()));

    let handler = supervisor.handler(0).unwrap();
    assert!(wait_for(|| handler.is_tracked(&src.join("new.jpg"))));
    std::thread::sleep(Duration::from_millis(300));
    assert!(out.join("old.jpg").exists());
    assert!(handler.is_tracked(&src.join("old.jpg")));

    supervisor.stop();
}

/// Backfill only touches sources without an artifact.
#[test]
fn test_backfill_skips_existing() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let src = root.join("src");
    let out = root.join("out");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&out).unwrap();
    fs::write(src.join("a.jpg"), b"new a").unwrap();
    fs::write(src.join("b.jpg"), b"new b").unwrap();
    fs::write(out.join("a.jpg"), b"old a").unwrap();

    let supervisor =
        WatchSupervisor::start(vec![DirectoryPair::new(&src, &out)], Arc::new(CopyTransform))
            .unwrap();

    assert_eq!(supervisor.process_existing_files(), 1);
    assert_eq!(fs::read(out.join("a.jpg")).unwrap(), b"old a");
    assert_eq!(fs::read(out.join("b.jpg")).unwrap(), b"new b");

    let status = supervisor.status(0).unwrap();
    assert_eq!(status.processed_images, 1);
    assert_eq!(status.failed_images, 0);
    assert_eq!(status.total_images, 2);
}

/// Pairs are independent and addressed by configuration order.
#[test]
fn test_multiple_pairs() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let mut pairs = Vec::new();
    for i in 0..2 {
        let src = root.join(format!("src{i}"));
        fs::create_dir_all(&src).unwrap();
        pairs.push(DirectoryPair::new(src, root.join(format!("out{i}"))));
    }

    let supervisor = WatchSupervisor::start(pairs, Arc::new(CopyTransform)).unwrap();
    assert_eq!(supervisor.directory_count(), 2);

    drop_file(
        &root.join("staging"),
        &root.join("src1"),
        "x.png",
        b"x",
    );
    assert!(wait_for(|| root.join("out1").join("x.png").exists()));
    assert!(!root.join("out0").join("x.png").exists());
    assert_eq!(
        supervisor.list_artifacts(1, None).unwrap(),
        vec![root.join("out1").join("x.png")]
    );

    let err = supervisor.status(2).unwrap_err();
    assert!(matches!(
        err,
        Error::Watcher(WatcherError::InvalidDirectoryIndex { index: 2, count: 2 })
    ));
    assert!(err.is_client_error());
}

/// A missing source directory is fatal at start.
#[test]
fn test_missing_source_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let pair = DirectoryPair::new(root.join("absent"), root.join("out"));

    let err = WatchSupervisor::start(vec![pair], Arc::new(CopyTransform)).unwrap_err();
    assert!(matches!(
        err,
        Error::Watcher(WatcherError::DirectoryNotFound { .. })
    ));
}

/// A dated JPEG is resized to 300px and removed again on delete.
#[test]
fn test_dated_jpeg_resized_and_removed() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let src = root.join("p1");
    let out = root.join("p1_resized");
    fs::create_dir_all(&src).unwrap();

    let supervisor = WatchSupervisor::start(
        vec![DirectoryPair::new(&src, &out)],
        Arc::new(OverlayResize::new()),
    )
    .unwrap();

    drop_file(
        &root.join("staging"),
        &src,
        "img001.jpg",
        &jpeg_with_exif_date(),
    );

    let derived = out.join("img001.jpg");
    let handler = supervisor.handler(0).unwrap();
    assert!(wait_for(|| handler.status().processed_images == 1));
    assert_eq!(image::image_dimensions(&derived).unwrap(), (300, 200));

    let status = handler.status();
    assert_eq!(status.failed_images, 0);
    assert_eq!(status.total_images, 1);

    fs::remove_file(src.join("img001.jpg")).unwrap();
    assert!(wait_for(|| !derived.exists()));

    supervisor.stop();
}

/// Images without a capture date are counted as failures and leave no output.
#[test]
fn test_undated_jpeg_counts_failure() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let src = root.join("src");
    let out = root.join("out");
    fs::create_dir_all(&src).unwrap();

    let mut plain = Vec::new();
    RgbImage::new(40, 20)
        .write_to(&mut Cursor::new(&mut plain), ImageFormat::Jpeg)
        .unwrap();
    fs::write(src.join("plain.jpg"), &plain).unwrap();

    let supervisor = WatchSupervisor::start(
        vec![DirectoryPair::new(&src, &out)],
        Arc::new(OverlayResize::new()),
    )
    .unwrap();

    assert_eq!(supervisor.process_existing_files(), 1);
    let status = supervisor.status(0).unwrap();
    assert_eq!(status.failed_images, 1);
    assert_eq!(status.processed_images, 0);
    assert!(!out.join("plain.jpg").exists());
}
