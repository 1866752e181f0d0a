use crate::upgrade::{copy_directory, has_files_modified_since};

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use googletest::assert_that;
use googletest::prelude::eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn seeded_source() -> TempDir {
    let source = TempDir::new().unwrap();
    fs::create_dir_all(source.path().join("Binaries/Win64")).unwrap();
    fs::write(source.path().join("Binaries/Win64/server.exe"), b"binary").unwrap();
    fs::write(source.path().join("readme.txt"), b"hello").unwrap();
    source
}

#[test]
fn given_cache_tree_when_copied_then_files_and_directories_recreated() {
    // Given
    let source = seeded_source();
    let dest = TempDir::new().unwrap();
    let target = dest.path().join("install");
    let entered = AtomicU64::new(0);

    // When
    let stats = copy_directory(
        source.path(),
        &target,
        false,
        &CancellationToken::new(),
        &|count| entered.store(count, Ordering::SeqCst),
    )
    .unwrap();

    // Then
    assert_that!(stats.directories, eq(2));
    assert_that!(stats.files_copied, eq(2));
    assert_that!(entered.load(Ordering::SeqCst), eq(2));
    assert_that!(
        fs::read(target.join("Binaries/Win64/server.exe")).unwrap(),
        eq(&b"binary".to_vec())
    );
}

#[test]
fn given_up_to_date_destination_when_smart_copied_then_files_skipped() {
    // Given
    let source = seeded_source();
    let dest = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    copy_directory(source.path(), dest.path(), false, &cancel, &|_| {}).unwrap();

    // When
    let stats = copy_directory(source.path(), dest.path(), true, &cancel, &|_| {}).unwrap();

    // Then
    assert_that!(stats.files_copied, eq(0));
    assert_that!(stats.files_skipped, eq(2));
}

#[test]
fn given_changed_size_when_smart_copied_then_file_replaced() {
    // Given
    let source = seeded_source();
    let dest = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    copy_directory(source.path(), dest.path(), false, &cancel, &|_| {}).unwrap();
    fs::write(dest.path().join("readme.txt"), b"stale and longer").unwrap();

    // When
    let stats = copy_directory(source.path(), dest.path(), true, &cancel, &|_| {}).unwrap();

    // Then
    assert_that!(stats.files_copied, eq(1));
    assert_that!(
        fs::read(dest.path().join("readme.txt")).unwrap(),
        eq(&b"hello".to_vec())
    );
}

#[test]
fn given_cancelled_token_when_copied_then_cancelled_error() {
    // Given
    let source = seeded_source();
    let dest = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    // When
    let result = copy_directory(source.path(), dest.path(), false, &cancel, &|_| {});

    // Then
    assert_that!(result.is_err_and(|e| e.is_cancelled()), eq(true));
}

#[test]
fn given_file_written_after_timestamp_when_scanned_then_modified() {
    // Given
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("old.pak"), b"old").unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let since = SystemTime::now();

    // When
    let before = has_files_modified_since(dir.path(), since);
    std::thread::sleep(Duration::from_millis(50));
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/new.pak"), b"new").unwrap();
    let after = has_files_modified_since(dir.path(), since);

    // Then
    assert_that!(before, eq(false));
    assert_that!(after, eq(true));
}
