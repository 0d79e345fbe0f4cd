//! End-to-end archive/restore behavior

use bale_core::{Archiver, CompressionCodec, DiagnosticEvent, DiagnosticsSink, Error};
use filetime::FileTime;
use std::cell::RefCell;
use std::fs::{self, File};
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

fn build_fixture(root: &Path) {
    fs::create_dir_all(root.join("build")).unwrap();
    fs::write(root.join("build/a.bin"), b"0123456789").unwrap();
    fs::write(root.join("build/b.bin"), b"").unwrap();
}

#[test]
fn test_archive_restore_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    build_fixture(&src);
    let archive_path = temp_dir.path().join("out.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["build/*.bin"])
        .unwrap();
    assert!(archive_path.exists());

    let dst = temp_dir.path().join("dst");
    fs::create_dir_all(&dst).unwrap();
    Archiver::new()
        .with_working_dir(&dst)
        .restore(&archive_path)
        .unwrap();

    // exactly the two matched files, original contents, nothing else
    assert_eq!(fs::read(dst.join("build/a.bin")).unwrap(), b"0123456789");
    assert_eq!(fs::read(dst.join("build/b.bin")).unwrap(), b"");
    assert_eq!(fs::read_dir(dst.join("build")).unwrap().count(), 2);
    assert_eq!(fs::read_dir(&dst).unwrap().count(), 1);
}

#[test]
fn test_directory_tree_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    fs::create_dir_all(src.join("data/nested")).unwrap();
    fs::create_dir_all(src.join("data/empty")).unwrap();
    fs::write(src.join("data/top.txt"), b"top").unwrap();
    fs::write(src.join("data/nested/deep.txt"), b"deep").unwrap();
    let archive_path = temp_dir.path().join("tree.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["data"])
        .unwrap();

    let dst = temp_dir.path().join("dst");
    fs::create_dir_all(&dst).unwrap();
    Archiver::new()
        .with_working_dir(&dst)
        .restore(&archive_path)
        .unwrap();

    // directories come back as directories, not zero-byte files
    assert!(dst.join("data").is_dir());
    assert!(dst.join("data/empty").is_dir());
    assert!(dst.join("data/nested").is_dir());
    assert_eq!(fs::read(dst.join("data/top.txt")).unwrap(), b"top");
    assert_eq!(fs::read(dst.join("data/nested/deep.txt")).unwrap(), b"deep");
}

#[test]
fn test_mtime_preserved() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    build_fixture(&src);
    filetime::set_file_mtime(
        src.join("build/a.bin"),
        FileTime::from_unix_time(1_600_000_000, 0),
    )
    .unwrap();
    let archive_path = temp_dir.path().join("out.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["build/a.bin"])
        .unwrap();

    let dst = temp_dir.path().join("dst");
    fs::create_dir_all(&dst).unwrap();
    Archiver::new()
        .with_working_dir(&dst)
        .restore(&archive_path)
        .unwrap();

    let metadata = fs::metadata(dst.join("build/a.bin")).unwrap();
    let restored = FileTime::from_last_modification_time(&metadata);
    assert_eq!(restored.unix_seconds(), 1_600_000_000);
}

#[cfg(unix)]
#[test]
fn test_file_permissions_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("run.sh"), b"#!/bin/sh\n").unwrap();
    fs::set_permissions(src.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
    let archive_path = temp_dir.path().join("out.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["run.sh"])
        .unwrap();

    let dst = temp_dir.path().join("dst");
    fs::create_dir_all(&dst).unwrap();
    Archiver::new()
        .with_working_dir(&dst)
        .restore(&archive_path)
        .unwrap();

    let mode = fs::metadata(dst.join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn test_empty_match_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    let archive_path = temp_dir.path().join("empty.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["missing-*"])
        .unwrap();

    let entries = Archiver::new().list(&archive_path).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn test_invalid_pattern_aborts_before_writing() {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join("never.bale");

    let err = Archiver::new()
        .with_working_dir(temp_dir.path())
        .archive(&archive_path, &["oops["])
        .unwrap_err();

    assert!(matches!(err, Error::InvalidPattern { .. }));
    assert!(!archive_path.exists());
}

#[test]
fn test_overlapping_patterns_yield_one_entry_per_path() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    build_fixture(&src);
    let archive_path = temp_dir.path().join("out.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["build/a.bin", "build/*.bin"])
        .unwrap();

    let entries = Archiver::new().list(&archive_path).unwrap();
    let count = entries
        .iter()
        .filter(|entry| entry.path == Path::new("build/a.bin"))
        .count();
    assert_eq!(count, 1);
}

#[test]
fn test_entries_keep_walk_order() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    fs::create_dir_all(src.join("top/sub")).unwrap();
    fs::write(src.join("top/b.txt"), b"b").unwrap();
    fs::write(src.join("top/a.txt"), b"a").unwrap();
    fs::write(src.join("top/sub/c.txt"), b"c").unwrap();
    let archive_path = temp_dir.path().join("out.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["top"])
        .unwrap();

    let paths: Vec<_> = Archiver::new()
        .list(&archive_path)
        .unwrap()
        .into_iter()
        .map(|entry| entry.path)
        .collect();

    // pre-order, root first, siblings in name order
    assert_eq!(
        paths,
        vec![
            Path::new("top").to_path_buf(),
            Path::new("top/a.txt").to_path_buf(),
            Path::new("top/b.txt").to_path_buf(),
            Path::new("top/sub").to_path_buf(),
            Path::new("top/sub/c.txt").to_path_buf(),
        ]
    );
}

#[test]
fn test_restore_overwrites_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    build_fixture(&src);
    let archive_path = temp_dir.path().join("out.bale");

    Archiver::new()
        .with_working_dir(&src)
        .archive(&archive_path, &["build/a.bin"])
        .unwrap();

    let dst = temp_dir.path().join("dst");
    fs::create_dir_all(dst.join("build")).unwrap();
    fs::write(dst.join("build/a.bin"), b"stale content that is longer").unwrap();

    Archiver::new()
        .with_working_dir(&dst)
        .restore(&archive_path)
        .unwrap();

    assert_eq!(fs::read(dst.join("build/a.bin")).unwrap(), b"0123456789");
}

#[test]
fn test_restore_refuses_escaping_paths() {
    use std::io::Write;

    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join("evil.bale");

    // hand-craft a raw container record whose path points outside the
    // restore root; the writer itself refuses to produce such paths
    let mut header = tar::Header::new_gnu();
    header.as_gnu_mut().unwrap().name[..11].copy_from_slice(b"../evil.txt");
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(5);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    let codec = CompressionCodec::default();
    let mut encoder = codec.encoder(File::create(&archive_path).unwrap()).unwrap();
    encoder.write_all(header.as_bytes()).unwrap();
    encoder.write_all(b"hello").unwrap();
    encoder.write_all(&[0u8; 507]).unwrap(); // pad content to a full block
    encoder.write_all(&[0u8; 1024]).unwrap(); // end-of-stream marker
    encoder.finish().unwrap();

    let dst = temp_dir.path().join("dst");
    fs::create_dir_all(&dst).unwrap();
    let err = Archiver::new()
        .with_working_dir(&dst)
        .restore(&archive_path)
        .unwrap_err();

    assert!(matches!(err, Error::UnsafePath(_)));
    assert!(!temp_dir.path().join("evil.txt").exists());
}

struct RecordingSink(Rc<RefCell<Vec<&'static str>>>);

impl DiagnosticsSink for RecordingSink {
    fn event(&mut self, event: DiagnosticEvent<'_>) {
        let name = match event {
            DiagnosticEvent::PatternExpanded { .. } => "pattern",
            DiagnosticEvent::EntryArchived { .. } => "archived",
            DiagnosticEvent::EntryRestored { .. } => "restored",
            DiagnosticEvent::MemorySampled(_) => "memory",
            DiagnosticEvent::ArchiveFinished { .. } => "archive-finished",
            DiagnosticEvent::RestoreFinished { .. } => "restore-finished",
        };
        self.0.borrow_mut().push(name);
    }
}

#[test]
fn test_diagnostics_sink_receives_pipeline_events() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    build_fixture(&src);
    let archive_path = temp_dir.path().join("out.bale");

    let events = Rc::new(RefCell::new(Vec::new()));
    Archiver::new()
        .with_working_dir(&src)
        .with_diagnostics(Box::new(RecordingSink(events.clone())))
        .archive(&archive_path, &["build/*.bin"])
        .unwrap();

    let events = events.borrow();
    assert_eq!(events.iter().filter(|name| **name == "pattern").count(), 1);
    assert_eq!(events.iter().filter(|name| **name == "archived").count(), 2);
    assert_eq!(events.last(), Some(&"archive-finished"));
}
