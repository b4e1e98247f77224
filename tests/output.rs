//! Summary file naming and writing tests.

use std::path::Path;

use vidsum::output::{save_summary, summary_output_path};

#[test]
fn output_name_uses_stem() {
    assert_eq!(
        summary_output_path("out", "videos/lecture 01.mp4"),
        Path::new("out/lecture 01_summary.md")
    );
    assert_eq!(
        summary_output_path("out", "archive.tar.mkv"),
        Path::new("out/archive.tar_summary.md")
    );
    assert_eq!(
        summary_output_path("out", "no_extension"),
        Path::new("out/no_extension_summary.md")
    );
}

#[test]
fn save_creates_directory_and_writes_utf8() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let out_dir = temporary_directory.path().join("output").join("summaries");

    let text = "# Notes\n\n- ownership\n- emprunt vérifié ✓\n";
    let path = save_summary(&out_dir, "talks/rust.mp4", text).unwrap();

    assert_eq!(path, out_dir.join("rust_summary.md"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn save_overwrites_existing_summary() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let out_dir = temporary_directory.path();

    save_summary(out_dir, "clip.mp4", "first").unwrap();
    let path = save_summary(out_dir, "clip.mp4", "second").unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
}

#[test]
fn save_into_file_path_fails() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let blocker = temporary_directory.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let result = save_summary(&blocker, "clip.mp4", "text");
    assert!(matches!(result, Err(vidsum::VidsumError::IoError(_))));
}
