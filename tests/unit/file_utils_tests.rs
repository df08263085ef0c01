/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;

use alexandria::file_utils::{speaker_slug, FileManager};

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "book.txt", "Once upon a time.")?;

    assert!(FileManager::file_exists(&test_file));

    Ok(())
}

/// Test that file_exists is false for directories and missing paths
#[test]
fn test_file_exists_withDirectoryOrMissingPath_shouldReturnFalse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.wav")));

    Ok(())
}

/// Test that copy_file creates the target directory
#[test]
fn test_copy_file_withNestedTarget_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "unit.wav", "RIFF")?;
    let target = temp_dir
        .path()
        .join("segments")
        .join(FileManager::segment_file_name(3, "Zoë", "wav"));

    FileManager::copy_file(&source, &target)?;

    assert!(FileManager::file_exists(&target));
    assert!(target.ends_with("segments/0003_zoe.wav"));

    Ok(())
}

/// Test that ensure_dir is idempotent
#[test]
fn test_ensure_dir_calledTwice_shouldSucceed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().join("output_audio");

    FileManager::ensure_dir(&dir)?;
    FileManager::ensure_dir(&dir)?;

    assert!(dir.is_dir());

    Ok(())
}

/// Test that output names fall back when the manuscript has no stem
#[test]
fn test_generate_output_path_withoutStem_shouldUseFallback() {
    let path = FileManager::generate_output_path("", Path::new("out"), "wav");

    assert_eq!(path, Path::new("out/manuscript_audiobook.wav"));
}

/// Distinct speakers keep distinct slugs
#[test]
fn test_speaker_slug_shouldDistinguishCommonLabels() {
    let labels = ["NARRATOR", "Captain Ahab", "ISHMAEL", "Mrs. Danvers"];
    let slugs: Vec<String> = labels.iter().map(|l| speaker_slug(l)).collect();

    assert_eq!(slugs, vec!["narrator", "captain_ahab", "ishmael", "mrs_danvers"]);
}
