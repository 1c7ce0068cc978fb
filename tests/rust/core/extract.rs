//! Copyright © 2025-2026 Gearbox Team. All Rights Reserved.
//!
//! This file is part of Cog.
//! The Cog project belongs to the Gearbox Team.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use cogx::config::CogConfigBuilder;
use cogx::extract::{current_platform, CogResourceExtractor, COG_PLATFORM_DIRS};
use cogx::host::CogDeferredDeleter;
use cogx::manifest::CogPluginMetadata;

fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn metadata_for(archive: &Path, main_entry: &str) -> CogPluginMetadata {
    CogPluginMetadata {
        archive_path: archive.to_path_buf(),
        main_entry: main_entry.to_string(),
        version: "1.0".to_string(),
        author: "test".to_string(),
        default_name: main_entry.to_string(),
        default_description: String::new(),
        has_help: false,
        locales: BTreeSet::new(),
        default_locale: "en".to_string(),
    }
}

fn other_platform() -> &'static str {
    COG_PLATFORM_DIRS
        .iter()
        .find(|p| **p != current_platform())
        .copied()
        .unwrap()
}

#[test]
fn test_extract_all_categories() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("gadget.zip");
    let platform = current_platform();
    let sibling = other_platform();
    write_archive(
        &archive,
        &[
            ("plugin.properties", "plugin.mainclass=demo.Gadget\n"),
            ("lib/common.jar", "common bytes"),
            (&format!("lib/{}/plat.jar", platform), "platform bytes"),
            (&format!("lib/{}/other.jar", sibling), "sibling bytes"),
            (&format!("lib/{}/native/gadget.bin", platform), "native bytes"),
            (&format!("lib/{}/native/other.bin", sibling), "sibling native"),
            ("images/icon.png", "icon bytes"),
            ("images/toolbar/small.png", "small icon"),
        ],
    );

    let config = CogConfigBuilder {
        plugin_dir: Some(dir.path().join("plugins")),
        lib_dir: Some(dir.path().join("lib")),
        native_dir: Some(dir.path().join("native")),
        image_dir: Some(dir.path().join("images")),
        ..Default::default()
    }
    .build();
    let deleter = CogDeferredDeleter::new();
    let metadata = metadata_for(&archive, "demo.Gadget");

    let report = CogResourceExtractor::new(&config, &deleter).extract(&metadata);
    assert!(report.all_succeeded());

    let lib_root = config.lib_dir.join("Gadget");
    assert_eq!(
        std::fs::read_to_string(lib_root.join("common.jar")).unwrap(),
        "common bytes"
    );
    assert_eq!(
        std::fs::read_to_string(lib_root.join("plat.jar")).unwrap(),
        "platform bytes"
    );
    // Sibling platform content never lands on disk.
    assert!(!lib_root.join("other.jar").exists());

    // Natives are flattened into the shared native directory.
    assert_eq!(
        std::fs::read_to_string(config.native_dir.join("gadget.bin")).unwrap(),
        "native bytes"
    );
    assert!(!config.native_dir.join("other.bin").exists());

    let image_root = config.image_dir.join("Gadget");
    assert!(image_root.join("icon.png").exists());
    assert!(image_root.join("toolbar/small.png").exists());
}

#[test]
fn test_extraction_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("tool.zip");
    write_archive(
        &archive,
        &[
            ("plugin.properties", "plugin.mainclass=demo.Tool\n"),
            ("lib/helper.jar", "original"),
        ],
    );

    let config = CogConfigBuilder {
        lib_dir: Some(dir.path().join("lib")),
        native_dir: Some(dir.path().join("native")),
        image_dir: Some(dir.path().join("images")),
        ..Default::default()
    }
    .build();
    let deleter = CogDeferredDeleter::new();
    let metadata = metadata_for(&archive, "demo.Tool");
    let extractor = CogResourceExtractor::new(&config, &deleter);

    assert!(extractor.extract(&metadata).all_succeeded());
    let target = config.lib_dir.join("Tool/helper.jar");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");

    // A second pass must leave existing targets untouched.
    std::fs::write(&target, "locally modified").unwrap();
    assert!(extractor.extract(&metadata).all_succeeded());
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "locally modified");
}

#[test]
fn test_extracted_paths_are_scheduled_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("temp.zip");
    write_archive(
        &archive,
        &[
            ("plugin.properties", "plugin.mainclass=demo.Temp\n"),
            ("lib/scratch.jar", "scratch"),
            ("images/banner.png", "banner"),
        ],
    );

    let config = CogConfigBuilder {
        lib_dir: Some(dir.path().join("lib")),
        native_dir: Some(dir.path().join("native")),
        image_dir: Some(dir.path().join("images")),
        ..Default::default()
    }
    .build();
    let deleter = CogDeferredDeleter::new();
    let metadata = metadata_for(&archive, "demo.Temp");

    CogResourceExtractor::new(&config, &deleter).extract(&metadata);
    let lib_target = config.lib_dir.join("Temp/scratch.jar");
    let image_target = config.image_dir.join("Temp/banner.png");
    let scheduled = deleter.scheduled();
    assert!(scheduled.contains(&lib_target));
    assert!(scheduled.contains(&image_target));

    deleter.run_deletions();
    assert!(!lib_target.exists());
    assert!(!image_target.exists());
}

#[test]
fn test_escaping_archive_entries_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("evil.zip");
    write_archive(
        &archive,
        &[
            ("plugin.properties", "plugin.mainclass=demo.Evil\n"),
            ("images/../../escape.txt", "should never land"),
            ("images/safe.png", "safe"),
        ],
    );

    let config = CogConfigBuilder {
        lib_dir: Some(dir.path().join("lib")),
        native_dir: Some(dir.path().join("native")),
        image_dir: Some(dir.path().join("images")),
        ..Default::default()
    }
    .build();
    let deleter = CogDeferredDeleter::new();
    let metadata = metadata_for(&archive, "demo.Evil");

    let report = CogResourceExtractor::new(&config, &deleter).extract(&metadata);
    // The unsafe entry is skipped with a warning, not treated as a failure.
    assert!(report.images);
    assert!(config.image_dir.join("Evil/safe.png").exists());
    assert!(!dir.path().join("escape.txt").exists());
}

#[test]
fn test_missing_archive_fails_every_category() {
    let dir = tempfile::tempdir().unwrap();
    let config = CogConfigBuilder {
        lib_dir: Some(dir.path().join("lib")),
        native_dir: Some(dir.path().join("native")),
        image_dir: Some(dir.path().join("images")),
        ..Default::default()
    }
    .build();
    let deleter = CogDeferredDeleter::new();
    let metadata = metadata_for(&dir.path().join("gone.zip"), "demo.Gone");

    let report = CogResourceExtractor::new(&config, &deleter).extract(&metadata);
    assert!(!report.libraries);
    assert!(!report.natives);
    assert!(!report.images);
    assert!(!report.all_succeeded());
}
