//! Copyright © 2025-2026 Gearbox Team. All Rights Reserved.
//!
//! This file is part of Cog.
//! The Cog project belongs to the Gearbox Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Resource Extractor
//!
//! Copies the bundled sub-trees of a plugin archive onto local disk:
//!
//! 1. platform-appropriate library archives under `lib/` (the sibling
//!    platform's sub-directory is excluded) to a per-plugin library
//!    directory;
//! 2. platform-appropriate native shared objects under
//!    `lib/<platform>/native/` to the process's native-library search path;
//! 3. bundled image assets under `images/` to a per-plugin image directory.
//!
//! Every extracted path is scheduled with the deferred-deletion registry so
//! the files are removed at shutdown; extraction is idempotent because an
//! existing target file is never rewritten. The three categories fail
//! independently: an IO error in one sub-tree never aborts the others, and
//! each is logged with its own success flag.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::config::CogConfig;
use crate::errors::Result;
use crate::host::CogShutdownRegistry;
use crate::manifest::CogPluginMetadata;

const LIB_PREFIX: &str = "lib/";
const IMAGE_PREFIX: &str = "images/";
const NATIVE_DIR: &str = "native";

/// Platform sub-directory names recognized under `lib/`.
pub const COG_PLATFORM_DIRS: [&str; 3] = ["windows", "macos", "linux"];

/// Platform sub-directory matching the current target.
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "macos",
        _ => "linux",
    }
}

/// Per-category outcome of one extraction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CogExtractionReport {
    pub libraries: bool,
    pub natives: bool,
    pub images: bool,
}

impl CogExtractionReport {
    pub fn all_succeeded(&self) -> bool {
        self.libraries && self.natives && self.images
    }
}

/// Extractor copying bundled archive sub-trees to the directories named by
/// the host configuration.
pub struct CogResourceExtractor<'a> {
    config: &'a CogConfig,
    shutdown: &'a dyn CogShutdownRegistry,
}

impl<'a> CogResourceExtractor<'a> {
    pub fn new(config: &'a CogConfig, shutdown: &'a dyn CogShutdownRegistry) -> Self {
        CogResourceExtractor { config, shutdown }
    }

    /// Extract all three sub-trees for one plugin entry. Each category is
    /// attempted regardless of the others' outcome.
    pub fn extract(&self, metadata: &CogPluginMetadata) -> CogExtractionReport {
        let mut report = CogExtractionReport::default();
        report.libraries = self.run_category(metadata, "libraries", Self::extract_libraries);
        report.natives = self.run_category(metadata, "natives", Self::extract_natives);
        report.images = self.run_category(metadata, "images", Self::extract_images);
        report
    }

    fn run_category(
        &self,
        metadata: &CogPluginMetadata,
        category: &str,
        f: fn(&Self, &CogPluginMetadata) -> Result<u32>,
    ) -> bool {
        match f(self, metadata) {
            Ok(count) => {
                log::debug!(
                    "extract.{}.done: sub-tree extracted - entry={}, new_files={}",
                    category,
                    metadata.main_entry,
                    count
                );
                true
            }
            Err(err) => {
                log::error!(
                    "extract.{}.failed: sub-tree extraction failed - entry={}, archive={}, error={}",
                    category,
                    metadata.main_entry,
                    metadata.archive_path.to_string_lossy(),
                    err
                );
                false
            }
        }
    }

    /// Library archives: direct children of `lib/` plus the current
    /// platform's sub-directory, excluding its nested `native/` tree and
    /// every sibling platform directory.
    pub fn extract_libraries(&self, metadata: &CogPluginMetadata) -> Result<u32> {
        let dest = self.config.lib_dir.join(metadata.entry_name());
        let platform_prefix = format!("{}{}/", LIB_PREFIX, current_platform());
        self.copy_matching(metadata, &dest, |name| {
            let rest = name.strip_prefix(LIB_PREFIX)?;
            if !rest.contains('/') {
                return Some(rest.to_string());
            }
            let platform_rest = name.strip_prefix(&platform_prefix)?;
            if platform_rest.contains('/') {
                // Nested trees under the platform directory are natives.
                return None;
            }
            Some(platform_rest.to_string())
        })
    }

    /// Native shared objects for the current platform, flattened into the
    /// process's native-library search path.
    pub fn extract_natives(&self, metadata: &CogPluginMetadata) -> Result<u32> {
        let native_prefix = format!(
            "{}{}/{}/",
            LIB_PREFIX,
            current_platform(),
            NATIVE_DIR
        );
        let dest = self.config.native_dir.clone();
        self.copy_matching(metadata, &dest, |name| {
            let rest = name.strip_prefix(&native_prefix)?;
            if rest.contains('/') {
                return None;
            }
            Some(rest.to_string())
        })
    }

    /// Bundled image assets, preserving their sub-tree layout.
    pub fn extract_images(&self, metadata: &CogPluginMetadata) -> Result<u32> {
        let dest = self.config.image_dir.join(metadata.entry_name());
        self.copy_matching(metadata, &dest, |name| {
            name.strip_prefix(IMAGE_PREFIX).map(str::to_string)
        })
    }

    /// Walk the archive once, copying every entry whose name the selector
    /// maps to a destination-relative path. Existing targets are left
    /// untouched; missing parent directories are created; every target is
    /// scheduled for deletion at shutdown.
    fn copy_matching(
        &self,
        metadata: &CogPluginMetadata,
        dest_root: &Path,
        select: impl Fn(&str) -> Option<String>,
    ) -> Result<u32> {
        let file = File::open(&metadata.archive_path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut extracted = 0u32;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let relative = match select(&name) {
                Some(relative) if !relative.is_empty() => relative,
                _ => continue,
            };
            let relative = match sanitize(&relative) {
                Some(relative) => relative,
                None => {
                    log::warn!(
                        "extract.copy.unsafe_path: archive entry escapes the destination - entry={}, name={}",
                        metadata.main_entry,
                        name
                    );
                    continue;
                }
            };

            let target = dest_root.join(relative);
            if let Some(parent) = target.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            if target.exists() {
                self.shutdown.schedule_delete_on_shutdown(&target);
                continue;
            }

            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            self.shutdown.schedule_delete_on_shutdown(&target);
            extracted += 1;
        }

        Ok(extracted)
    }
}

/// Reject archive entry paths that would escape the destination root.
fn sanitize(relative: &str) -> Option<PathBuf> {
    let path = Path::new(relative);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
