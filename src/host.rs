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

//! # Host Collaborator Module
//!
//! This module defines the narrow interfaces through which the Cog core talks
//! to the rest of the host application. The core consumes these traits and
//! never reaches past them: deferred deletion of extracted resources,
//! progress reporting during startup, and human-readable name resolution.
//!
//! ## Collaborators
//!
//! - **CogShutdownRegistry**: deferred deletion of extracted resource files
//! - **CogProgressSink**: progress reporting during the startup scan
//! - **CogNameResolver**: translation lookup for display names (never blocking)

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Deferred-deletion registry. Extracted resource paths are scheduled here
/// and removed when the host shuts down; extracted files are overwritable
/// scratch state, never authoritative.
pub trait CogShutdownRegistry: Send + Sync {
    fn schedule_delete_on_shutdown(&self, path: &Path);
}

/// Progress-reporting sink fed during the startup scan. `fraction` is in
/// `[0.0, 1.0]`.
pub trait CogProgressSink: Send + Sync {
    fn report_progress(&self, message: &str, fraction: f32);
}

/// Translation/name-resolution facility used only to render human-readable
/// names and descriptions. Implementations must not block the caller.
pub trait CogNameResolver: Send + Sync {
    fn resolve(&self, key: &str, fallback: &str) -> String;
}

/// Default shutdown registry: records scheduled paths and deletes them when
/// `run_deletions` is invoked at process shutdown. Deletion failures are
/// logged and skipped.
#[derive(Debug, Default)]
pub struct CogDeferredDeleter {
    pending: Mutex<Vec<PathBuf>>,
}

impl CogDeferredDeleter {
    pub fn new() -> Self {
        CogDeferredDeleter {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the currently scheduled paths.
    pub fn scheduled(&self) -> Vec<PathBuf> {
        self.pending
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Delete every scheduled path. Files first, then directories, so that
    /// per-plugin directories scheduled before their contents still empty
    /// out correctly.
    pub fn run_deletions(&self) {
        let mut paths = match self.pending.lock() {
            Ok(mut p) => std::mem::take(&mut *p),
            Err(_) => return,
        };
        paths.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
        for path in paths {
            let result = if path.is_dir() {
                std::fs::remove_dir(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(err) = result {
                log::warn!(
                    "host.shutdown.delete_failed: scheduled path could not be removed - path={}, error={}",
                    path.to_string_lossy(),
                    err
                );
            }
        }
    }
}

impl CogShutdownRegistry for CogDeferredDeleter {
    fn schedule_delete_on_shutdown(&self, path: &Path) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(path.to_path_buf());
        }
    }
}

/// Progress sink that drops every report. Used when the host has no
/// interactive startup surface.
#[derive(Debug, Default)]
pub struct CogNullProgressSink;

impl CogProgressSink for CogNullProgressSink {
    fn report_progress(&self, message: &str, fraction: f32) {
        log::debug!(
            "host.progress: startup progress - message={}, fraction={:.2}",
            message,
            fraction
        );
    }
}

/// Name resolver that returns the fallback unchanged. The real translation
/// facility lives in the excluded UI layer.
#[derive(Debug, Default)]
pub struct CogIdentityNameResolver;

impl CogNameResolver for CogIdentityNameResolver {
    fn resolve(&self, _key: &str, fallback: &str) -> String {
        fallback.to_string()
    }
}
