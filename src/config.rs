//! Copyright © 2025 Gearbox Team. All Rights Reserved.
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

//! # Host Configuration
//!
//! Directory layout and classpath configuration for the plugin host: where
//! plugin archives are discovered, where bundled resources are extracted
//! to, which file extensions the scanner recognizes, and which archive
//! names sit on the host classpath for the dependency resolver.
//!
//! `CogConfig` carries plain defaults; `CogConfigBuilder` overlays partial
//! settings, including from a JSON value.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for the Cog plugin host. Covers the directory layout used
/// during startup (where plugin archives are discovered and where bundled
/// resources are extracted to) and the classpath archive names used by the
/// dependency resolver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CogConfig {
    /// Directory scanned for plugin archives at startup.
    pub plugin_dir: PathBuf,
    /// Per-plugin destination for bundled library archives.
    pub lib_dir: PathBuf,
    /// Destination for platform-native shared objects; expected to be on the
    /// process's native-library search path.
    pub native_dir: PathBuf,
    /// Per-plugin destination for bundled image assets.
    pub image_dir: PathBuf,
    /// Archive file extensions recognized by the scanner.
    pub archive_extensions: Vec<String>,
    /// Names of the archives on the host classpath, as matched against
    /// external-archive requirements.
    pub classpath_archives: Vec<String>,
}

impl Default for CogConfig {
    fn default() -> Self {
        CogConfig {
            plugin_dir: PathBuf::from("plugins"),
            lib_dir: PathBuf::from("plugins/lib"),
            native_dir: PathBuf::from("plugins/native"),
            image_dir: PathBuf::from("plugins/images"),
            archive_extensions: vec!["zip".to_string(), "cog".to_string()],
            classpath_archives: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CogConfigBuilder {
    pub plugin_dir: Option<PathBuf>,
    pub lib_dir: Option<PathBuf>,
    pub native_dir: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub archive_extensions: Option<Vec<String>>,
    pub classpath_archives: Option<Vec<String>>,
}

impl CogConfigBuilder {
    pub fn build(self) -> CogConfig {
        let base = CogConfig::default();
        CogConfig {
            plugin_dir: self.plugin_dir.unwrap_or(base.plugin_dir),
            lib_dir: self.lib_dir.unwrap_or(base.lib_dir),
            native_dir: self.native_dir.unwrap_or(base.native_dir),
            image_dir: self.image_dir.unwrap_or(base.image_dir),
            archive_extensions: self
                .archive_extensions
                .unwrap_or(base.archive_extensions),
            classpath_archives: self
                .classpath_archives
                .unwrap_or(base.classpath_archives),
        }
    }

    pub fn from_json(value: &Value) -> CogConfig {
        let builder: CogConfigBuilder = serde_json::from_value(value.clone())
            .unwrap_or_else(|_| CogConfigBuilder::default());
        builder.build()
    }
}

impl CogConfig {
    /// Whether the given path carries one of the recognized archive
    /// extensions.
    pub fn is_plugin_archive(&self, path: &std::path::Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        self.archive_extensions.iter().any(|e| e == &ext)
    }
}
