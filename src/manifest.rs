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

//! # Archive Metadata Reader
//!
//! Opens a plugin archive, reads the `plugin.properties` metadata resource,
//! and produces an immutable `CogPluginMetadata` record. Also discovers
//! every localized resource bundle matching the naming convention derived
//! from the main-entry identifier.
//!
//! ## Archive Metadata Resource
//!
//! The metadata resource is a Java-style properties file keyed by:
//!
//! - `plugin.mainclass` (mandatory main-entry identifier)
//! - `plugin.version`
//! - `plugin.author`
//! - `plugin.default.name`
//! - `plugin.default.description`
//! - `plugin.core.hasHelp`
//! - `plugin.core.defaultLocal`
//!
//! A malformed or missing resource never aborts a scan: the archive is
//! skipped with a warning and `Ok(None)` is returned.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::errors::Result;

/// Name of the metadata resource inside a plugin archive.
pub const COG_METADATA_RESOURCE: &str = "plugin.properties";

const KEY_MAIN_ENTRY: &str = "plugin.mainclass";
const KEY_VERSION: &str = "plugin.version";
const KEY_AUTHOR: &str = "plugin.author";
const KEY_DEFAULT_NAME: &str = "plugin.default.name";
const KEY_DEFAULT_DESCRIPTION: &str = "plugin.default.description";
const KEY_HAS_HELP: &str = "plugin.core.hasHelp";
const KEY_DEFAULT_LOCALE: &str = "plugin.core.defaultLocal";

/// Immutable metadata record produced once at scan time. Downstream
/// components reference entries by `main_entry`, never by owning the record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CogPluginMetadata {
    /// Path of the archive this record was read from.
    pub archive_path: PathBuf,
    /// Main-entry identifier, the unique key of this plugin type across
    /// metadata, dependency, and container lookups.
    pub main_entry: String,
    pub version: String,
    pub author: String,
    /// Default display name, used when the translation facility has no
    /// localized entry.
    pub default_name: String,
    pub default_description: String,
    /// Whether the archive bundles help content.
    pub has_help: bool,
    /// Locales for which a resource bundle was found in the archive.
    pub locales: BTreeSet<String>,
    pub default_locale: String,
}

impl CogPluginMetadata {
    /// Filename of the archive, as matched against external-archive
    /// requirements of other plugins.
    pub fn archive_name(&self) -> String {
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Last segment of the main-entry identifier.
    pub fn entry_name(&self) -> &str {
        self.main_entry
            .rsplit('.')
            .next()
            .unwrap_or(&self.main_entry)
    }
}

/// Reader producing `CogPluginMetadata` records from plugin archives.
#[derive(Debug, Default)]
pub struct CogMetadataReader;

impl CogMetadataReader {
    /// Read the metadata record of the archive at `path`.
    ///
    /// Returns `Ok(None)` when the archive carries no recognizable metadata
    /// resource or the resource does not name a main-entry identifier; the
    /// caller is expected to continue scanning.
    pub fn read(path: &Path) -> Result<Option<CogPluginMetadata>> {
        let file = File::open(path)?;
        let mut archive = match ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(err) => {
                log::warn!(
                    "manifest.read.not_an_archive: skipping unreadable archive - path={}, error={}",
                    path.to_string_lossy(),
                    err
                );
                return Ok(None);
            }
        };

        let properties = {
            let mut resource = match archive.by_name(COG_METADATA_RESOURCE) {
                Ok(resource) => resource,
                Err(_) => {
                    log::warn!(
                        "manifest.read.no_metadata: archive has no {} resource - path={}",
                        COG_METADATA_RESOURCE,
                        path.to_string_lossy()
                    );
                    return Ok(None);
                }
            };
            let mut text = String::new();
            if let Err(err) = resource.read_to_string(&mut text) {
                log::warn!(
                    "manifest.read.unreadable_metadata: metadata resource is not readable text - path={}, error={}",
                    path.to_string_lossy(),
                    err
                );
                return Ok(None);
            }
            parse_properties(&text)
        };

        let main_entry = match properties.get(KEY_MAIN_ENTRY) {
            Some(entry) if !entry.is_empty() => entry.clone(),
            _ => {
                log::warn!(
                    "manifest.read.no_main_entry: metadata names no {} - path={}",
                    KEY_MAIN_ENTRY,
                    path.to_string_lossy()
                );
                return Ok(None);
            }
        };

        let locales = scan_locales(&mut archive, &main_entry);
        let metadata = CogPluginMetadata {
            archive_path: path.to_path_buf(),
            main_entry: main_entry.clone(),
            version: properties.get(KEY_VERSION).cloned().unwrap_or_default(),
            author: properties.get(KEY_AUTHOR).cloned().unwrap_or_default(),
            default_name: properties
                .get(KEY_DEFAULT_NAME)
                .cloned()
                .unwrap_or_else(|| main_entry.clone()),
            default_description: properties
                .get(KEY_DEFAULT_DESCRIPTION)
                .cloned()
                .unwrap_or_default(),
            has_help: properties
                .get(KEY_HAS_HELP)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            locales,
            default_locale: properties
                .get(KEY_DEFAULT_LOCALE)
                .cloned()
                .unwrap_or_else(|| "en".to_string()),
        };

        log::info!(
            "manifest.read.loaded: plugin metadata loaded - path={}, entry={}, version={}, locales={}",
            path.to_string_lossy(),
            metadata.main_entry,
            metadata.version,
            metadata.locales.len()
        );
        Ok(Some(metadata))
    }
}

/// Parse a Java-style properties resource: `key=value` or `key: value`
/// lines, `#`/`!` comments, surrounding whitespace trimmed.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let split = line
            .find('=')
            .or_else(|| line.find(':'))
            .map(|idx| (&line[..idx], &line[idx + 1..]));
        if let Some((key, value)) = split {
            let key = key.trim();
            if !key.is_empty() {
                out.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    out
}

/// Resource-bundle path prefix derived from the main-entry identifier:
/// the entry `a.b.Widget` maps to bundles `a/b/Widget_<locale>.properties`.
fn bundle_prefix(main_entry: &str) -> String {
    let mut path = main_entry.replace('.', "/");
    path.push('_');
    path
}

/// Collect the locales of every bundle resource matching the main entry's
/// naming convention.
fn scan_locales<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    main_entry: &str,
) -> BTreeSet<String> {
    let prefix = bundle_prefix(main_entry);
    let mut locales = BTreeSet::new();
    for name in archive.file_names() {
        if let Some(rest) = name.strip_prefix(&prefix) {
            if let Some(locale) = rest.strip_suffix(".properties") {
                if !locale.is_empty() && !locale.contains('/') {
                    locales.insert(locale.to_string());
                }
            }
        }
    }
    locales
}
