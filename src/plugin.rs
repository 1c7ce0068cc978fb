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

//! # Cog Plugin Surface
//!
//! This module defines the contract between the Cog host and plugin
//! implementations: the `CogPlugin` trait every plugin entry implements, the
//! factory interface through which instances are created, and the
//! requirement type a plugin uses to declare its dependencies.
//!
//! ## Instantiation Convention
//!
//! Instances are created through an explicit `CogPluginFactory` registered
//! per plugin type at discovery time. The factory receives a
//! `CogInstanceConfig` carrying the optional consumer attribution, the
//! caller-supplied instance tag, and the entry's metadata record, which
//! subsumes both historical constructor shapes (`(consumer, metadata)` and
//! `(metadata)`).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CogError, Result};
use crate::manifest::CogPluginMetadata;

/// A requirement declared by a plugin entry, read once at resolution time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CogDependencyRequirement {
    /// An archive file expected on the host classpath, identified by
    /// filename.
    ExternalArchive(String),
    /// Another plugin entry or a host class, identified in the same
    /// identifier space as main-entry identifiers.
    Entry(String),
}

impl CogDependencyRequirement {
    /// Human-readable form used in removal logs.
    pub fn describe(&self) -> String {
        match self {
            CogDependencyRequirement::ExternalArchive(name) => {
                format!("external archive '{}'", name)
            }
            CogDependencyRequirement::Entry(id) => format!("entry '{}'", id),
        }
    }
}

/// Coarse category of a plugin entry, used by per-kind listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CogPluginKind {
    /// Plugins presented in their own window.
    Window,
    /// Plugins embedded as tools inside an existing surface.
    Tool,
    /// Headless background plugins.
    Service,
}

impl fmt::Display for CogPluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CogPluginKind::Window => "window",
            CogPluginKind::Tool => "tool",
            CogPluginKind::Service => "service",
        };
        f.write_str(s)
    }
}

impl FromStr for CogPluginKind {
    type Err = CogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "window" => Ok(CogPluginKind::Window),
            "tool" => Ok(CogPluginKind::Tool),
            "service" => Ok(CogPluginKind::Service),
            other => Err(CogError::validation(format!(
                "unknown plugin kind: {}",
                other
            ))),
        }
    }
}

/// Contract implemented by every plugin entry hosted by Cog.
///
/// Lifecycle hooks (`on_load`, `run`, `stop`) are invoked exclusively by the
/// instance containers; external callers only ever see a capability-gated
/// handle.
pub trait CogPlugin: Send + Sync + fmt::Debug {
    /// The unique main-entry identifier of this plugin type.
    fn identifier(&self) -> &str;

    /// Rebind the identifier. Reserved for the registry; never reachable
    /// through a handle.
    fn set_identifier(&mut self, identifier: &str);

    fn kind(&self) -> CogPluginKind;

    fn display_name(&self) -> String;

    fn description(&self) -> String;

    /// Requirements this entry declares against the classpath, the host
    /// loader, or other discovered entries. Empty means automatically
    /// satisfiable.
    fn requirements(&self) -> Vec<CogDependencyRequirement> {
        Vec::new()
    }

    /// Apply a configuration blob to the instance.
    fn configure(&mut self, config: &Value) -> Result<()> {
        let _ = config;
        Ok(())
    }

    /// Pre-load hook invoked once before the first `run`.
    fn on_load(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run hook. The plugin author must make `stop` responsive; the host
    /// never interrupts an in-flight `run`.
    fn run(&mut self) -> Result<()>;

    /// Stop hook invoked on explicit stop or container teardown.
    fn stop(&mut self) -> Result<()>;
}

/// Per-instance construction input handed to a factory.
#[derive(Clone, Debug)]
pub struct CogInstanceConfig {
    /// Consumer ("robot") the instance is attributed to, `None` for unbound
    /// instances.
    pub consumer: Option<String>,
    /// Caller-supplied tag disambiguating multiple instances of the same
    /// entry.
    pub tag: Option<String>,
    /// The metadata record of the entry being instantiated.
    pub metadata: Arc<CogPluginMetadata>,
}

/// Explicit factory interface registered per plugin type at discovery time.
pub trait CogPluginFactory: Send + Sync {
    fn create(&self, config: CogInstanceConfig) -> Result<Box<dyn CogPlugin>>;
}
