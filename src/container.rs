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

//! # Instance Containers
//!
//! Containers own the live plugin instances: one `CogConsumerContainer` per
//! named consumer ("robot") and a single `CogUnboundContainer` for entries
//! not referenced by any consumer. Both variants share the
//! `CogInstanceTable` contract: `run`, `stop(id)`, `get(id)`, `get_all`.
//!
//! ## Instance Ids
//!
//! Instance ids are opaque, strictly monotonic per container, and never
//! reused within the process lifetime. `run` performs factory
//! instantiation, the pre-load hook, the run hook, and only then assigns
//! the next id; any failure along the way is caught, logged, and turns
//! into an absent result instead of propagating.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{CogError, Result};
use crate::manifest::CogPluginMetadata;
use crate::plugin::{CogInstanceConfig, CogPlugin, CogPluginFactory, CogPluginKind};

/// Opaque, container-scoped instance id. Strictly increasing within one
/// container; never reused after removal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CogInstanceId(u64);

impl fmt::Display for CogInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One live plugin instance. The container owns the lifecycle; handles
/// wrapping this instance never do.
#[derive(Debug)]
pub struct CogPluginInstance {
    pub id: CogInstanceId,
    /// Consumer the instance is attributed to, `None` while unbound.
    pub consumer: Option<String>,
    /// Caller-supplied disambiguation tag.
    pub tag: Option<String>,
    pub metadata: Arc<CogPluginMetadata>,
    plugin: Arc<Mutex<Box<dyn CogPlugin>>>,
    running: AtomicBool,
}

impl CogPluginInstance {
    pub fn identifier(&self) -> &str {
        &self.metadata.main_entry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn kind(&self) -> Result<CogPluginKind> {
        Ok(self.lock()?.kind())
    }

    pub(crate) fn plugin(&self) -> &Arc<Mutex<Box<dyn CogPlugin>>> {
        &self.plugin
    }

    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Box<dyn CogPlugin>>> {
        self.plugin.lock().map_err(|_| {
            CogError::internal(format!(
                "plugin instance mutex poisoned - entry={}",
                self.identifier()
            ))
        })
    }

    /// Invoke the run hook and mark the instance running.
    pub(crate) fn invoke_run(&self) -> Result<()> {
        self.lock()?.run()?;
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Mark the state transition, then invoke the plugin's own stop hook.
    /// An in-flight `run` is never interrupted.
    pub(crate) fn invoke_stop(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        self.lock()?.stop()
    }
}

/// Shared contract of both container variants.
#[derive(Debug, Default)]
pub struct CogInstanceTable {
    next_id: AtomicU64,
    instances: DashMap<CogInstanceId, Arc<CogPluginInstance>>,
}

impl CogInstanceTable {
    fn allocate_id(&self) -> CogInstanceId {
        CogInstanceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Instantiate, pre-load, run, and insert a new instance. Any failure
    /// is caught and logged; the table is left unchanged and `None` is
    /// returned.
    pub fn run(
        &self,
        factory: &dyn CogPluginFactory,
        metadata: &Arc<CogPluginMetadata>,
        consumer: Option<&str>,
        tag: Option<&str>,
    ) -> Option<Arc<CogPluginInstance>> {
        let config = CogInstanceConfig {
            consumer: consumer.map(str::to_string),
            tag: tag.map(str::to_string),
            metadata: Arc::clone(metadata),
        };
        let mut plugin = match factory.create(config) {
            Ok(plugin) => plugin,
            Err(err) => {
                log::error!(
                    "container.run.create_failed: factory refused instantiation - entry={}, error={}",
                    metadata.main_entry,
                    err
                );
                return None;
            }
        };
        if let Err(err) = plugin.on_load() {
            log::error!(
                "container.run.load_failed: pre-load hook failed - entry={}, error={}",
                metadata.main_entry,
                err
            );
            return None;
        }
        if let Err(err) = plugin.run() {
            log::error!(
                "container.run.run_failed: run hook failed - entry={}, error={}",
                metadata.main_entry,
                err
            );
            return None;
        }

        let instance = Arc::new(CogPluginInstance {
            id: self.allocate_id(),
            consumer: consumer.map(str::to_string),
            tag: tag.map(str::to_string),
            metadata: Arc::clone(metadata),
            plugin: Arc::new(Mutex::new(plugin)),
            running: AtomicBool::new(true),
        });
        self.instances.insert(instance.id, Arc::clone(&instance));
        log::debug!(
            "container.run.started: instance started - entry={}, id={}, consumer={}, tag={}",
            metadata.main_entry,
            instance.id,
            consumer.unwrap_or("<unbound>"),
            tag.unwrap_or("-")
        );
        Some(instance)
    }

    /// Adopt an instance created elsewhere (re-homing an unbound sample
    /// into a consumer container). The plugin object is shared; the record
    /// gets a fresh id and the new attribution, and its run hook is
    /// invoked.
    pub(crate) fn adopt(
        &self,
        source: &Arc<CogPluginInstance>,
        consumer: Option<&str>,
        tag: Option<&str>,
    ) -> Option<Arc<CogPluginInstance>> {
        let instance = Arc::new(CogPluginInstance {
            id: self.allocate_id(),
            consumer: consumer.map(str::to_string),
            tag: tag.map(str::to_string),
            metadata: Arc::clone(&source.metadata),
            plugin: Arc::clone(source.plugin()),
            running: AtomicBool::new(false),
        });
        if let Err(err) = instance.invoke_run() {
            log::error!(
                "container.adopt.run_failed: run hook failed on adopted instance - entry={}, error={}",
                instance.identifier(),
                err
            );
            return None;
        }
        self.instances.insert(instance.id, Arc::clone(&instance));
        Some(instance)
    }

    /// Stop the instance with the given id. Returns `false` for an unknown
    /// id; a failing stop hook is logged but the transition still counts.
    pub fn stop(&self, id: CogInstanceId) -> bool {
        let instance = match self.instances.get(&id) {
            Some(instance) => Arc::clone(instance.value()),
            None => {
                log::warn!("container.stop.unknown: no instance with id={}", id);
                return false;
            }
        };
        if let Err(err) = instance.invoke_stop() {
            log::warn!(
                "container.stop.hook_failed: stop hook failed - entry={}, id={}, error={}",
                instance.identifier(),
                id,
                err
            );
        }
        true
    }

    /// Stop every still-running instance, deterministically by id.
    pub fn stop_all(&self) {
        for instance in self.snapshot() {
            if instance.is_running() {
                self.stop(instance.id);
            }
        }
    }

    pub fn get(&self, id: CogInstanceId) -> Option<Arc<CogPluginInstance>> {
        self.instances.get(&id).map(|i| Arc::clone(i.value()))
    }

    /// Read-only snapshot of all instances, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<CogPluginInstance>> {
        let mut all: Vec<Arc<CogPluginInstance>> = self
            .instances
            .iter()
            .map(|i| Arc::clone(i.value()))
            .collect();
        all.sort_by_key(|i| i.id);
        all
    }

    /// First non-running instance of the given entry, optionally matching a
    /// tag.
    pub fn find_idle(
        &self,
        identifier: &str,
        tag: Option<&str>,
    ) -> Option<Arc<CogPluginInstance>> {
        self.snapshot().into_iter().find(|instance| {
            instance.identifier() == identifier
                && !instance.is_running()
                && (tag.is_none() || instance.tag.as_deref() == tag)
        })
    }

    /// First running instance of the given entry, optionally matching a
    /// tag.
    pub fn find_running(
        &self,
        identifier: &str,
        tag: Option<&str>,
    ) -> Option<Arc<CogPluginInstance>> {
        self.snapshot().into_iter().find(|instance| {
            instance.identifier() == identifier
                && instance.is_running()
                && (tag.is_none() || instance.tag.as_deref() == tag)
        })
    }

    /// Any instance of the given entry, running or not.
    pub fn find_any(&self, identifier: &str) -> Option<Arc<CogPluginInstance>> {
        self.snapshot()
            .into_iter()
            .find(|instance| instance.identifier() == identifier)
    }

    pub(crate) fn remove(&self, id: CogInstanceId) -> Option<Arc<CogPluginInstance>> {
        self.instances.remove(&id).map(|(_, instance)| instance)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Container of instances attributed to one named consumer.
#[derive(Debug)]
pub struct CogConsumerContainer {
    consumer: String,
    /// Entry identifiers the consumer's configuration references.
    referenced: Vec<String>,
    pub table: CogInstanceTable,
}

impl CogConsumerContainer {
    pub fn new(consumer: impl Into<String>, referenced: Vec<String>) -> Self {
        CogConsumerContainer {
            consumer: consumer.into(),
            referenced,
            table: CogInstanceTable::default(),
        }
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn referenced(&self) -> &[String] {
        &self.referenced
    }

    pub fn run(
        &self,
        factory: &dyn CogPluginFactory,
        metadata: &Arc<CogPluginMetadata>,
        tag: Option<&str>,
    ) -> Option<Arc<CogPluginInstance>> {
        self.table.run(factory, metadata, Some(&self.consumer), tag)
    }
}

/// Catch-all container for resolved entries no consumer references.
#[derive(Debug, Default)]
pub struct CogUnboundContainer {
    pub table: CogInstanceTable,
}

impl CogUnboundContainer {
    pub fn new() -> Self {
        CogUnboundContainer {
            table: CogInstanceTable::default(),
        }
    }

    pub fn run(
        &self,
        factory: &dyn CogPluginFactory,
        metadata: &Arc<CogPluginMetadata>,
    ) -> Option<Arc<CogPluginInstance>> {
        self.table.run(factory, metadata, None, None)
    }
}
