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

//! # Plugin Registry
//!
//! The top-level service of the Cog host. Orchestrates the startup
//! sequence (scan plugin archives, extract bundled resources, resolve
//! dependencies) exactly once, then owns one instance container per named
//! consumer ("robot") plus the catch-all unbound container, and exposes the
//! whole public lookup/start/stop surface.
//!
//! ## Core Concepts
//!
//! - **CogPluginRegistry**: the single explicit registry value; injected
//!   into collaborators, never accessed statically
//! - Registry state is reachable only through the operations below; no
//!   component outside the registry mutates containers directly
//! - `start`/`stop` for an unknown consumer or identifier log a warning and
//!   return `None`/`false`; nothing here panics or aborts the host
//!
//! ## Concurrency
//!
//! Startup is a single sequential pass and must complete before any
//! `start`/`stop` is accepted; the scan performs blocking file IO and must
//! not run on a latency-sensitive thread. After startup the consumer and
//! instance maps support concurrent access from multiple threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CogConfig;
use crate::container::{CogConsumerContainer, CogPluginInstance, CogUnboundContainer};
use crate::errors::{CogError, Result};
use crate::extract::CogResourceExtractor;
use crate::handle::{CogCapabilityToken, CogHandle, CogHandlePolicy};
use crate::host::{
    CogDeferredDeleter, CogIdentityNameResolver, CogNameResolver, CogNullProgressSink,
    CogProgressSink, CogShutdownRegistry,
};
use crate::loader::CogPluginLoader;
use crate::manifest::{CogMetadataReader, CogPluginMetadata};
use crate::plugin::{CogPluginFactory, CogPluginKind};
use crate::resolve::CogDependencyResolver;

/// Top-level plugin service. One value per host process, constructed
/// explicitly and injected into collaborators.
pub struct CogPluginRegistry {
    config: CogConfig,
    loader: Arc<dyn CogPluginLoader>,
    shutdown: Arc<dyn CogShutdownRegistry>,
    progress: Arc<dyn CogProgressSink>,
    names: Arc<dyn CogNameResolver>,
    policy: Arc<CogHandlePolicy>,
    /// Frozen after startup; entries pruned by the resolver are dropped.
    metadata: DashMap<String, Arc<CogPluginMetadata>>,
    factories: DashMap<String, Arc<dyn CogPluginFactory>>,
    consumers: DashMap<String, Arc<CogConsumerContainer>>,
    unbound: CogUnboundContainer,
    starting: AtomicBool,
    started: AtomicBool,
}

impl CogPluginRegistry {
    pub fn new(config: CogConfig, loader: Arc<dyn CogPluginLoader>) -> Self {
        CogPluginRegistry {
            config,
            loader,
            shutdown: Arc::new(CogDeferredDeleter::new()),
            progress: Arc::new(CogNullProgressSink),
            names: Arc::new(CogIdentityNameResolver),
            policy: Arc::new(CogHandlePolicy::default()),
            metadata: DashMap::new(),
            factories: DashMap::new(),
            consumers: DashMap::new(),
            unbound: CogUnboundContainer::new(),
            starting: AtomicBool::new(false),
            started: AtomicBool::new(false),
        }
    }

    pub fn with_shutdown_registry(mut self, shutdown: Arc<dyn CogShutdownRegistry>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_progress_sink(mut self, progress: Arc<dyn CogProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_name_resolver(mut self, names: Arc<dyn CogNameResolver>) -> Self {
        self.names = names;
        self
    }

    pub fn with_handle_policy(mut self, policy: CogHandlePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Issue a capability token for the named host component. Handles
    /// authorize gated operations against the component carried here.
    pub fn issue_token(&self, component: &str) -> CogCapabilityToken {
        CogCapabilityToken::new(component)
    }

    /// Register a consumer ("robot") and the plugin identifiers its
    /// configuration references. May be called before or after startup.
    pub fn register_consumer(&self, name: &str, referenced: &[&str]) {
        let referenced = referenced.iter().map(|s| s.to_string()).collect();
        self.consumers.insert(
            name.to_string(),
            Arc::new(CogConsumerContainer::new(name, referenced)),
        );
        log::debug!("registry.consumer.registered: consumer registered - consumer={}", name);
    }

    // ---- startup --------------------------------------------------------

    /// Run the startup sequence once: scan the plugin directory, extract
    /// bundled resources, resolve dependencies, and freeze the surviving
    /// plugin set. Not safe to invoke concurrently with itself; `start`
    /// and `stop` are refused until it completes.
    pub fn startup(&self) -> Result<()> {
        if self.starting.swap(true, Ordering::SeqCst) {
            return Err(CogError::validation(
                "startup already invoked for this registry",
            ));
        }

        let archives = self.scan_archives()?;
        let total = archives.len().max(1) as f32;

        for (index, path) in archives.iter().enumerate() {
            self.progress.report_progress(
                &format!("Reading {}", path.to_string_lossy()),
                0.4 * (index as f32 / total),
            );
            match CogMetadataReader::read(path) {
                Ok(Some(metadata)) => {
                    let id = metadata.main_entry.clone();
                    if self.metadata.contains_key(&id) {
                        log::warn!(
                            "registry.scan.duplicate: duplicate main entry, keeping the first archive - entry={}, archive={}",
                            id,
                            path.to_string_lossy()
                        );
                        continue;
                    }
                    self.metadata.insert(id, Arc::new(metadata));
                }
                Ok(None) => {}
                Err(err) => {
                    log::error!(
                        "registry.scan.failed: archive could not be read - archive={}, error={}",
                        path.to_string_lossy(),
                        err
                    );
                }
            }
        }

        let discovered: HashMap<String, Arc<CogPluginMetadata>> = self
            .metadata
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let extractor = CogResourceExtractor::new(&self.config, self.shutdown.as_ref());
        for (index, metadata) in discovered.values().enumerate() {
            self.progress.report_progress(
                &format!("Extracting {}", metadata.entry_name()),
                0.4 + 0.4 * (index as f32 / total),
            );
            let report = extractor.extract(metadata);
            if !report.all_succeeded() {
                log::warn!(
                    "registry.extract.partial: some sub-trees failed to extract - entry={}, libraries={}, natives={}, images={}",
                    metadata.main_entry,
                    report.libraries,
                    report.natives,
                    report.images
                );
            }
        }

        for (id, metadata) in &discovered {
            match self.loader.factory(metadata) {
                Ok(factory) => {
                    self.factories.insert(id.clone(), factory);
                }
                Err(err) => {
                    log::warn!(
                        "registry.factory.unavailable: no factory for entry - entry={}, error={}",
                        id,
                        err
                    );
                }
            }
        }

        self.progress.report_progress("Resolving dependencies", 0.9);
        let factory_map: HashMap<String, Arc<dyn CogPluginFactory>> = self
            .factories
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        let survivors = CogDependencyResolver::resolve(
            &discovered,
            &factory_map,
            &self.config.classpath_archives,
            self.loader.as_ref(),
        );

        self.metadata.retain(|id, _| survivors.contains(id));
        self.factories.retain(|id, _| survivors.contains(id));

        self.started.store(true, Ordering::SeqCst);
        self.progress.report_progress("Plugins ready", 1.0);
        log::info!(
            "registry.startup.done: startup completed - discovered={}, resolved={}",
            discovered.len(),
            survivors.len()
        );
        Ok(())
    }

    fn scan_archives(&self) -> Result<Vec<std::path::PathBuf>> {
        let mut archives = Vec::new();
        let entries = match std::fs::read_dir(&self.config.plugin_dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!(
                    "registry.scan.no_plugin_dir: plugin directory is not readable - dir={}, error={}",
                    self.config.plugin_dir.to_string_lossy(),
                    err
                );
                return Ok(archives);
            }
        };
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && self.config.is_plugin_archive(&path) {
                archives.push(path);
            }
        }
        archives.sort();
        Ok(archives)
    }

    // ---- lookup surface -------------------------------------------------

    pub fn lookup_metadata(&self, identifier: &str) -> Option<Arc<CogPluginMetadata>> {
        self.metadata.get(identifier).map(|m| Arc::clone(m.value()))
    }

    /// Identifiers of the resolved plugin set, sorted.
    pub fn resolved_identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.metadata.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Localized display name for an entry, falling back to the metadata
    /// default. Never blocks on the translation facility.
    pub fn display_name(&self, identifier: &str) -> Option<String> {
        let metadata = self.lookup_metadata(identifier)?;
        let key = format!("plugin.name.{}", identifier);
        Some(self.names.resolve(&key, &metadata.default_name))
    }

    /// Read-only snapshot of the consumer's instances.
    pub fn instances_for(&self, consumer: &str) -> Vec<CogHandle> {
        match self.consumers.get(consumer) {
            Some(container) => container
                .table
                .snapshot()
                .into_iter()
                .map(|instance| self.handle(instance))
                .collect(),
            None => {
                log::warn!(
                    "registry.instances.unknown_consumer: no container - consumer={}",
                    consumer
                );
                Vec::new()
            }
        }
    }

    /// Snapshot of the consumer's instances of one plugin kind.
    pub fn instances_for_kind(&self, consumer: &str, kind: CogPluginKind) -> Vec<CogHandle> {
        self.instances_for(consumer)
            .into_iter()
            .filter(|handle| {
                self.consumers
                    .get(consumer)
                    .and_then(|container| container.table.get(handle.instance_id()))
                    .and_then(|instance| instance.kind().ok())
                    .map(|k| k == kind)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Identifiers referenced by at least one registered consumer,
    /// restricted to the resolved set, sorted and deduplicated.
    pub fn referenced_plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .consumers
            .iter()
            .flat_map(|e| e.value().referenced().to_vec())
            .filter(|id| self.metadata.contains_key(id))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sample instances of every resolved entry no consumer references,
    /// restricted by the given metadata filter. Samples live in the
    /// unbound container and are created on first request.
    pub fn unreferenced_samples(
        &self,
        filter: impl Fn(&CogPluginMetadata) -> bool,
    ) -> Vec<CogHandle> {
        if !self.require_started("unreferenced_samples") {
            return Vec::new();
        }
        let referenced = self.referenced_plugin_names();
        let mut samples = Vec::new();
        for id in self.resolved_identifiers() {
            if referenced.contains(&id) {
                continue;
            }
            let metadata = match self.lookup_metadata(&id) {
                Some(metadata) if filter(&metadata) => metadata,
                _ => continue,
            };
            if let Some(existing) = self.unbound.table.find_any(&id) {
                samples.push(self.handle(existing));
                continue;
            }
            let factory = match self.factories.get(&id) {
                Some(factory) => Arc::clone(factory.value()),
                None => continue,
            };
            if let Some(instance) = self.unbound.run(factory.as_ref(), &metadata) {
                samples.push(self.handle(instance));
            }
        }
        samples
    }

    // ---- lifecycle surface ----------------------------------------------

    /// Start the identified plugin for a consumer: restart a non-running
    /// instance if the container has one, else fall back to the unbound
    /// container and attribute the fresh instance to the consumer.
    pub fn start(&self, consumer: &str, identifier: &str) -> Option<CogHandle> {
        self.start_tagged(consumer, identifier, None)
    }

    /// Same as `start`, disambiguated by a caller-supplied instance tag.
    pub fn start_named(
        &self,
        consumer: &str,
        identifier: &str,
        tag: &str,
    ) -> Option<CogHandle> {
        self.start_tagged(consumer, identifier, Some(tag))
    }

    /// Windowed entry point: identical start semantics; the returned handle
    /// is meant for the window component of the host UI.
    pub fn start_in_window(&self, consumer: &str, identifier: &str) -> Option<CogHandle> {
        self.start_tagged(consumer, identifier, None)
    }

    fn start_tagged(
        &self,
        consumer: &str,
        identifier: &str,
        tag: Option<&str>,
    ) -> Option<CogHandle> {
        if !self.require_started("start") {
            return None;
        }
        let container = match self.consumers.get(consumer) {
            Some(container) => Arc::clone(container.value()),
            None => {
                log::warn!(
                    "registry.start.unknown_consumer: no container - consumer={}, entry={}",
                    consumer,
                    identifier
                );
                return None;
            }
        };
        let metadata = match self.lookup_metadata(identifier) {
            Some(metadata) => metadata,
            None => {
                log::warn!(
                    "registry.start.unknown_entry: not in the resolved plugin set - consumer={}, entry={}",
                    consumer,
                    identifier
                );
                return None;
            }
        };

        // Restart path: the container already exposes a non-running
        // instance for this entry.
        if let Some(idle) = container.table.find_idle(identifier, tag) {
            return match idle.invoke_run() {
                Ok(()) => Some(self.handle(idle)),
                Err(err) => {
                    log::error!(
                        "registry.start.restart_failed: run hook failed - consumer={}, entry={}, error={}",
                        consumer,
                        identifier,
                        err
                    );
                    None
                }
            };
        }

        // Fallback path: re-home an unbound sample when one exists,
        // otherwise create a fresh instance attributed to the consumer.
        if let Some(sample) = self.unbound.table.find_any(identifier) {
            self.unbound.table.remove(sample.id);
            if sample.is_running() {
                if let Err(err) = sample.invoke_stop() {
                    log::warn!(
                        "registry.start.sample_stop_failed: unbound sample stop hook failed - entry={}, error={}",
                        identifier,
                        err
                    );
                }
            }
            return container
                .table
                .adopt(&sample, Some(consumer), tag)
                .map(|instance| self.handle(instance));
        }

        let factory = match self.factories.get(identifier) {
            Some(factory) => Arc::clone(factory.value()),
            None => {
                log::warn!(
                    "registry.start.no_factory: entry has no registered factory - entry={}",
                    identifier
                );
                return None;
            }
        };
        container
            .run(factory.as_ref(), &metadata, tag)
            .map(|instance| self.handle(instance))
    }

    /// Stop the consumer's running instance of the identified plugin.
    pub fn stop(&self, consumer: &str, identifier: &str) -> bool {
        self.stop_tagged(consumer, identifier, None)
    }

    /// Same as `stop`, disambiguated by the instance tag.
    pub fn stop_named(&self, consumer: &str, identifier: &str, tag: &str) -> bool {
        self.stop_tagged(consumer, identifier, Some(tag))
    }

    fn stop_tagged(&self, consumer: &str, identifier: &str, tag: Option<&str>) -> bool {
        if !self.require_started("stop") {
            return false;
        }
        let container = match self.consumers.get(consumer) {
            Some(container) => Arc::clone(container.value()),
            None => {
                log::warn!(
                    "registry.stop.unknown_consumer: no container - consumer={}, entry={}",
                    consumer,
                    identifier
                );
                return false;
            }
        };
        match container.table.find_running(identifier, tag) {
            Some(instance) => container.table.stop(instance.id),
            None => {
                log::warn!(
                    "registry.stop.not_running: no running instance - consumer={}, entry={}, tag={}",
                    consumer,
                    identifier,
                    tag.unwrap_or("-")
                );
                false
            }
        }
    }

    /// Stop every instance of one consumer.
    pub fn stop_all(&self, consumer: &str) {
        if !self.require_started("stop_all") {
            return;
        }
        match self.consumers.get(consumer) {
            Some(container) => container.table.stop_all(),
            None => log::warn!(
                "registry.stop_all.unknown_consumer: no container - consumer={}",
                consumer
            ),
        }
    }

    /// Deterministic teardown: stop every still-running instance of every
    /// consumer (sorted order) and of the unbound container. Stop failures
    /// are logged by the containers and never block other instances.
    pub fn shutdown(&self) {
        if !self.require_started("shutdown") {
            return;
        }
        let mut names: Vec<String> = self.consumers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        for name in names {
            self.stop_all(&name);
        }
        self.unbound.table.stop_all();
        log::info!("registry.shutdown.done: all containers stopped");
    }

    fn require_started(&self, operation: &str) -> bool {
        if self.started.load(Ordering::SeqCst) {
            return true;
        }
        log::warn!(
            "registry.not_started: operation refused before startup completed - operation={}",
            operation
        );
        false
    }

    fn handle(&self, instance: Arc<CogPluginInstance>) -> CogHandle {
        CogHandle::new(instance, Arc::clone(&self.policy))
    }
}
