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

//! # Dependency Resolver
//!
//! Given the full set of discovered metadata records, computes for each
//! entry whether its declared requirements are satisfiable: by an archive
//! on the host classpath, by a class the host loader can provide, or by
//! another discovered entry. Unsatisfiable entries are pruned, cascading
//! the removal to every entry that transitively depends on a removed one.
//!
//! ## Single-Pass Semantics
//!
//! Resolution is one linear pass in deterministic (sorted) scan order.
//! Graph edges are recorded in the same pass that performs removals: an
//! entry whose dependency is invalidated earlier in the pass cascades
//! correctly, but a dependency discovered *after* its dependent was already
//! validated is not retroactively invalidated. This is a deliberate,
//! documented property of the original design and is kept as-is; a strict
//! fixed point would require iterating the pass until no entry is removed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::loader::CogPluginLoader;
use crate::manifest::CogPluginMetadata;
use crate::plugin::{CogDependencyRequirement, CogInstanceConfig, CogPluginFactory};

/// The pruned collection of metadata records that survived resolution, and
/// the resolver's only durable output. Every requirement of every surviving
/// entry was satisfiable at the moment the set was frozen.
#[derive(Clone, Debug, Default)]
pub struct CogPluginSet {
    inner: HashMap<String, Arc<CogPluginMetadata>>,
}

impl CogPluginSet {
    pub fn contains(&self, identifier: &str) -> bool {
        self.inner.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<CogPluginMetadata>> {
        self.inner.get(identifier)
    }

    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<CogPluginMetadata>)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Transient dependency graph used only to cascade removals. Maps an
/// entry's identifier to the identifiers of already-validated entries that
/// declared a dependency on it. An edge exists only for dependencies that
/// were satisfiable by another *plugin* entry, because those are the only
/// dependencies whose later invalidation must cascade.
#[derive(Debug, Default)]
struct CogDependencyGraph {
    dependents: HashMap<String, Vec<String>>,
}

impl CogDependencyGraph {
    fn record(&mut self, dependency: &str, dependent: &str) {
        self.dependents
            .entry(dependency.to_string())
            .or_default()
            .push(dependent.to_string());
    }

    fn dependents_of(&self, identifier: &str) -> Vec<String> {
        self.dependents
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }
}

/// Single-pass dependency resolver.
#[derive(Debug, Default)]
pub struct CogDependencyResolver;

impl CogDependencyResolver {
    /// Resolve the discovered set against the classpath archive list and
    /// the host loader, returning the surviving `CogPluginSet`.
    ///
    /// One throwaway, unbound instance of each entry is created to read its
    /// declared requirements and discarded when the pass completes. An
    /// entry whose factory fails is treated as unsatisfiable.
    pub fn resolve(
        discovered: &HashMap<String, Arc<CogPluginMetadata>>,
        factories: &HashMap<String, Arc<dyn CogPluginFactory>>,
        classpath_archives: &[String],
        loader: &dyn CogPluginLoader,
    ) -> CogPluginSet {
        // Sorted order keeps pruning results reproducible across runs.
        let mut candidates: BTreeMap<String, Arc<CogPluginMetadata>> = discovered
            .iter()
            .map(|(id, meta)| (id.clone(), Arc::clone(meta)))
            .collect();
        let scan_order: Vec<String> = candidates.keys().cloned().collect();

        // Throwaway instances, created up front so every entry's
        // requirements are known before the pass begins.
        let mut requirements: HashMap<String, Vec<CogDependencyRequirement>> = HashMap::new();
        let mut unreadable: Vec<String> = Vec::new();
        for id in &scan_order {
            let meta = Arc::clone(&candidates[id]);
            let factory = match factories.get(id) {
                Some(factory) => factory,
                None => {
                    unreadable.push(id.clone());
                    continue;
                }
            };
            let config = CogInstanceConfig {
                consumer: None,
                tag: None,
                metadata: meta,
            };
            match factory.create(config) {
                Ok(instance) => {
                    requirements.insert(id.clone(), instance.requirements());
                }
                Err(err) => {
                    log::warn!(
                        "resolve.probe.failed: throwaway instance could not be created - entry={}, error={}",
                        id,
                        err
                    );
                    unreadable.push(id.clone());
                }
            }
        }

        let mut graph = CogDependencyGraph::default();
        for id in unreadable {
            Self::remove_cascading(
                &mut candidates,
                &graph,
                &id,
                "requirements could not be read",
            );
        }

        for id in &scan_order {
            if !candidates.contains_key(id) {
                continue;
            }
            let entry_requirements = requirements.get(id).cloned().unwrap_or_default();
            for requirement in &entry_requirements {
                let satisfiable = match requirement {
                    CogDependencyRequirement::ExternalArchive(name) => {
                        classpath_archives.iter().any(|a| a == name)
                    }
                    CogDependencyRequirement::Entry(dep_id) => {
                        if candidates.contains_key(dep_id) {
                            graph.record(dep_id, id);
                            true
                        } else {
                            loader.is_loadable(dep_id)
                        }
                    }
                };
                if !satisfiable {
                    Self::remove_cascading(
                        &mut candidates,
                        &graph,
                        id,
                        &format!("unsatisfiable requirement: {}", requirement.describe()),
                    );
                    break;
                }
            }
        }

        let survivors = CogPluginSet {
            inner: candidates.into_iter().collect(),
        };
        log::info!(
            "resolve.done: dependency resolution completed - discovered={}, surviving={}",
            discovered.len(),
            survivors.len()
        );
        survivors
    }

    fn remove_cascading(
        candidates: &mut BTreeMap<String, Arc<CogPluginMetadata>>,
        graph: &CogDependencyGraph,
        identifier: &str,
        reason: &str,
    ) {
        if candidates.remove(identifier).is_none() {
            return;
        }
        log::info!(
            "resolve.prune: plugin entry removed - entry={}, reason={}",
            identifier,
            reason
        );
        for dependent in graph.dependents_of(identifier) {
            Self::remove_cascading(
                candidates,
                graph,
                &dependent,
                &format!("cascading dependent of '{}'", identifier),
            );
        }
    }
}
