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

//! # Loader Abstraction
//!
//! The resolution and lifecycle logic of the host is independent of how
//! plugin code is actually loaded. `CogPluginLoader` is the seam:
//!
//! - **CogStaticLoader**: a compiled-in factory table plus a host-class
//!   set, for hosts where dynamic loading is undesirable and for tests.
//! - **CogDynamicLoader** (feature `dynamic`): opens the extracted library
//!   of an entry with `libloading` and resolves the `cog_create_plugin`
//!   entry symbol, keeping the library alive for the factory's lifetime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{CogError, Result};
use crate::manifest::CogPluginMetadata;
use crate::plugin::CogPluginFactory;

/// Entry symbol a dynamically loaded plugin library must export:
/// `fn cog_create_plugin() -> *mut dyn CogPlugin`, returning a
/// `Box::into_raw` pointer the host takes ownership of.
pub const COG_PLUGIN_ENTRY_SYMBOL: &[u8] = b"cog_create_plugin";

/// Pluggable loading strategy: a loadability probe used by the dependency
/// resolver and a factory source used by the registry at discovery time.
pub trait CogPluginLoader: Send + Sync {
    /// Whether the host can provide the given identifier as a loadable
    /// class/module.
    fn is_loadable(&self, identifier: &str) -> bool;

    /// Produce the factory for the given entry.
    fn factory(&self, metadata: &Arc<CogPluginMetadata>) -> Result<Arc<dyn CogPluginFactory>>;
}

/// Compiled-in plugin table. Factories are registered up front; the
/// host-class set answers loadability probes for identifiers the host
/// itself provides.
#[derive(Default)]
pub struct CogStaticLoader {
    factories: HashMap<String, Arc<dyn CogPluginFactory>>,
    host_classes: HashSet<String>,
}

impl CogStaticLoader {
    pub fn new() -> Self {
        CogStaticLoader {
            factories: HashMap::new(),
            host_classes: HashSet::new(),
        }
    }

    pub fn register_factory(
        &mut self,
        identifier: impl Into<String>,
        factory: Arc<dyn CogPluginFactory>,
    ) {
        self.factories.insert(identifier.into(), factory);
    }

    pub fn register_host_class(&mut self, identifier: impl Into<String>) {
        self.host_classes.insert(identifier.into());
    }
}

impl CogPluginLoader for CogStaticLoader {
    fn is_loadable(&self, identifier: &str) -> bool {
        self.host_classes.contains(identifier) || self.factories.contains_key(identifier)
    }

    fn factory(&self, metadata: &Arc<CogPluginMetadata>) -> Result<Arc<dyn CogPluginFactory>> {
        self.factories
            .get(&metadata.main_entry)
            .cloned()
            .ok_or_else(|| {
                CogError::instantiation(
                    metadata.main_entry.clone(),
                    "no factory registered in the static loader table",
                )
            })
    }
}

#[cfg(feature = "dynamic")]
pub use self::dynamic::CogDynamicLoader;

#[cfg(feature = "dynamic")]
mod dynamic {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use libloading::Library;

    use super::*;
    use crate::plugin::{CogInstanceConfig, CogPlugin};

    /// Loader resolving entries against the per-plugin library directories
    /// the resource extractor populates.
    pub struct CogDynamicLoader {
        lib_dir: PathBuf,
        loaded: Mutex<HashMap<String, Arc<CogDynamicFactory>>>,
    }

    impl CogDynamicLoader {
        pub fn new(lib_dir: impl Into<PathBuf>) -> Self {
            CogDynamicLoader {
                lib_dir: lib_dir.into(),
                loaded: Mutex::new(HashMap::new()),
            }
        }

        /// `a.b.Widget` maps to `<lib_dir>/Widget/<prefix>widget<suffix>`,
        /// e.g. `libwidget.so` on Linux.
        fn library_path(&self, identifier: &str) -> PathBuf {
            let entry_name = identifier.rsplit('.').next().unwrap_or(identifier);
            let file = format!(
                "{}{}{}",
                std::env::consts::DLL_PREFIX,
                entry_name.to_ascii_lowercase(),
                std::env::consts::DLL_SUFFIX
            );
            self.lib_dir.join(entry_name).join(file)
        }

        fn open(&self, identifier: &str, path: &Path) -> Result<Arc<CogDynamicFactory>> {
            if let Ok(loaded) = self.loaded.lock() {
                if let Some(factory) = loaded.get(identifier) {
                    return Ok(Arc::clone(factory));
                }
            }
            let library = unsafe { Library::new(path) }.map_err(|err| {
                CogError::instantiation(
                    identifier,
                    format!("library '{}' failed to load: {}", path.to_string_lossy(), err),
                )
            })?;
            let factory = Arc::new(CogDynamicFactory {
                entry: identifier.to_string(),
                library,
            });
            if let Ok(mut loaded) = self.loaded.lock() {
                loaded.insert(identifier.to_string(), Arc::clone(&factory));
            }
            Ok(factory)
        }
    }

    impl CogPluginLoader for CogDynamicLoader {
        fn is_loadable(&self, identifier: &str) -> bool {
            self.library_path(identifier).is_file()
        }

        fn factory(
            &self,
            metadata: &Arc<CogPluginMetadata>,
        ) -> Result<Arc<dyn CogPluginFactory>> {
            let path = self.library_path(&metadata.main_entry);
            let factory = self.open(&metadata.main_entry, &path)?;
            Ok(factory)
        }
    }

    /// Factory backed by a loaded library. The `Library` lives as long as
    /// the factory so instances created from it stay valid.
    struct CogDynamicFactory {
        entry: String,
        library: Library,
    }

    impl CogPluginFactory for CogDynamicFactory {
        fn create(&self, config: CogInstanceConfig) -> Result<Box<dyn CogPlugin>> {
            let constructor: libloading::Symbol<'_, unsafe fn() -> *mut dyn CogPlugin> =
                unsafe { self.library.get(COG_PLUGIN_ENTRY_SYMBOL) }.map_err(|err| {
                    CogError::instantiation(
                        self.entry.clone(),
                        format!("entry symbol missing: {}", err),
                    )
                })?;
            let raw = unsafe { constructor() };
            if raw.is_null() {
                return Err(CogError::instantiation(
                    self.entry.clone(),
                    "entry symbol returned a null instance",
                ));
            }
            let mut plugin = unsafe { Box::from_raw(raw) };
            plugin.set_identifier(&config.metadata.main_entry);
            Ok(plugin)
        }
    }
}
