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

//! # Cog Plugin Host Library
//!
//! This is the main library entry point for the Cog plugin host: discovery,
//! dependency resolution, and lifecycle management for archive-packaged
//! plugins consumed by named "robot" consumers.
//!
//! ## Module Overview
//!
//! The library is organized into the following modules:
//!
//! - **errors**: canonical error enumeration and result alias
//! - **config**: host directory layout and classpath configuration
//! - **host**: narrow collaborator interfaces (deferred deletion, progress,
//!   name resolution)
//! - **manifest**: archive metadata reader (`plugin.properties` + locale
//!   bundles)
//! - **extract**: idempotent extraction of bundled library/native/image
//!   sub-trees
//! - **plugin**: the `CogPlugin` contract, factories, and requirement types
//! - **loader**: pluggable loading strategy (static table / `libloading`)
//! - **resolve**: single-pass dependency resolver with cascading removal
//! - **container**: per-consumer and unbound instance containers
//! - **handle**: capability-gated forwarding handle
//! - **registry**: the top-level plugin registry service
//!
//! ## Startup Flow
//!
//! Archive Metadata Reader → Resource Extractor → Dependency Resolver →
//! Plugin Registry → Instance Containers → Capability-Gated Handles.
//! `CogPluginRegistry::startup` runs the first three exactly once; every
//! instance handed to the rest of the application is wrapped in a
//! `CogHandle`.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, CogError>`. Nothing in this subsystem
//! aborts the host process: metadata, dependency, extraction,
//! instantiation, and authorization failures all degrade to "this one
//! plugin/operation is unavailable".

#![allow(non_snake_case)]

pub mod errors;
pub mod config;
pub mod host;
pub mod manifest;
pub mod extract;
pub mod plugin;
pub mod loader;
pub mod resolve;
pub mod container;
pub mod handle;
pub mod registry;

pub use errors::{CogError, Result};
pub use config::{CogConfig, CogConfigBuilder};
pub use host::{
    CogDeferredDeleter, CogIdentityNameResolver, CogNameResolver, CogNullProgressSink,
    CogProgressSink, CogShutdownRegistry,
};
pub use manifest::{CogMetadataReader, CogPluginMetadata, COG_METADATA_RESOURCE};
pub use extract::{current_platform, CogExtractionReport, CogResourceExtractor};
pub use plugin::{
    CogDependencyRequirement, CogInstanceConfig, CogPlugin, CogPluginFactory, CogPluginKind,
};
pub use loader::{CogPluginLoader, CogStaticLoader, COG_PLUGIN_ENTRY_SYMBOL};
#[cfg(feature = "dynamic")]
pub use loader::CogDynamicLoader;
pub use resolve::{CogDependencyResolver, CogPluginSet};
pub use container::{
    CogConsumerContainer, CogInstanceId, CogInstanceTable, CogPluginInstance,
    CogUnboundContainer,
};
pub use handle::{CogCapabilityToken, CogHandle, CogHandlePolicy};
pub use registry::CogPluginRegistry;
