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

//! # Capability-Gated Handle
//!
//! `CogHandle` is the only type external callers are ever given. It wraps
//! exactly one live instance and authorizes each forwarded operation
//! against a per-operation allow-list before touching the real plugin.
//!
//! ## Authorization Model
//!
//! Callers present a `CogCapabilityToken` issued by the plugin registry;
//! the token carries the caller component's identity explicitly, and the
//! handle policy maps operation names to the set of permitted components.
//! A denied call returns a safe default (empty string, `false`, empty
//! list) and logs a warning naming the caller and the operation. It never
//! errors.
//!
//! Lifecycle operations (`run`, `stop`, `set_identifier`) are never
//! forwarded through a handle regardless of token: lifecycle control goes
//! exclusively through the registry. Wrapping a handle in another handle
//! resolves to the innermost real instance, so gating can be neither
//! bypassed nor duplicated by re-wrapping.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::container::{CogInstanceId, CogPluginInstance};
use crate::manifest::CogPluginMetadata;
use crate::plugin::{CogDependencyRequirement, CogPluginKind};

/// Operation names used by the allow-list.
pub const OP_DISPLAY_NAME: &str = "display_name";
pub const OP_DESCRIPTION: &str = "description";
pub const OP_KIND: &str = "kind";
pub const OP_CONFIGURE: &str = "configure";
pub const OP_REQUIREMENTS: &str = "requirements";

/// Capability token carrying the identity of the calling component.
/// Issued only by the plugin registry; possession of a token for component
/// `c` authorizes exactly the operations whose allow-list names `c`.
#[derive(Clone, Debug)]
pub struct CogCapabilityToken {
    component: String,
}

impl CogCapabilityToken {
    pub(crate) fn new(component: impl Into<String>) -> Self {
        CogCapabilityToken {
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

/// Per-operation allow-list: operation name → permitted caller components.
#[derive(Clone, Debug)]
pub struct CogHandlePolicy {
    allow: HashMap<String, HashSet<String>>,
}

impl Default for CogHandlePolicy {
    fn default() -> Self {
        let mut policy = CogHandlePolicy {
            allow: HashMap::new(),
        };
        for op in [OP_DISPLAY_NAME, OP_DESCRIPTION, OP_KIND] {
            policy.permit(op, "window");
            policy.permit(op, "toolbar");
        }
        policy.permit(OP_CONFIGURE, "settings");
        policy.permit(OP_REQUIREMENTS, "registry");
        policy
    }
}

impl CogHandlePolicy {
    pub fn empty() -> Self {
        CogHandlePolicy {
            allow: HashMap::new(),
        }
    }

    pub fn permit(&mut self, operation: &str, component: &str) {
        self.allow
            .entry(operation.to_string())
            .or_default()
            .insert(component.to_string());
    }

    pub fn allows(&self, operation: &str, component: &str) -> bool {
        self.allow
            .get(operation)
            .map(|components| components.contains(component))
            .unwrap_or(false)
    }
}

/// Forwarding wrapper around one live plugin instance. Handles never own
/// the instance's lifecycle; containers do. Multiple handles may wrap the
/// same instance.
#[derive(Clone, Debug)]
pub struct CogHandle {
    instance: Arc<CogPluginInstance>,
    policy: Arc<CogHandlePolicy>,
}

impl CogHandle {
    pub(crate) fn new(instance: Arc<CogPluginInstance>, policy: Arc<CogHandlePolicy>) -> Self {
        CogHandle { instance, policy }
    }

    /// Wrap an existing handle. The result shares the innermost real
    /// instance, so nesting handles neither bypasses nor duplicates
    /// authorization.
    pub fn rewrap(handle: &CogHandle) -> CogHandle {
        CogHandle {
            instance: Arc::clone(&handle.instance),
            policy: Arc::clone(&handle.policy),
        }
    }

    /// Whether two handles resolve to the same underlying instance.
    pub fn same_instance(&self, other: &CogHandle) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }

    // ---- ungated informational operations -------------------------------

    pub fn identifier(&self) -> String {
        self.instance.identifier().to_string()
    }

    pub fn instance_id(&self) -> CogInstanceId {
        self.instance.id
    }

    pub fn consumer(&self) -> Option<String> {
        self.instance.consumer.clone()
    }

    pub fn tag(&self) -> Option<String> {
        self.instance.tag.clone()
    }

    pub fn is_running(&self) -> bool {
        self.instance.is_running()
    }

    pub fn info(&self) -> Arc<CogPluginMetadata> {
        Arc::clone(&self.instance.metadata)
    }

    // ---- gated operations ----------------------------------------------

    pub fn display_name(&self, token: &CogCapabilityToken) -> String {
        if !self.authorize(OP_DISPLAY_NAME, token) {
            return String::new();
        }
        self.instance
            .lock()
            .map(|plugin| plugin.display_name())
            .unwrap_or_default()
    }

    pub fn description(&self, token: &CogCapabilityToken) -> String {
        if !self.authorize(OP_DESCRIPTION, token) {
            return String::new();
        }
        self.instance
            .lock()
            .map(|plugin| plugin.description())
            .unwrap_or_default()
    }

    pub fn kind(&self, token: &CogCapabilityToken) -> Option<CogPluginKind> {
        if !self.authorize(OP_KIND, token) {
            return None;
        }
        self.instance.lock().map(|plugin| plugin.kind()).ok()
    }

    pub fn requirements(&self, token: &CogCapabilityToken) -> Vec<CogDependencyRequirement> {
        if !self.authorize(OP_REQUIREMENTS, token) {
            return Vec::new();
        }
        self.instance
            .lock()
            .map(|plugin| plugin.requirements())
            .unwrap_or_default()
    }

    pub fn configure(&self, token: &CogCapabilityToken, config: &Value) -> bool {
        if !self.authorize(OP_CONFIGURE, token) {
            return false;
        }
        match self.instance.lock() {
            Ok(mut plugin) => match plugin.configure(config) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!(
                        "handle.configure.failed: plugin rejected configuration - entry={}, error={}",
                        self.instance.identifier(),
                        err
                    );
                    false
                }
            },
            Err(_) => false,
        }
    }

    // ---- never forwarded ------------------------------------------------

    /// Lifecycle control goes exclusively through the registry; a handle
    /// holder can never start an instance.
    pub fn run(&self, token: &CogCapabilityToken) -> bool {
        self.refuse_lifecycle("run", token);
        false
    }

    /// See `run`.
    pub fn stop(&self, token: &CogCapabilityToken) -> bool {
        self.refuse_lifecycle("stop", token);
        false
    }

    /// See `run`.
    pub fn set_identifier(&self, token: &CogCapabilityToken, _identifier: &str) -> bool {
        self.refuse_lifecycle("set_identifier", token);
        false
    }

    fn refuse_lifecycle(&self, operation: &str, token: &CogCapabilityToken) {
        log::warn!(
            "security.audit.lifecycle_refused: lifecycle operation refused through handle - operation={}, caller={}, entry={}",
            operation,
            token.component(),
            self.instance.identifier()
        );
    }

    fn authorize(&self, operation: &str, token: &CogCapabilityToken) -> bool {
        if self.policy.allows(operation, token.component()) {
            return true;
        }
        log::warn!(
            "security.audit.operation_denied: caller not in the allow-list - operation={}, caller={}, entry={}",
            operation,
            token.component(),
            self.instance.identifier()
        );
        false
    }
}
