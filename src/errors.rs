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

//! # Cog Error Module
//!
//! This module defines the error types and utilities used throughout the Cog
//! plugin host for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Cog uses a structured error approach with the following principles:
//!
//! - **Explicit Error Types**: Each error variant represents a specific category
//!   of failure, making it easier to handle errors appropriately
//! - **Context-Rich**: Errors include relevant context (plugin identifiers,
//!   archive paths, detailed messages) to aid debugging
//! - **Recoverable**: Nothing in this subsystem may abort the host process;
//!   every failure is caught at the narrowest possible scope and degrades to
//!   "this one plugin/operation is unavailable"
//! - **Serde Support**: Errors can be serialized/deserialized for logging and
//!   persistence
//!
//! ## Error Categories
//!
//! - **Io**: Filesystem errors during scanning and extraction
//! - **Archive**: ZIP archive operation errors
//! - **Instantiation**: Factory or lifecycle-hook failures
//! - **Validation**: Invalid parameters or inputs
//! - **Serde**: Serialization/deserialization errors
//! - **Internal**: Unexpected internal failures
//!
//! Malformed metadata and unsatisfiable dependencies are not errors at this
//! level: scans skip the archive and resolution prunes the entry, each with
//! a logged reason.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::result::ZipError;

/// Convenience result type used throughout Cog.
pub type Result<T> = std::result::Result<T, CogError>;

/// Canonical error enumeration for the Cog plugin host.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum CogError {
    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Errors originating from ZIP archive operations.
    #[error("archive error: {0}")]
    Archive(String),

    /// Any failure raised while instantiating a plugin or invoking its
    /// lifecycle hooks.
    #[error("instantiation of '{entry}' failed: {message}")]
    Instantiation { entry: String, message: String },

    /// Validation errors triggered by invalid parameters or inputs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for CogError {
    fn from(err: io::Error) -> Self {
        CogError::Io(err.to_string())
    }
}

impl From<ZipError> for CogError {
    fn from(err: ZipError) -> Self {
        CogError::Archive(err.to_string())
    }
}

impl From<serde_json::Error> for CogError {
    fn from(err: serde_json::Error) -> Self {
        CogError::Serde(err.to_string())
    }
}

impl CogError {
    /// Helper to construct instantiation errors.
    pub fn instantiation(entry: impl Into<String>, message: impl Into<String>) -> Self {
        CogError::Instantiation {
            entry: entry.into(),
            message: message.into(),
        }
    }

    /// Helper to construct simple validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        CogError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        CogError::Internal(message.into())
    }
}
