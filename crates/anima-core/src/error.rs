// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for native resource ownership and request correlation.
//!
//! Ownership errors are loud by design: they indicate an acquire/release
//! mismatch in calling code and are returned synchronously at the call site,
//! never absorbed. Request errors travel through the pending-request slot to
//! the one caller that issued the matching request.

use std::fmt;

/// Convenience alias for operations that can fail with an [`OwnershipError`].
pub type OwnershipResult<T> = Result<T, OwnershipError>;

/// A violation of the reference-counting protocol on a native handle.
///
/// Every variant carries the handle's diagnostic label, the caller-supplied
/// source of the offending call, and the caller's reason string, so the
/// message alone is enough to locate the mismatched acquire/release pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    /// The handle was used (acquired, released, or dereferenced) after its
    /// reference count already reached zero and its dispose action ran.
    Disposed {
        /// Diagnostic label of the handle.
        label: String,
        /// Who performed the invalid call.
        source: String,
        /// Caller-supplied context for the call, if any.
        reason: String,
    },
    /// A release was attempted that would drive the reference count below
    /// zero. This is an acquire/release mismatch in the calling code.
    ReleasePastZero {
        /// Diagnostic label of the handle.
        label: String,
        /// Who performed the invalid release.
        source: String,
        /// Caller-supplied context for the release, if any.
        reason: String,
    },
}

impl fmt::Display for OwnershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipError::Disposed {
                label,
                source,
                reason,
            } => {
                write!(
                    f,
                    "native handle '{label}' is already disposed (source: '{source}', reason: '{reason}')"
                )
            }
            OwnershipError::ReleasePastZero {
                label,
                source,
                reason,
            } => {
                write!(
                    f,
                    "release past zero on native handle '{label}' (source: '{source}', reason: '{reason}')"
                )
            }
        }
    }
}

impl std::error::Error for OwnershipError {}

/// A failure reported by the native runtime for one specific request.
///
/// Delivered through the same pending-request slot as a success, so it
/// reaches exactly the caller that issued the matching request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    /// The failure text reported by the native side.
    pub message: String,
}

impl RequestError {
    /// Wraps a native failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native request failed: {}", self.message)
    }
}

impl std::error::Error for RequestError {}
