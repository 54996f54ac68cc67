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

//! Errors surfaced by command queue operations.

use anima_core::OwnershipError;
use std::fmt;

/// Convenience alias for command queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// A failed command queue operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The reference-counting protocol on the queue itself was violated
    /// (use after dispose, release past zero).
    Ownership(OwnershipError),
    /// The runtime failed to load an animation file; carries the native
    /// failure text.
    FileLoad {
        /// The failure text reported by the native side.
        message: String,
    },
    /// The runtime failed to instantiate an artboard; carries the native
    /// failure text.
    ArtboardLoad {
        /// The failure text reported by the native side.
        message: String,
    },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Ownership(err) => write!(f, "command queue ownership error: {err}"),
            QueueError::FileLoad { message } => write!(f, "file load failed: {message}"),
            QueueError::ArtboardLoad { message } => {
                write!(f, "artboard load failed: {message}")
            }
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Ownership(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OwnershipError> for QueueError {
    fn from(err: OwnershipError) -> Self {
        QueueError::Ownership(err)
    }
}
