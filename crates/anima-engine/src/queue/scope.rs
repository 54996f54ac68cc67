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

//! Scoped acquisition of a command queue.
//!
//! Composition-scoped owners (a UI subtree, a preview panel) bind the queue
//! into their lifetime: acquire on attach, release on detach. The guard makes
//! the release unconditional across every exit path (normal teardown, early
//! return, or abandonment), using only the queue's public ownership contract.

use crate::queue::CommandQueue;
use anima_core::OwnershipResult;

/// Holds one reference on a [`CommandQueue`] for the lifetime of the guard.
#[must_use = "dropping the scope immediately releases the queue again"]
pub struct QueueScope {
    queue: CommandQueue,
    source: String,
}

impl QueueScope {
    /// Acquires the queue on behalf of `source`.
    ///
    /// Fails if the queue is already disposed; a scope can never resurrect a
    /// torn-down queue.
    pub fn bind(queue: &CommandQueue, source: impl Into<String>) -> OwnershipResult<Self> {
        let source = source.into();
        queue.acquire(&source)?;
        Ok(Self {
            queue: queue.clone(),
            source,
        })
    }

    /// The queue this scope holds a reference on.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}

impl Drop for QueueScope {
    fn drop(&mut self) {
        // Drop cannot report errors; a failed release here means the owner
        // protocol was already violated elsewhere, so make it visible.
        if let Err(err) = self.queue.release(&self.source, "scope detached") {
            log::error!("scope '{}' failed to release its queue: {err}", self.source);
        }
    }
}
