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

//! Correlation of asynchronous native completions to their callers.
//!
//! The native runtime's protocol is "send a command with an id now, receive a
//! callback carrying that id later, on some worker thread". This module turns
//! that into awaitable operations: a [`RequestIdGenerator`] mints ids, a
//! [`PendingRequestTable`] maps each id to a single-resolution slot, and a
//! [`ResponseFuture`] suspends the issuing task until the slot is filled.
//!
//! The resolving thread only stores the outcome and wakes the stored waker;
//! the resumed body runs wherever the caller's executor schedules it. That is
//! what keeps results from being touched by the runtime's worker threads.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::error::RequestError;

/// Identifies one issued command for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Mints strictly increasing request ids across any number of threads.
///
/// Ids are never reused; correlation of a completion to its caller relies on
/// that, since a delayed callback for an old id must not be able to collide
/// with a live request.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator starting at id 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id. Strictly increasing in issuance order.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-resolution result slot shared between the issuing task and the
/// thread that delivers the completion.
struct RequestSlot<T> {
    outcome: Mutex<Option<Result<T, RequestError>>>,
    waker: Mutex<Option<Waker>>,
}

impl<T> RequestSlot<T> {
    fn fill(&self, result: Result<T, RequestError>) {
        *self.outcome.lock().unwrap() = Some(result);
        let waker = self.waker.lock().unwrap().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Awaits the completion of one issued command.
///
/// Suspends the issuing task without occupying a thread; the completion
/// callback wakes it through the stored [`Waker`]. Dropping the future
/// abandons the request; a completion that arrives afterwards is discarded
/// by the table without error.
pub struct ResponseFuture<T> {
    slot: Arc<RequestSlot<T>>,
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T, RequestError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Hold the outcome lock while parking the waker so a resolution
        // landing between the check and the store cannot be missed.
        let mut outcome = self.slot.outcome.lock().unwrap();
        if let Some(result) = outcome.take() {
            Poll::Ready(result)
        } else {
            *self.slot.waker.lock().unwrap() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Concurrent map from request id to its pending result slot.
///
/// `register` is called by issuing tasks, `resolve`/`reject` by the native
/// callback path on arbitrary threads. An entry is removed the moment it is
/// resolved, so a duplicate or delayed completion for the same id finds
/// nothing and is dropped with a diagnostic, never an error, since the
/// callback thread is not one the application may destabilize.
pub struct PendingRequestTable<T> {
    entries: Mutex<HashMap<RequestId, Arc<RequestSlot<T>>>>,
}

impl<T> PendingRequestTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the pending slot for a freshly issued request.
    ///
    /// Ids come from a [`RequestIdGenerator`] and are never reused, so a
    /// collision with a live entry cannot happen.
    pub fn register(&self, id: RequestId) -> ResponseFuture<T> {
        let slot = Arc::new(RequestSlot {
            outcome: Mutex::new(None),
            waker: Mutex::new(None),
        });
        let previous = self.entries.lock().unwrap().insert(id, slot.clone());
        debug_assert!(previous.is_none(), "request id reused: {id:?}");
        ResponseFuture { slot }
    }

    /// Delivers a success for `id` to its waiting caller, if any.
    pub fn resolve(&self, id: RequestId, value: T) {
        self.complete(id, Ok(value));
    }

    /// Delivers a failure for `id` to its waiting caller, if any.
    pub fn reject(&self, id: RequestId, error: RequestError) {
        self.complete(id, Err(error));
    }

    fn complete(&self, id: RequestId, result: Result<T, RequestError>) {
        let slot = self.entries.lock().unwrap().remove(&id);
        match slot {
            Some(slot) => slot.fill(result),
            None => {
                // Unknown id, already-resolved id, or a request whose queue
                // was torn down; all look the same from here.
                log::debug!("no pending request for {id:?}; completion dropped");
            }
        }
    }

    /// Rejects every outstanding request with the given reason.
    ///
    /// Used at teardown so suspended callers resume with a failure instead of
    /// waiting for completions that can no longer arrive.
    pub fn fail_all(&self, reason: &str) {
        let drained: Vec<_> = {
            let mut entries = self.entries.lock().unwrap();
            entries.drain().collect()
        };
        for (id, slot) in drained {
            log::debug!("failing outstanding request {id:?}: {reason}");
            slot.fill(Err(RequestError::new(reason)));
        }
    }

    /// Number of requests still awaiting a completion.
    pub fn pending(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl<T> Default for PendingRequestTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
