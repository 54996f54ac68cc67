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

//! The command queue: call-like operations over the native runtime's
//! id-correlated callback protocol.
//!
//! Issuing side: allocate a request id, register a pending slot, hand the
//! command to the bridge, suspend on the slot's future. Completion side: the
//! runtime's worker thread reports into the queue's [`CommandSink`] listener,
//! which resolves exactly the matching slot; the caller resumes on its own
//! executor, never on the worker thread.
//!
//! The queue is itself a shared native resource. Its lifecycle state is a
//! [`NativeHandle`] whose dispose action closes the listener sink, fails
//! every outstanding request, and destroys the native queue object, so the
//! exactly-once teardown guarantee is the same one every other native
//! resource gets.

pub mod scope;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anima_core::{
    ArtboardHandle, CommandSink, FileHandle, NativeAddress, NativeBridge, NativeHandle,
    OwnershipResult, PendingRequestTable, RequestId, RequestIdGenerator,
};

use crate::error::{QueueError, QueueResult};

/// Inbound callback surface of one command queue.
///
/// Registered with the bridge at construction and invoked by the runtime's
/// worker threads. The `open` flag is cleared at disposal; callbacks arriving
/// after that are dropped with a diagnostic instead of resolving against a
/// torn-down table.
struct QueueListener {
    open: AtomicBool,
    files: PendingRequestTable<FileHandle>,
    artboards: PendingRequestTable<ArtboardHandle>,
}

impl QueueListener {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            files: PendingRequestTable::new(),
            artboards: PendingRequestTable::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Stops dispatch of further callbacks into the tables. Idempotent.
    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl CommandSink for QueueListener {
    fn on_file_loaded(&self, request: RequestId, file: FileHandle) {
        if !self.is_open() {
            log::debug!("file-loaded callback for {request:?} after disposal; dropped");
            return;
        }
        self.files.resolve(request, file);
    }

    fn on_file_error(&self, request: RequestId, message: String) {
        if !self.is_open() {
            log::debug!("file-error callback for {request:?} after disposal; dropped");
            return;
        }
        self.files.reject(request, anima_core::RequestError::new(message));
    }

    fn on_file_deleted(&self, request: RequestId) {
        log::trace!("file deletion {request:?} confirmed by runtime");
    }

    fn on_artboard_loaded(&self, request: RequestId, artboard: ArtboardHandle) {
        if !self.is_open() {
            log::debug!("artboard-loaded callback for {request:?} after disposal; dropped");
            return;
        }
        self.artboards.resolve(request, artboard);
    }

    fn on_artboard_error(&self, request: RequestId, message: String) {
        if !self.is_open() {
            log::debug!("artboard-error callback for {request:?} after disposal; dropped");
            return;
        }
        self.artboards
            .reject(request, anima_core::RequestError::new(message));
    }
}

struct QueueShared {
    bridge: Arc<dyn NativeBridge>,
    lifecycle: NativeHandle,
    ids: RequestIdGenerator,
    listener: Arc<QueueListener>,
}

/// A shared, reference-counted command queue over the native runtime.
///
/// Constructed with a reference count of 1 standing for the creator. Every
/// additional owner (a UI subtree, a playback controller) shares it through
/// [`acquire`](CommandQueue::acquire)/[`release`](CommandQueue::release) (or
/// a [`scope::QueueScope`]); there is no privileged owner. The native queue
/// and its listener registration are torn down exactly once, at the last
/// release.
///
/// Cloning the value is cheap and does **not** touch the logical reference
/// count; clones exist so the queue can be moved into tasks and closures.
#[derive(Clone)]
pub struct CommandQueue {
    shared: Arc<QueueShared>,
}

impl CommandQueue {
    /// Constructs a native command queue bound to the given render context.
    ///
    /// The render context address is only forwarded to the runtime; its
    /// lifecycle is not managed here.
    pub fn new(bridge: Arc<dyn NativeBridge>, render_context: NativeAddress) -> Self {
        let queue_address = bridge.construct(render_context);
        let listener = Arc::new(QueueListener::new());
        let listeners_address =
            bridge.create_listeners(queue_address, listener.clone() as Arc<dyn CommandSink>);

        let lifecycle = NativeHandle::new(queue_address, "CommandQueue", {
            let bridge = bridge.clone();
            let listener = listener.clone();
            move |address| {
                // Stop callback dispatch before the native object goes away;
                // anything already past the gate still resolves against live
                // tables, anything later is dropped.
                listener.close();
                listener.files.fail_all("command queue disposed");
                listener.artboards.fail_all("command queue disposed");
                bridge.destroy(address);
                log::info!("command queue {address:?} destroyed");
            }
        });

        log::info!(
            "command queue {queue_address:?} constructed (listeners {listeners_address:?})"
        );
        Self {
            shared: Arc::new(QueueShared {
                bridge,
                lifecycle,
                ids: RequestIdGenerator::new(),
                listener,
            }),
        }
    }

    /// Loads an animation file from raw bytes.
    ///
    /// Suspends the calling task until the runtime reports the outcome for
    /// this request id. On failure the error carries the runtime's message.
    pub async fn load_file(&self, bytes: Vec<u8>) -> QueueResult<FileHandle> {
        let queue = self.shared.lifecycle.address()?;
        let request = self.shared.ids.next_id();
        let pending = self.shared.listener.files.register(request);
        log::trace!("load_file issued as {request:?} ({} bytes)", bytes.len());
        self.shared.bridge.load_file(queue, request, bytes);
        pending
            .await
            .map_err(|err| QueueError::FileLoad {
                message: err.message,
            })
    }

    /// Releases a loaded file on the native side.
    ///
    /// Fire-and-forget: never suspends. A fresh request id is still minted so
    /// the command shows up in traces.
    pub fn delete_file(&self, file: FileHandle) -> QueueResult<()> {
        let queue = self.shared.lifecycle.address()?;
        let request = self.shared.ids.next_id();
        log::trace!("delete_file({file:?}) issued as {request:?}");
        self.shared.bridge.delete_file(queue, request, file);
        Ok(())
    }

    /// Instantiates the named artboard from a loaded file.
    ///
    /// Same suspension and correlation semantics as
    /// [`load_file`](CommandQueue::load_file).
    pub async fn load_artboard(
        &self,
        file: FileHandle,
        name: &str,
    ) -> QueueResult<ArtboardHandle> {
        let queue = self.shared.lifecycle.address()?;
        let request = self.shared.ids.next_id();
        let pending = self.shared.listener.artboards.register(request);
        log::trace!("load_artboard '{name}' from {file:?} issued as {request:?}");
        self.shared.bridge.load_artboard(queue, request, file, name);
        pending
            .await
            .map_err(|err| QueueError::ArtboardLoad {
                message: err.message,
            })
    }

    /// Releases an instantiated artboard on the native side. Fire-and-forget.
    pub fn delete_artboard(&self, artboard: ArtboardHandle) -> QueueResult<()> {
        let queue = self.shared.lifecycle.address()?;
        let request = self.shared.ids.next_id();
        log::trace!("delete_artboard({artboard:?}) issued as {request:?}");
        self.shared.bridge.delete_artboard(queue, request, artboard);
        Ok(())
    }

    /// Registers an additional owner of the queue.
    pub fn acquire(&self, source: &str) -> OwnershipResult<()> {
        self.shared.lifecycle.acquire(source)
    }

    /// Drops one owner of the queue. The last release closes the listener
    /// sink, fails outstanding requests, and destroys the native queue.
    pub fn release(&self, source: &str, reason: &str) -> OwnershipResult<()> {
        self.shared.lifecycle.release(source, reason)
    }

    /// Current number of owners.
    pub fn ref_count(&self) -> u32 {
        self.shared.lifecycle.ref_count()
    }

    /// Whether the queue has been torn down.
    pub fn is_disposed(&self) -> bool {
        self.shared.lifecycle.is_disposed()
    }

    /// Number of requests still awaiting a completion, across all resource
    /// kinds. Diagnostic only.
    pub fn pending_requests(&self) -> usize {
        self.shared.listener.files.pending() + self.shared.listener.artboards.pending()
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("lifecycle", &self.shared.lifecycle)
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}
