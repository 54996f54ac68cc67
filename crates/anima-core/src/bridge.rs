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

//! Boundary traits and opaque identifiers of the native animation runtime.
//!
//! The runtime is driven through a one-way command protocol: every outbound
//! call carries an explicit request id chosen by the caller, and completions
//! come back later through a [`CommandSink`] on whatever thread the runtime's
//! workers happen to run on. Nothing in this module blocks or suspends; the
//! correlation of completions to callers lives in [`crate::request`].

use std::sync::Arc;

use crate::request::RequestId;

/// The address of an object owned by the native runtime.
///
/// Opaque to this layer: it is forwarded back into the runtime but never
/// dereferenced. Lifetime management happens through
/// [`NativeHandle`](crate::handle::NativeHandle), not through this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeAddress(pub u64);

/// Identifies an animation file loaded into the native runtime.
///
/// Equality is by identity. The value carries no ownership semantics of its
/// own; the command queue that loaded the file owns its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub u64);

/// Identifies an artboard instantiated from a loaded file.
///
/// Same identity-only semantics as [`FileHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtboardHandle(pub u64);

/// Inbound callback surface of the native runtime.
///
/// The runtime invokes these from its own worker threads, at any time, in any
/// order relative to command issuance. Implementations must never panic: a
/// completion that no longer has a waiting caller is the runtime's normal
/// behavior after a caller gave up or the queue was torn down.
pub trait CommandSink: Send + Sync {
    /// A load-file command completed successfully.
    fn on_file_loaded(&self, request: RequestId, file: FileHandle);

    /// A load-file command failed; `message` is the runtime's failure text.
    fn on_file_error(&self, request: RequestId, message: String);

    /// A delete-file command was carried out.
    fn on_file_deleted(&self, request: RequestId);

    /// A load-artboard command completed successfully.
    fn on_artboard_loaded(&self, request: RequestId, artboard: ArtboardHandle);

    /// A load-artboard command failed; `message` is the runtime's failure text.
    fn on_artboard_error(&self, request: RequestId, message: String);
}

/// Outbound command surface of the native runtime.
///
/// All calls are non-blocking sends. Commands that produce a result carry a
/// [`RequestId`]; the matching completion arrives later through the
/// [`CommandSink`] registered with [`NativeBridge::create_listeners`].
pub trait NativeBridge: Send + Sync {
    /// Creates a native command queue bound to the given render context and
    /// returns its address. The render context is only forwarded; its
    /// lifecycle is managed elsewhere.
    fn construct(&self, render_context: NativeAddress) -> NativeAddress;

    /// Destroys the native command queue object.
    fn destroy(&self, queue: NativeAddress);

    /// Registers the inbound callback sink for a queue and returns the
    /// native listeners object standing for the registration.
    fn create_listeners(&self, queue: NativeAddress, sink: Arc<dyn CommandSink>) -> NativeAddress;

    /// Asks the runtime to load an animation file from raw bytes.
    fn load_file(&self, queue: NativeAddress, request: RequestId, bytes: Vec<u8>);

    /// Asks the runtime to release a loaded file.
    fn delete_file(&self, queue: NativeAddress, request: RequestId, file: FileHandle);

    /// Asks the runtime to instantiate the named artboard from a loaded file.
    fn load_artboard(&self, queue: NativeAddress, request: RequestId, file: FileHandle, name: &str);

    /// Asks the runtime to release an instantiated artboard.
    fn delete_artboard(&self, queue: NativeAddress, request: RequestId, artboard: ArtboardHandle);
}
