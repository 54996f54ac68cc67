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

//! # Anima Core
//!
//! Foundational crate for driving a native animation runtime from managed
//! code: the reference-counted [`NativeHandle`] that guards shared native
//! resources, the request-correlation machinery that turns the runtime's
//! callback-driven protocol into awaitable operations, and the boundary
//! traits the runtime is driven through.

#![warn(missing_docs)]

pub mod bridge;
pub mod error;
pub mod handle;
pub mod request;

pub use bridge::{ArtboardHandle, CommandSink, FileHandle, NativeAddress, NativeBridge};
pub use error::{OwnershipError, OwnershipResult, RequestError};
pub use handle::NativeHandle;
pub use request::{PendingRequestTable, RequestId, RequestIdGenerator, ResponseFuture};
