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

//! # Anima Engine
//!
//! Command orchestration over the native animation runtime: the
//! [`CommandQueue`] presents "send command, get result" as single awaitable
//! operations on top of the runtime's id-correlated callback protocol, and
//! owns the shared native queue with the same exactly-once-dispose discipline
//! as any other native resource.

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::scope::QueueScope;
pub use queue::CommandQueue;
