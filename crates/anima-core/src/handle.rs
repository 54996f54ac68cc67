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

//! Reference-counted ownership of a single native resource.
//!
//! A [`NativeHandle`] wraps one opaque native address together with a
//! one-shot dispose action. Holders share the resource through explicit
//! `acquire`/`release` calls rather than `Clone`/`Drop`, because the set of
//! owners spans subsystems with their own lifecycles (UI subtrees, playback
//! controllers) and a mismatched pair must surface as an error at the
//! offending call site, not as a silent leak or an early free.
//!
//! Invariant: `is_disposed() == (ref_count() == 0)`, and the dispose action
//! runs exactly once, at the unique 1→0 transition, no matter how many
//! threads race the count down through zero.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::bridge::NativeAddress;
use crate::error::{OwnershipError, OwnershipResult};

type DisposeFn = Box<dyn FnOnce(NativeAddress) + Send>;

/// A reference-counted wrapper around one native-side resource.
///
/// Created with a count of 1 standing for the creator. Every additional owner
/// calls [`acquire`](NativeHandle::acquire) when it starts sharing the
/// resource and [`release`](NativeHandle::release) when it stops; the dispose
/// action supplied at construction runs exactly once, when the last owner
/// releases. All methods are safe to call from any thread.
pub struct NativeHandle {
    address: NativeAddress,
    label: String,
    ref_count: AtomicU32,
    disposed: AtomicBool,
    on_dispose: Mutex<Option<DisposeFn>>,
}

impl NativeHandle {
    /// Wraps a freshly obtained native resource.
    ///
    /// ## Arguments
    /// * `address` - The native-side identity of the resource.
    /// * `label` - Diagnostic name embedded in logs and ownership errors.
    /// * `on_dispose` - Teardown action invoked exactly once at the 1→0
    ///   reference transition.
    pub fn new(
        address: NativeAddress,
        label: impl Into<String>,
        on_dispose: impl FnOnce(NativeAddress) + Send + 'static,
    ) -> Self {
        let label = label.into();
        log::trace!("native handle '{label}' created for {address:?} (count 1)");
        Self {
            address,
            label,
            ref_count: AtomicU32::new(1),
            disposed: AtomicBool::new(false),
            on_dispose: Mutex::new(Some(Box::new(on_dispose))),
        }
    }

    /// Registers an additional owner of the resource.
    ///
    /// Fails if the handle is already disposed. The increment is a
    /// compare-and-swap loop that refuses to move the count off zero, so a
    /// handle can never be resurrected after its dispose transition.
    pub fn acquire(&self, source: &str) -> OwnershipResult<()> {
        let mut current = self.ref_count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(OwnershipError::Disposed {
                    label: self.label.clone(),
                    source: source.to_string(),
                    reason: "acquire".to_string(),
                });
            }
            match self.ref_count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    log::trace!(
                        "native handle '{}' acquired by '{}' ({} -> {})",
                        self.label,
                        source,
                        current,
                        current + 1
                    );
                    return Ok(());
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Drops one owner of the resource.
    ///
    /// Fails if the handle is already disposed, or if the release would drive
    /// the count below zero (an acquire/release mismatch in the caller).
    /// When the decrement produces exactly zero, the dispose action fires for
    /// exactly one of any number of racing callers: the teardown is gated
    /// behind an atomic claim on the `disposed` flag, separate from the
    /// counter itself, so a thread that decremented to zero but lost the
    /// claim still returns `Ok` without running the action a second time.
    pub fn release(&self, source: &str, reason: &str) -> OwnershipResult<()> {
        let mut current = self.ref_count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(if self.disposed.load(Ordering::Acquire) {
                    OwnershipError::Disposed {
                        label: self.label.clone(),
                        source: source.to_string(),
                        reason: reason.to_string(),
                    }
                } else {
                    OwnershipError::ReleasePastZero {
                        label: self.label.clone(),
                        source: source.to_string(),
                        reason: reason.to_string(),
                    }
                });
            }
            match self.ref_count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        log::trace!(
            "native handle '{}' released by '{}' ({} -> {})",
            self.label,
            source,
            current,
            current - 1
        );

        if current == 1 {
            // 1 -> 0: claim the one-shot dispose. The CAS loop above already
            // serializes the transition, but the flag is the authority on who
            // runs the teardown.
            if self
                .disposed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let action = self.on_dispose.lock().unwrap().take();
                if let Some(action) = action {
                    log::debug!(
                        "native handle '{}' disposing {:?} (released by '{}')",
                        self.label,
                        self.address,
                        source
                    );
                    action(self.address);
                }
            }
        }
        Ok(())
    }

    /// Returns the native address behind the handle.
    ///
    /// Fails once the handle is disposed; the address must never be used
    /// after the native side tore the resource down.
    pub fn address(&self) -> OwnershipResult<NativeAddress> {
        if self.ref_count() == 0 {
            return Err(OwnershipError::Disposed {
                label: self.label.clone(),
                source: "address".to_string(),
                reason: "dereference".to_string(),
            });
        }
        Ok(self.address)
    }

    /// Current number of owners.
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Whether the dispose transition has happened.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Diagnostic label of the handle.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("label", &self.label)
            .field("address", &self.address)
            .field("ref_count", &self.ref_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
