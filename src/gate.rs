// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Device access gate: the policy deciding whether a non-secure caller may
//! probe a given device-tree node.
//!
//! The only device this core shares is the console's own UART; everything
//! else is denied by construction.

use crate::dt::{DeviceTree, DtNode};
use spin::Once;

/// Allow-list predicate over device-tree nodes.
///
/// The console node is looked up lazily on the first query and cached for
/// the life of the process. The device tree is immutable after boot, so
/// there is no invalidation path. Concurrent first queries are serialised by
/// the `Once`, so two callers can never observe divergent caches.
pub struct AccessGate {
    console_node: Once<Option<DtNode>>,
}

impl AccessGate {
    /// Creates a gate with a cold cache.
    pub const fn new() -> Self {
        Self {
            console_node: Once::new(),
        }
    }

    /// Whether a non-secure caller may probe `node`.
    ///
    /// True iff `node` is the console node of `dt`; false otherwise,
    /// including when the tree designates no console at all.
    pub fn is_probe_allowed(&self, dt: &dyn DeviceTree, node: DtNode) -> bool {
        let cached = self.console_node.call_once(|| dt.console_node().ok());
        *cached == Some(node)
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new()
    }
}
