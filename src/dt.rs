// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Interface to the device-tree parser collaborator.
//!
//! The parser itself lives outside this crate; components here only consume
//! node handles and a handful of property lookups.

use crate::{Error, Result, memmap::PhysAddr};

/// Handle to a node of a hardware description blob.
///
/// The value is the flat-tree offset reported by the parser; it is only
/// meaningful to the tree that produced it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DtNode(pub i32);

/// Identifier of a clock as referenced by a node's clock phandle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClockId(pub u32);

/// Maximum number of specifier cells in a pin request.
pub const PIN_CELLS_MAX: usize = 3;

/// Device-tree arguments of a single pin request, as handed to a GPIO
/// provider by the framework: the consuming node plus the raw specifier
/// cells following its phandle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DtPinArgs {
    /// Node that references the GPIO controller.
    pub consumer: DtNode,
    /// Raw specifier cells; only the first `cell_count` entries are valid.
    pub cells: [u32; PIN_CELLS_MAX],
    /// Number of valid cells.
    pub cell_count: usize,
}

/// Read access to one hardware description blob.
///
/// Absence of an optional node or property is reported as
/// [`Error::NotFound`], which callers at the designated lookup sites treat as
/// a valid outcome rather than a failure.
pub trait DeviceTree: Sync {
    /// Resolves the node designated as the system console, in the
    /// "chosen/console" sense.
    fn console_node(&self) -> Result<DtNode>;

    /// Whether the node's status property enables the device.
    fn node_enabled(&self, node: DtNode) -> bool;

    /// Base physical address from the node's first `reg` tuple.
    fn reg_base(&self, node: DtNode) -> Result<PhysAddr>;

    /// Clock referenced by the node's clock phandle, if any.
    fn clock(&self, node: DtNode) -> Result<ClockId>;
}

impl DtPinArgs {
    /// Builds pin arguments from the raw specifier cells of a consumer node.
    pub fn new(consumer: DtNode, cells: &[u32]) -> Result<Self> {
        if cells.is_empty() || cells.len() > PIN_CELLS_MAX {
            return Err(Error::Misconfigured);
        }
        let mut args = Self {
            consumer,
            cells: [0; PIN_CELLS_MAX],
            cell_count: cells.len(),
        };
        args.cells[..cells.len()].copy_from_slice(cells);
        Ok(args)
    }
}
