// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! External abort routing.
//!
//! An external abort may be the visible side of an interconnect access
//! violation rather than a programming fault. The trap handler forwards
//! every external abort to the security-event correlator so a pending
//! violation is never left unacknowledged; classification of the abort
//! itself stays with the caller.

use bitflags::bitflags;

bitflags! {
    /// Syndrome bits of an abort trap.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct AbortFlags: u32 {
        /// The faulting access was a write.
        const WRITE = 1 << 0;
        /// The abort was taken on an instruction fetch.
        const PREFETCH = 1 << 1;
        /// The abort is asynchronous to the faulting instruction.
        const ASYNC = 1 << 2;
    }
}

/// Description of an abort trap as captured by the exception vector.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AbortInfo {
    /// Syndrome bits.
    pub flags: AbortFlags,
    /// Faulting address, if the syndrome carries one.
    pub address: usize,
    /// Program counter of the trapped instruction.
    pub pc: usize,
}

/// The security-event correlator collaborator.
pub trait SecurityMonitor: Sync {
    /// Checks and clears any pending interconnect access-violation event.
    fn drain_pending_violation(&self);
}

/// Platform hook for external abort traps.
///
/// Delegates to the correlator exactly once per abort; no retry, no local
/// classification.
pub fn handle_external_abort(monitor: &dyn SecurityMonitor, _info: &AbortInfo) {
    monitor.drain_pending_violation();
}
