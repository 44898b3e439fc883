// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Interrupt bring-up and the multi-core system reset sequence.
//!
//! The interrupt controller and reset controller drivers are collaborators;
//! this module owns only the ordering: peer cores are asked to halt before
//! shared state is torn down, and the reset line is asserted exactly once.

use crate::{
    Error,
    console::ConsoleState,
    platform::{Platform, UartChip},
};
use arm_gic::IntId;
use log::{debug, info};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Time given to peer cores to act on the halt request, in microseconds.
const HALT_RENDEZVOUS_DELAY_US: u32 = 1000;
/// Time given to the reset controller to take the system down, in
/// microseconds.
const RESET_ASSERT_DELAY_US: u32 = 100;

/// Reset lines understood by the reset controller, as numbered by the
/// platform's device-tree bindings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum ResetLine {
    /// Whole-system reset.
    System = 0,
    /// Coprocessor subsystem reset.
    Coprocessor = 1,
}

/// The interrupt controller driver collaborator.
pub trait InterruptController: Sync {
    /// Brings up the distributor and the boot core's interface, at the
    /// controller's fixed physical offsets. Called exactly once, on the
    /// primary core, before any interrupt can be taken.
    fn init_primary(&self);

    /// Brings up the calling core's per-core interface only. Called once per
    /// secondary core as it comes online; never concurrently with
    /// [`init_primary`](Self::init_primary).
    fn init_per_core(&self);

    /// Sends `sgi` to every core except the calling one. Delivery is not
    /// acknowledged.
    fn raise_sgi_to_others(&self, sgi: IntId);
}

/// The reset controller driver collaborator.
pub trait ResetController: Sync {
    /// Asserts the given reset line.
    fn assert_line(&self, line: ResetLine) -> crate::Result<()>;
}

/// Brings up the interrupt controller for the primary core.
pub fn primary_init_intc(intc: &dyn InterruptController) {
    intc.init_primary();
    debug!("Interrupt controller distributor and boot core interface ready");
}

/// Brings up the calling secondary core's interrupt interface.
pub fn secondary_init_intc(intc: &dyn InterruptController) {
    intc.init_per_core();
}

/// Runs the reset sequence and reports the terminal condition.
///
/// On working hardware the reset line assert never returns control, so the
/// returned value is always the fatal "reset had no effect" condition; it is
/// a value rather than an abort so the sequence can be exercised in tests.
/// The peer-core halt is a best-effort rendezvous: the signal is sent and a
/// fixed delay elapses, with no acknowledgement from the peers.
pub fn reset_sequence<P: Platform>(
    console: &ConsoleState<UartChip<P>>,
    intc: &dyn InterruptController,
    reset: &dyn ResetController,
    reason: &str,
) -> Error {
    if P::CORE_COUNT > 1 {
        // Halt execution of the other CPUs.
        intc.raise_sgi_to_others(IntId::sgi(P::HALT_CORES_SGI));
        P::udelay(HALT_RENDEZVOUS_DELAY_US);
    }

    info!("Forced system reset: {}", reason);
    console.flush();

    if let Err(e) = reset.assert_line(P::SYSTEM_RESET_LINE) {
        debug!("Reset line assert failed: {}", e);
        return Error::Fatal("system reset line could not be asserted");
    }
    P::udelay(RESET_ASSERT_DELAY_US);

    // Cannot occur on functional hardware.
    Error::Fatal("hardware reset had no effect")
}

/// Performs a full system reset. Never returns.
///
/// Control surviving the reset line assert means the hardware is
/// non-functional, which aborts the process unconditionally.
pub fn system_reset<P: Platform>(
    console: &ConsoleState<UartChip<P>>,
    intc: &dyn InterruptController,
    reset: &dyn ResetController,
    reason: &str,
) -> ! {
    let error = reset_sequence::<P>(console, intc, reset, reason);
    panic!("{}", error);
}
