// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The bring-up context: the mutable state of secure boot, owned in one
//! place instead of scattered across module-level statics.
//!
//! A platform embeds one [`BringUp`] in a static and drives its transitions
//! from the boot path in dependency order: early console, then interrupt
//! controller, then the banner, then the device-tree console handover once
//! clocks are confirmed running.

use crate::{
    Result,
    console::ConsoleState,
    coordinator::{self, InterruptController, ResetController},
    dt::{DeviceTree, DtNode},
    gate::AccessGate,
    logger,
    platform::{Platform, UartChip},
};
use core::sync::atomic::{AtomicBool, Ordering};
use log::info;

/// Boot-time state of the secure core.
pub struct BringUp<P: Platform> {
    /// The single active console slot.
    pub console: ConsoleState<UartChip<P>>,
    /// Device probe policy for non-secure callers.
    pub gate: AccessGate,
    banner_done: AtomicBool,
}

impl<P: Platform> BringUp<P> {
    /// Creates the context with nothing initialised.
    pub const fn new() -> Self {
        Self {
            console: ConsoleState::new(),
            gate: AccessGate::new(),
            banner_done: AtomicBool::new(false),
        }
    }

    /// Activates the early console from the platform's fixed UART table.
    ///
    /// Safe to call before clock and memory-management services exist.
    pub fn console_init_early(&self) {
        self.console
            .init_early::<P::Uart>(P::UART_BASES, P::EARLY_CONSOLE_UART);
    }

    /// Routes all trace output through the console slot.
    ///
    /// Later console handovers redirect the output without touching the
    /// logger again.
    pub fn register_trace_sink(&'static self) -> core::result::Result<(), log::SetLoggerError>
    where
        UartChip<P>: 'static,
    {
        logger::init(&self.console)
    }

    /// Core service initialisation on the primary core. Prints the boot
    /// banner on the first call only; re-runs are harmless.
    pub fn service_init(&self) {
        if !self.banner_done.swap(true, Ordering::Relaxed) {
            info!("Platform {}: flavor {}", P::NAME, P::FLAVOR);
        }
    }

    /// Late service initialisation: hands the console over to the device
    /// tree's choice. Requires clock services to be running.
    ///
    /// `embedded` is consulted first, `external` only when the embedded tree
    /// has no console node.
    pub fn service_init_late(
        &self,
        embedded: &dyn DeviceTree,
        external: Option<&dyn DeviceTree>,
    ) -> Result<()> {
        self.console.init_from_dt::<P::Uart>(embedded, external)
    }

    /// Whether a non-secure caller may probe `node`.
    pub fn is_probe_allowed(&self, dt: &dyn DeviceTree, node: DtNode) -> bool {
        self.gate.is_probe_allowed(dt, node)
    }

    /// Halts the peer cores, flushes the console and resets the system.
    /// Never returns.
    pub fn system_reset(
        &self,
        intc: &dyn InterruptController,
        reset: &dyn ResetController,
        reason: &str,
    ) -> ! {
        coordinator::system_reset::<P>(&self.console, intc, reset, reason)
    }
}

impl<P: Platform> Default for BringUp<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::dt::ClockId;
    use crate::platform::test::{FakeDt, FakeIntc, FakeResetController, TestPlatform};
    use core::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    #[test]
    fn early_console_uses_the_platform_table() {
        let bringup = BringUp::<TestPlatform>::new();
        bringup.console_init_early();
        assert_eq!(
            bringup.console.active_base(),
            Some(TestPlatform::UART_BASES[TestPlatform::EARLY_CONSOLE_UART])
        );
    }

    #[test]
    fn banner_is_printed_once() {
        let bringup = BringUp::<TestPlatform>::new();
        assert!(!bringup.banner_done.load(Ordering::Relaxed));
        bringup.service_init();
        bringup.service_init();
        assert!(bringup.banner_done.load(Ordering::Relaxed));
    }

    #[test]
    fn late_init_hands_the_console_over() {
        let bringup = BringUp::<TestPlatform>::new();
        bringup.console_init_early();

        let dt = FakeDt {
            console: Some(DtNode(42)),
            reg: Some(0x4000_0000),
            clock: Some(ClockId(1)),
            ..FakeDt::default()
        };
        bringup.service_init_late(&dt, None).unwrap();
        assert_eq!(bringup.console.active_base(), Some(0x4000_0000));

        // The handover runs exactly once.
        assert_eq!(
            bringup.service_init_late(&dt, None),
            Err(Error::Misconfigured)
        );
    }

    #[test]
    fn probe_policy_tracks_the_console_node() {
        let bringup = BringUp::<TestPlatform>::new();
        let dt = FakeDt {
            console: Some(DtNode(7)),
            ..FakeDt::default()
        };
        assert!(bringup.is_probe_allowed(&dt, DtNode(7)));
        assert!(!bringup.is_probe_allowed(&dt, DtNode(8)));
    }

    #[test]
    #[should_panic(expected = "hardware reset had no effect")]
    fn system_reset_never_returns() {
        let bringup = BringUp::<TestPlatform>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let intc = FakeIntc::new(log.clone());
        let reset = FakeResetController::new(log);
        bringup.system_reset(&intc, &reset, "test");
    }

    #[test]
    fn trace_sink_registration_is_one_shot() {
        static BRINGUP: BringUp<TestPlatform> = BringUp::new();
        BRINGUP.register_trace_sink().unwrap();
        assert!(BRINGUP.register_trace_sink().is_err());
    }
}
